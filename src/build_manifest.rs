//! Loading an already emitted build into a [`Compilation`] and writing results back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use tracing::debug;

use crate::host::{Chunk, Compilation, EntryPoints, HookCapabilities, Module, RawSource};
use crate::search::strip_query;

/// Description of an emitted build: entry points, chunks and modules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    /// Entry configuration the build was produced with.
    #[serde(default)]
    pub entry: Option<EntryPoints>,
    /// Chunks in emission order.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    /// Every module of the build.
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// Rendered asset text keyed by asset name.
pub type AssetSnapshot = IndexMap<String, String>;

impl BuildManifest {
    /// Read a manifest from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Build a compilation whose assets are the chunk files found in `output_dir`.
    ///
    /// Files that are not valid UTF-8 are left out of the asset map.
    pub fn compilation(&self, output_dir: &Path) -> Result<Compilation> {
        let mut compilation = Compilation::with_capabilities(HookCapabilities::default());
        compilation.chunks = self.chunks.clone();
        compilation.modules = self.modules.clone();

        let names: IndexSet<&str> = self
            .chunks
            .iter()
            .flat_map(|chunk| chunk.files.iter().map(String::as_str))
            .collect();

        for name in names {
            let path = asset_path(output_dir, name);
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            match String::from_utf8(bytes) {
                Ok(text) => compilation.emit_asset(name, RawSource::new(text)),
                Err(_) => debug!(asset = %name, "skipping non UTF-8 asset"),
            }
        }

        Ok(compilation)
    }
}

/// Capture the rendered text of every asset.
pub fn snapshot_assets(compilation: &Compilation) -> AssetSnapshot {
    compilation
        .assets
        .iter()
        .map(|(name, asset)| (name.clone(), asset.source().into_owned()))
        .collect()
}

/// Write assets whose text differs from `before` into `output_dir`.
///
/// Returns the names of the rewritten assets.
pub fn write_changed_assets(
    compilation: &Compilation,
    before: &AssetSnapshot,
    output_dir: &Path,
) -> Result<Vec<String>> {
    let mut written = Vec::new();

    for (name, asset) in &compilation.assets {
        let text = asset.source();
        if before.get(name).is_some_and(|previous| previous.as_str() == text.as_ref()) {
            continue;
        }

        let path = asset_path(output_dir, name);
        fs::write(&path, text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(name.clone());
    }

    Ok(written)
}

fn asset_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(strip_query(name))
}
