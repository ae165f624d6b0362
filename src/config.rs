//! Plugin options and configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{PurifyError, Result};

/// Configuration file names searched for by [`discover`], in priority order.
pub const CONFIG_FILE_NAMES: [&str; 3] = [
    "purify.config.json",
    "purify.config.yaml",
    "purify.config.yml",
];

/// Ordered list of content paths. A bare string deserializes as a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathList(pub Vec<String>);

impl PathList {
    /// Borrow the paths as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for PathList {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

impl<'de> Deserialize<'de> for PathList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged, expecting = "a path or a list of paths")]
        enum RawPaths {
            One(String),
            Many(Vec<String>),
        }

        Ok(match RawPaths::deserialize(deserializer)? {
            RawPaths::One(path) => Self(vec![path]),
            RawPaths::Many(paths) => Self(paths),
        })
    }
}

/// User supplied `paths` option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    untagged,
    expecting = "a path, a list of paths, or a map of chunk names to paths"
)]
pub enum EntryPathSpec {
    /// Paths shared by every chunk.
    List(PathList),
    /// Paths keyed by chunk name. The `*` key applies to chunks without their own entry.
    PerChunk(IndexMap<String, PathList>),
}

impl EntryPathSpec {
    /// Chunk names used as keys, empty for a flat list.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::List(_) => Vec::new(),
            Self::PerChunk(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

impl From<Vec<String>> for EntryPathSpec {
    fn from(paths: Vec<String>) -> Self {
        Self::List(PathList(paths))
    }
}

/// Validated plugin options.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PurifyOptions {
    /// Content paths scanned for selector usage.
    pub paths: EntryPathSpec,
    /// Asset name suffixes eligible for purification.
    #[serde(default = "default_style_extensions")]
    pub style_extensions: Vec<String>,
    /// Module resource suffixes added to the content files of their chunk.
    #[serde(default)]
    pub module_extensions: Vec<String>,
    /// Regular expression selecting compilation modules added as content for every chunk.
    #[serde(default)]
    pub module_paths_test: Option<String>,
    /// Emit diagnostics about selected assets and searched files.
    #[serde(default)]
    pub verbose: bool,
    /// Ask the purifier to minify its output.
    #[serde(default)]
    pub minimize: bool,
    /// Options forwarded untouched to the purifier.
    #[serde(default)]
    pub purify_options: Map<String, Value>,
}

fn default_style_extensions() -> Vec<String> {
    vec![".css".to_string()]
}

impl PurifyOptions {
    /// Options with every optional field at its default.
    pub fn new(paths: impl Into<EntryPathSpec>) -> Self {
        Self {
            paths: paths.into(),
            style_extensions: default_style_extensions(),
            module_extensions: Vec::new(),
            module_paths_test: None,
            verbose: false,
            minimize: false,
            purify_options: Map::new(),
        }
    }
}

/// Locate and read the first configuration file present in `dir`.
///
/// Returns `Ok(None)` when none of [`CONFIG_FILE_NAMES`] exists. The raw value still has to
/// go through [`crate::schema::OptionsSchema::validate`].
pub fn discover(dir: &Path) -> Result<Option<(PathBuf, Value)>> {
    for name in CONFIG_FILE_NAMES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            let value = read_options_file(&candidate)?;
            return Ok(Some((candidate, value)));
        }
    }

    Ok(None)
}

/// Read raw options from a JSON or YAML file, chosen by extension.
pub fn read_options_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|source| PurifyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed = if is_yaml {
        serde_yaml::from_str::<Value>(&content).map_err(|err| err.to_string())
    } else {
        serde_json::from_str::<Value>(&content).map_err(|err| err.to_string())
    };

    parsed.map_err(|message| PurifyError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
