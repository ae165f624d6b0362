//! The purify plugin: hook registration and per-chunk stylesheet rewriting.

use std::rc::Rc;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config::PurifyOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{PurifyError, Result};
use crate::host::{
    AdditionalAssetsTap, AssetMap, Chunk, Compilation, Compiler, Done, HookCapabilities,
    Module, Plugin, RawSource,
};
use crate::paths::{ResolvedEntryPaths, entry_paths};
use crate::purifier::{Purifier, purifier_options};
use crate::schema::{OptionsSchema, ValidatedOptions};
use crate::search;

/// Name the plugin registers its taps under.
pub const PLUGIN_NAME: &str = "PurifyPlugin";

/// Removes unused CSS rules from the stylesheet assets of every chunk.
pub struct PurifyPlugin {
    options: Value,
    purifier: Rc<dyn Purifier>,
}

impl PurifyPlugin {
    /// Plugin configured with raw `options`, validated when applied to a compiler.
    pub fn new(options: Value, purifier: impl Purifier + 'static) -> Self {
        Self {
            options,
            purifier: Rc::new(purifier),
        }
    }
}

impl Plugin for PurifyPlugin {
    fn apply(&self, compiler: &mut Compiler) -> Result<()> {
        let ValidatedOptions {
            options,
            module_pattern,
        } = OptionsSchema::new(compiler.options.entry.as_ref()).validate(&self.options)?;

        let settings = Rc::new(PluginSettings {
            diagnostics: Diagnostics::new(options.verbose),
            options,
            module_pattern,
            purifier: Rc::clone(&self.purifier),
        });

        compiler.tap_this_compilation(PLUGIN_NAME, move |compilation| {
            settings.this_compilation(compilation)
        });
        Ok(())
    }
}

/// Validated configuration shared by every compilation of one compiler.
struct PluginSettings {
    options: PurifyOptions,
    module_pattern: Option<Regex>,
    purifier: Rc<dyn Purifier>,
    diagnostics: Diagnostics,
}

impl PluginSettings {
    fn this_compilation(self: &Rc<Self>, compilation: &mut Compilation) -> anyhow::Result<()> {
        let entry_paths = entry_paths(&self.options.paths);
        entry_paths.verify_exist()?;

        let adapter = HookAdapter::probe(compilation.hook_capabilities()).ok_or_else(|| {
            anyhow::anyhow!("{PLUGIN_NAME}: host offers no supported additional_assets convention")
        })?;
        debug!(?adapter, "registering additional_assets tap");

        let settings = Rc::clone(self);
        let tap = adapter.tap(move |assets, chunks, modules| {
            let run = PurifyRun {
                options: &settings.options,
                module_pattern: settings.module_pattern.as_ref(),
                entry_paths: &entry_paths,
                purifier: settings.purifier.as_ref(),
                diagnostics: settings.diagnostics,
            };
            run.purify_compilation(assets, chunks, modules)
        });

        compilation.tap_additional_assets(PLUGIN_NAME, tap)
    }
}

/// Calling convention used for the `additional_assets` tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAdapter {
    /// The host passes only a completion callback.
    Callback,
    /// The host passes the asset collection and a completion callback.
    AssetsAndCallback,
}

impl HookAdapter {
    /// Pick the convention for a host. The collection convention wins when both are offered.
    pub fn probe(capabilities: HookCapabilities) -> Option<Self> {
        if capabilities.assets_and_callback {
            Some(Self::AssetsAndCallback)
        } else if capabilities.callback {
            Some(Self::Callback)
        } else {
            None
        }
    }

    /// Wrap `run` in a tap of this convention, reporting its outcome through the callback.
    pub fn tap<F>(self, mut run: F) -> AdditionalAssetsTap
    where
        F: FnMut(&mut AssetMap, &[Chunk], &[Module]) -> Result<()> + 'static,
    {
        match self {
            Self::Callback => AdditionalAssetsTap::Callback(Box::new(
                move |compilation: &mut Compilation, done: Done| {
                    let outcome = run(
                        &mut compilation.assets,
                        &compilation.chunks,
                        &compilation.modules,
                    );
                    done(outcome.map_err(Into::into));
                },
            )),
            Self::AssetsAndCallback => {
                AdditionalAssetsTap::AssetsAndCallback(Box::new(
                    move |assets: &mut AssetMap, compilation: &Compilation, done: Done| {
                        let outcome = run(assets, &compilation.chunks, &compilation.modules);
                        done(outcome.map_err(Into::into));
                    },
                ))
            }
        }
    }
}

/// State of one compilation's purification pass.
pub struct PurifyRun<'a> {
    /// Validated plugin options.
    pub options: &'a PurifyOptions,
    /// Compiled `modulePathsTest`.
    pub module_pattern: Option<&'a Regex>,
    /// Entry paths resolved for this compilation.
    pub entry_paths: &'a ResolvedEntryPaths,
    /// Routine rewriting each stylesheet.
    pub purifier: &'a dyn Purifier,
    /// Verbose output gate.
    pub diagnostics: Diagnostics,
}

impl PurifyRun<'_> {
    /// Purify every stylesheet asset of every chunk, replacing assets in place.
    ///
    /// Chunks are visited in host order and assets in asset map order. The first purifier
    /// failure stops the pass and leaves the failing asset untouched.
    pub fn purify_compilation(
        &self,
        assets: &mut AssetMap,
        chunks: &[Chunk],
        modules: &[Module],
    ) -> Result<()> {
        let included = self
            .module_pattern
            .map(|pattern| search::resources_matching(modules, pattern))
            .unwrap_or_default();
        if !included.is_empty() {
            debug!(count = included.len(), "modules matched modulePathsTest");
        }

        for chunk in chunks {
            self.purify_chunk(assets, chunk, &included)?;
        }

        Ok(())
    }

    fn purify_chunk(
        &self,
        assets: &mut AssetMap,
        chunk: &Chunk,
        included: &[String],
    ) -> Result<()> {
        let to_purify: Vec<String> = search::assets(assets, &self.options.style_extensions)
            .into_iter()
            .filter(|asset| chunk.files.iter().any(|file| file == asset.name))
            .map(|asset| asset.name.to_string())
            .collect();

        self.diagnostics.emit(|| {
            vec!["Assets to purify:".into(), to_purify.join(", ")]
        });

        for name in to_purify {
            let files_to_search = self.files_to_search(chunk, included);
            self.diagnostics.emit(|| {
                vec![
                    "Files to search for used rules:".into(),
                    files_to_search.join(", "),
                ]
            });

            let Some(asset) = assets.get_mut(&name) else {
                continue;
            };
            let css = asset.source();
            let purified = self
                .purifier
                .purify(
                    &files_to_search,
                    &css,
                    &purifier_options(
                        self.options.verbose,
                        self.options.minimize,
                        &self.options.purify_options,
                    ),
                )
                .map_err(|source| PurifyError::Purification {
                    asset: name.clone(),
                    source,
                })?;
            drop(css);

            debug!(asset = %name, bytes = purified.len(), "replaced stylesheet");
            *asset = Box::new(RawSource::new(purified));
        }

        Ok(())
    }

    fn files_to_search(&self, chunk: &Chunk, included: &[String]) -> Vec<String> {
        let mut files = self.entry_paths.entries(chunk.name.as_deref()).to_vec();
        files.extend_from_slice(included);
        files.extend(search::files(
            &chunk.modules,
            &self.options.module_extensions,
            |module: &Module| module.resource.as_deref(),
        ));
        files
    }
}
