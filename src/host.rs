//! Minimal bundler host model the plugin is applied to.
//!
//! The host owns the chunk graph, the module list and the asset map. Plugins only interact
//! with it through two extension points: the compiler level `this_compilation`
//! notification and the compilation level `additional_assets` notification, which fires
//! once after every asset exists and before anything is emitted.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Renderable asset content.
pub trait Source {
    /// Full text of the asset.
    fn source(&self) -> Cow<'_, str>;

    /// Size of the rendered asset in bytes.
    fn size(&self) -> usize {
        self.source().len()
    }
}

/// Plain text source without an attached source map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSource(String);

impl RawSource {
    /// Wrap already rendered text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Source for RawSource {
    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }

    fn size(&self) -> usize {
        self.0.len()
    }
}

/// Emitted assets keyed by output file name, in insertion order.
pub type AssetMap = IndexMap<String, Box<dyn Source>>;

/// A source input tracked by the host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Module {
    /// Absolute path of the source file, when the module is backed by one.
    #[serde(default)]
    pub resource: Option<String>,
    /// Arbitrary host metadata.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Module {
    /// Module backed by the given resource path.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            meta: Map::new(),
        }
    }
}

/// A named group of modules emitted as one or more output files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Chunk {
    /// Chunk name, absent for anonymous chunks.
    #[serde(default)]
    pub name: Option<String>,
    /// Output file names produced by the chunk.
    #[serde(default)]
    pub files: Vec<String>,
    /// Modules pulled into the chunk.
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Chunk {
    /// Named chunk with the given output files and no modules.
    pub fn named(
        name: impl Into<String>,
        files: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            files: files.into_iter().map(Into::into).collect(),
            modules: Vec::new(),
        }
    }

    /// Attach modules to the chunk.
    pub fn with_modules(mut self, modules: impl IntoIterator<Item = Module>) -> Self {
        self.modules.extend(modules);
        self
    }
}

/// Entry configuration of the compiler.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EntryPoints {
    /// A single entry module.
    Single(String),
    /// Several entry modules sharing the default chunk.
    List(Vec<String>),
    /// Entries keyed by chunk name.
    Keyed(IndexMap<String, Value>),
}

impl EntryPoints {
    /// Chunk names of a keyed entry configuration.
    pub fn keys(&self) -> Option<Vec<&str>> {
        match self {
            Self::Keyed(map) => Some(map.keys().map(String::as_str).collect()),
            Self::Single(_) | Self::List(_) => None,
        }
    }
}

/// Compiler level options visible to plugins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    /// Configured entry points.
    pub entry: Option<EntryPoints>,
}

/// Completion callback handed to `additional_assets` taps.
pub type Done = Box<dyn FnOnce(Result<()>)>;

/// Calling conventions the `additional_assets` hook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookCapabilities {
    /// Taps receive only a completion callback.
    pub callback: bool,
    /// Taps receive the asset collection and a completion callback.
    pub assets_and_callback: bool,
}

impl Default for HookCapabilities {
    fn default() -> Self {
        Self {
            callback: true,
            assets_and_callback: true,
        }
    }
}

/// Handler registered on the `additional_assets` hook.
pub enum AdditionalAssetsTap {
    /// `(callback)` convention, the handler reaches the assets through the compilation.
    Callback(Box<dyn FnMut(&mut Compilation, Done)>),
    /// `(assets, callback)` convention.
    AssetsAndCallback(Box<dyn FnMut(&mut AssetMap, &Compilation, Done)>),
}

impl fmt::Debug for AdditionalAssetsTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("AdditionalAssetsTap::Callback"),
            Self::AssetsAndCallback(_) => f.write_str("AdditionalAssetsTap::AssetsAndCallback"),
        }
    }
}

/// One build run: chunks, modules and the assets pending emission.
#[derive(Default)]
pub struct Compilation {
    /// Assets pending emission.
    pub assets: AssetMap,
    /// Chunks in host order.
    pub chunks: Vec<Chunk>,
    /// Every module of the compilation.
    pub modules: Vec<Module>,
    capabilities: HookCapabilities,
    additional_assets: Vec<(String, AdditionalAssetsTap)>,
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compilation")
            .field("assets", &self.assets.keys().collect::<Vec<_>>())
            .field("chunks", &self.chunks)
            .field("modules", &self.modules)
            .field("capabilities", &self.capabilities)
            .field("additional_assets", &self.additional_assets)
            .finish()
    }
}

impl Compilation {
    /// Empty compilation advertising the given hook conventions.
    pub fn with_capabilities(capabilities: HookCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Add an asset, replacing any previous asset of the same name.
    pub fn emit_asset(&mut self, name: impl Into<String>, source: impl Source + 'static) {
        self.assets.insert(name.into(), Box::new(source));
    }

    /// Rendered text of an asset.
    pub fn asset_source(&self, name: &str) -> Option<String> {
        self
            .assets
            .get(name)
            .map(|asset| asset.source().into_owned())
    }

    /// Calling conventions advertised by the `additional_assets` hook.
    pub fn hook_capabilities(&self) -> HookCapabilities {
        self.capabilities
    }

    /// Register a handler on the `additional_assets` hook.
    pub fn tap_additional_assets(
        &mut self,
        name: impl Into<String>,
        tap: AdditionalAssetsTap,
    ) -> Result<()> {
        let name = name.into();
        let supported = match tap {
            AdditionalAssetsTap::Callback(_) => self.capabilities.callback,
            AdditionalAssetsTap::AssetsAndCallback(_) => self.capabilities.assets_and_callback,
        };
        if !supported {
            return Err(anyhow!(
                "{name}: additional_assets hook does not accept {tap:?}"
            ));
        }

        self.additional_assets.push((name, tap));
        Ok(())
    }

    /// Fire the `additional_assets` hook, running every tap in registration order.
    ///
    /// A tap must call its completion callback before returning. A tap that never does is
    /// reported as a stalled build.
    pub fn seal(&mut self) -> Result<()> {
        let taps = std::mem::take(&mut self.additional_assets);

        for (name, mut tap) in taps {
            debug!(tap = %name, "running additional_assets tap");
            let slot: Rc<RefCell<Option<Result<()>>>> = Rc::new(RefCell::new(None));
            let done: Done = {
                let slot = Rc::clone(&slot);
                Box::new(move |result| {
                    *slot.borrow_mut() = Some(result);
                })
            };

            match &mut tap {
                AdditionalAssetsTap::Callback(handler) => handler(&mut *self, done),
                AdditionalAssetsTap::AssetsAndCallback(handler) => {
                    let mut assets = std::mem::take(&mut self.assets);
                    handler(&mut assets, &*self, done);
                    self.assets = assets;
                }
            }

            let outcome = slot.borrow_mut().take();
            match outcome {
                Some(result) => result?,
                None => {
                    return Err(anyhow!(
                        "{name}: additional_assets tap never signalled completion"
                    ));
                }
            }
        }

        Ok(())
    }
}

type CompilationHandler = Box<dyn Fn(&mut Compilation) -> Result<()>>;

/// Build driver holding compiler level hooks.
#[derive(Default)]
pub struct Compiler {
    /// Compiler options visible to plugins.
    pub options: CompilerOptions,
    this_compilation: Vec<(String, CompilationHandler)>,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field(
                "this_compilation",
                &self.this_compilation.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Compiler {
    /// Compiler with the given options and no taps.
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            this_compilation: Vec::new(),
        }
    }

    /// Apply a plugin to this compiler.
    pub fn apply<P: Plugin + ?Sized>(&mut self, plugin: &P) -> crate::Result<()> {
        plugin.apply(self)
    }

    /// Register a handler called when a compilation starts.
    pub fn tap_this_compilation<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Compilation) -> Result<()> + 'static,
    {
        self.this_compilation.push((name.into(), Box::new(handler)));
    }

    /// Run one compilation: notify `this_compilation` taps, then seal the assets.
    pub fn compile(&self, mut compilation: Compilation) -> Result<Compilation> {
        for (name, handler) in &self.this_compilation {
            debug!(tap = %name, "running this_compilation tap");
            handler(&mut compilation)?;
        }

        compilation.seal()?;
        Ok(compilation)
    }
}

/// Something that hooks into a [`Compiler`].
pub trait Plugin {
    /// Validate configuration and register hooks.
    fn apply(&self, compiler: &mut Compiler) -> crate::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_reports_taps_that_never_complete() {
        let mut compilation = Compilation::default();
        compilation
            .tap_additional_assets("Idle", AdditionalAssetsTap::Callback(Box::new(|_, _| {})))
            .unwrap();

        let err = compilation.seal().unwrap_err();
        assert!(err.to_string().contains("never signalled completion"));
    }

    #[test]
    fn rejects_unsupported_conventions() {
        let mut compilation = Compilation::with_capabilities(HookCapabilities {
            callback: true,
            assets_and_callback: false,
        });

        let result = compilation.tap_additional_assets(
            "Modern",
            AdditionalAssetsTap::AssetsAndCallback(Box::new(|_, _, done| done(Ok(())))),
        );
        assert!(result.is_err());
    }

    #[test]
    fn assets_convention_hands_back_mutated_assets() {
        let mut compilation = Compilation::default();
        compilation.emit_asset("a.css", RawSource::new("a"));
        compilation
            .tap_additional_assets(
                "Rewrite",
                AdditionalAssetsTap::AssetsAndCallback(Box::new(
                    |assets: &mut AssetMap, _: &Compilation, done: Done| {
                        assets.insert("a.css".into(), Box::new(RawSource::new("b")));
                        done(Ok(()))
                    },
                )),
            )
            .unwrap();

        compilation.seal().unwrap();
        assert_eq!(compilation.asset_source("a.css").as_deref(), Some("b"));
    }

    #[test]
    fn compile_stops_on_failed_tap() {
        let mut compiler = Compiler::default();
        compiler.tap_this_compilation("Broken", |_| Err(anyhow!("boom")));

        let err = compiler.compile(Compilation::default()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn keyed_entries_expose_chunk_names() {
        let entry: EntryPoints =
            serde_json::from_str(r#"{"main": "./main.js", "admin": "./admin.js"}"#).unwrap();
        assert_eq!(entry.keys(), Some(vec!["main", "admin"]));

        let entry: EntryPoints = serde_json::from_str(r#""./main.js""#).unwrap();
        assert_eq!(entry.keys(), None);
    }
}
