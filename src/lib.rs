#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod build_manifest;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod paths;
pub mod plugin;
pub mod purifier;
pub mod schema;
pub mod search;

pub use config::{EntryPathSpec, PathList, PurifyOptions};
pub use error::{PurifyError, Result};
pub use host::{Chunk, Compilation, Compiler, CompilerOptions, Module, Plugin, RawSource, Source};
pub use plugin::{HookAdapter, PurifyPlugin};
pub use purifier::{CommandPurifier, FnPurifier, Purifier};
