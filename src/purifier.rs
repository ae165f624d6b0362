//! The purification routine seam and its implementations.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tracing::debug;

/// Removes rules from a stylesheet whose selectors are not used by the content files.
pub trait Purifier {
    /// Purify `css` against `content_files` and return the resulting stylesheet.
    fn purify(&self, content_files: &[String], css: &str, options: &Map<String, Value>)
    -> Result<String>;
}

/// Build the options handed to the purifier.
///
/// `info` and `minify` come from the plugin's `verbose` and `minimize` flags. Pass-through
/// options are merged last and win on conflicting keys.
pub fn purifier_options(
    verbose: bool,
    minimize: bool,
    pass_through: &Map<String, Value>,
) -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("info".into(), Value::Bool(verbose));
    options.insert("minify".into(), Value::Bool(minimize));
    options.extend(pass_through.clone());
    options
}

/// Purifier backed by a closure.
pub struct FnPurifier<F>(F);

impl<F> FnPurifier<F>
where
    F: Fn(&[String], &str, &Map<String, Value>) -> Result<String>,
{
    /// Wrap a closure taking `(content_files, css, options)`.
    pub fn new(purify: F) -> Self {
        Self(purify)
    }
}

impl<F> Purifier for FnPurifier<F>
where
    F: Fn(&[String], &str, &Map<String, Value>) -> Result<String>,
{
    fn purify(
        &self,
        content_files: &[String],
        css: &str,
        options: &Map<String, Value>,
    ) -> Result<String> {
        (self.0)(content_files, css, options)
    }
}

/// Default executable driven by [`CommandPurifier`].
pub const DEFAULT_PURIFY_COMMAND: &str = "purifycss";

/// Purifier delegating to an external `purifycss` compatible executable.
///
/// The stylesheet is written to a scratch file and the executable is invoked as
/// `<program> [args..] <css> <content..> --out <file> [--min] [--info] [--whitelist ..]`.
#[derive(Debug, Clone)]
pub struct CommandPurifier {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Default for CommandPurifier {
    fn default() -> Self {
        Self::new(DEFAULT_PURIFY_COMMAND)
    }
}

impl CommandPurifier {
    /// Purifier running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add a leading argument, e.g. a script path when `program` is an interpreter.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command_args(
        &self,
        css_path: &Path,
        output_path: &Path,
        content_files: &[String],
        options: &Map<String, Value>,
    ) -> Vec<OsString> {
        let mut args = self.args.clone();
        args.push(css_path.into());
        args.extend(content_files.iter().map(OsString::from));
        args.push("--out".into());
        args.push(output_path.into());

        if flag(options, "minify") {
            args.push("--min".into());
        }
        if flag(options, "info") {
            args.push("--info".into());
        }
        if flag(options, "rejected") {
            args.push("--rejected".into());
        }

        let whitelist: Vec<&str> = options
            .get("whitelist")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if !whitelist.is_empty() {
            args.push("--whitelist".into());
            args.extend(whitelist.into_iter().map(OsString::from));
        }

        args
    }
}

fn flag(options: &Map<String, Value>, key: &str) -> bool {
    options.get(key).and_then(Value::as_bool).unwrap_or(false)
}

impl Purifier for CommandPurifier {
    fn purify(
        &self,
        content_files: &[String],
        css: &str,
        options: &Map<String, Value>,
    ) -> Result<String> {
        let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
        let css_path = scratch.path().join("input.css");
        let output_path = scratch.path().join("output.css");
        fs::write(&css_path, css)
            .with_context(|| format!("failed to write {}", css_path.display()))?;

        let args = self.command_args(&css_path, &output_path, content_files, options);
        debug!(program = %self.program.display(), args = args.len(), "running purifier");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "`{}` failed with status {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        fs::read_to_string(&output_path)
            .with_context(|| format!("failed to read {}", output_path.display()))
    }
}
