//! Command line entry point applying the purify plugin to an emitted build.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use purify_chunks::build_manifest::{BuildManifest, snapshot_assets, write_changed_assets};
use purify_chunks::config::{discover, read_options_file};
use purify_chunks::purifier::DEFAULT_PURIFY_COMMAND;
use purify_chunks::{CommandPurifier, Compiler, CompilerOptions, PurifyPlugin};

/// Remove unused CSS rules from the stylesheets of an emitted build.
#[derive(Debug, Parser)]
#[command(name = "purify-chunks", version, about)]
struct Cli {
    /// Build manifest describing entry points, chunks and modules.
    #[arg(long)]
    manifest: PathBuf,

    /// Directory holding the emitted chunk files.
    #[arg(long)]
    output_dir: PathBuf,

    /// Plugin options file (JSON or YAML). Defaults to `purify.config.*` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Purifier executable.
    #[arg(long, default_value = DEFAULT_PURIFY_COMMAND)]
    purifier: PathBuf,

    /// Leading argument passed to the purifier executable. Repeatable.
    #[arg(long = "purifier-arg", value_name = "ARG")]
    purifier_args: Vec<String>,

    /// Print the selected assets and searched files.
    #[arg(short, long)]
    verbose: bool,

    /// Ask the purifier to minify its output.
    #[arg(long)]
    minimize: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = load_options(&cli)?;
    if let Some(map) = options.as_object_mut() {
        if cli.verbose {
            map.insert("verbose".into(), Value::Bool(true));
        }
        if cli.minimize {
            map.insert("minimize".into(), Value::Bool(true));
        }
    }

    let manifest = BuildManifest::from_path(&cli.manifest)?;
    let mut compiler = Compiler::new(CompilerOptions {
        entry: manifest.entry.clone(),
    });

    let purifier = cli
        .purifier_args
        .iter()
        .fold(CommandPurifier::new(&cli.purifier), |purifier, arg| {
            purifier.arg(arg)
        });
    compiler.apply(&PurifyPlugin::new(options, purifier))?;

    let compilation = manifest.compilation(&cli.output_dir)?;
    let before = snapshot_assets(&compilation);
    let compilation = compiler.compile(compilation)?;

    let written = write_changed_assets(&compilation, &before, &cli.output_dir)?;
    info!(count = written.len(), "rewrote stylesheets");
    for name in written {
        info!(asset = %name, "purified");
    }

    Ok(())
}

fn load_options(cli: &Cli) -> Result<Value> {
    if let Some(path) = &cli.config {
        return Ok(read_options_file(path)?);
    }

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    match discover(&cwd)? {
        Some((path, value)) => {
            info!(path = %path.display(), "loaded purify options");
            Ok(value)
        }
        None => Err(anyhow!(
            "no --config given and no purify.config.* found in {}",
            cwd.display()
        )),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
