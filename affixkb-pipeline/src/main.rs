//! affixkb-pipeline - Affix knowledge base compiler
//!
//! Reads planner exports and loot filters from the data directory and writes
//! `knowledge-base.json`, `knowledge-base.meta.json` and
//! `pipeline-report.json` into the output directory.
//!
//! Exits non-zero when at least one build failed and none succeeded, or
//! when the artifacts could not be written.

use std::path::PathBuf;
use std::process::ExitCode;

use affixkb_common::config::{load_or_default, resolve_config_path, CONFIG_ENV_VAR};
use affixkb_pipeline::output::render_summary;
use affixkb_pipeline::{Pipeline, PipelineConfig, RunOptions};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for affixkb-pipeline
#[derive(Parser, Debug)]
#[command(name = "affixkb-pipeline")]
#[command(about = "Compile build sources into the affix knowledge base")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "AFFIXKB_CONFIG")]
    config: Option<PathBuf>,

    /// Process only this build slug
    #[arg(long, value_name = "BUILD_SLUG")]
    only: Option<String>,

    /// Validate sources and print the report, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Write output even when no build produced a profile
    #[arg(long)]
    force: bool,

    /// Game patch version embedded in the output
    #[arg(long, value_name = "VERSION", env = "AFFIXKB_PATCH_VERSION")]
    patch_version: Option<String>,

    /// Data directory holding mappings/ and sources/
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory for the generated artifacts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "affixkb_pipeline=debug,affixkb_common=debug"
    } else {
        "affixkb_pipeline=info,affixkb_common=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when the run counts as failed
fn run(args: Args) -> Result<bool> {
    let config = load_config(&args)?;
    info!(
        data_dir = %config.paths.data_dir.display(),
        output_dir = %config.paths.output_path().display(),
        patch_version = %config.output.patch_version,
        "Starting affixkb-pipeline"
    );

    let options = RunOptions {
        only_build: args.only,
        dry_run: args.dry_run,
        force: args.force,
    };

    let pipeline = Pipeline::load(config).context("Failed to load pipeline static data")?;
    let outcome = pipeline.run(&options);

    println!("{}", render_summary(&outcome.report));
    Ok(outcome.write_error.is_none() && !outcome.is_failure())
}

/// File (or defaults) with CLI overrides applied
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    if let Some(p) = &path {
        info!(path = %p.display(), "Using config file");
    }
    let mut config: PipelineConfig =
        load_or_default(path.as_deref()).context("Failed to load configuration")?;

    if let Some(dir) = &args.data_dir {
        config.paths.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        // Relative to the working directory, not the data directory
        config.paths.output_dir = if dir.is_absolute() {
            dir.clone()
        } else {
            std::env::current_dir()
                .context("Cannot determine working directory")?
                .join(dir)
        };
    }
    if let Some(version) = &args.patch_version {
        config.output.patch_version = version.clone();
    }
    Ok(config)
}
