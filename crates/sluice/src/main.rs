//! Sluice - content-based record routing
//!
//! Reads JSON lines, routes each record to the components whose routes it
//! matches, and prints every delivery as `[component] <record>`.
//!
//! # Usage
//!
//! ```bash
//! sluice --config configs/sluice.toml --input events.jsonl
//! cat events.jsonl | sluice --config configs/sluice.toml
//! sluice --config configs/sluice.toml --log-level debug
//! ```

mod input;
mod output;
mod run;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sluice_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Sluice - content-based record routing
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/sluice.toml")]
    config: PathBuf,

    /// JSON lines input file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Log level or filter directive, overrides [log] level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.log.level.as_str());
    init_logging(level, &config.log)?;

    run::run(config, &cli.input).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, log: &LogConfig) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?;

    let writer = match log.output {
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
    };

    let (console, json) = match log.format {
        LogFormat::Console => (
            Some(fmt::layer().with_target(true).with_thread_ids(false).with_writer(writer)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_target(true).with_writer(writer)),
        ),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(json)
        .with(filter)
        .init();

    Ok(())
}
