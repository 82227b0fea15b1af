//! Command line interface for the arXiv source harvester.
//!
//! This crate provides a CLI over the `harvester` library. It supports:
//! - Running a full batch over the configured papers
//! - Initializing a settings file with defaults
//! - Fetching a single paper ad hoc
//!
//! # Usage
//!
//! ```bash
//! # Write a default config.json
//! harvester init
//!
//! # Process every configured paper
//! harvester run
//!
//! # Process one paper, ignoring the configured list
//! harvester fetch 1706.03762
//! ```
//!
//! The batch exits with code 0 on completion regardless of individual paper
//! failures; failures are recorded in the metrics outputs, not signaled
//! through the exit code. Verbosity is controlled with the `-v` flag.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use clap::{builder::ArgAction, Parser};
use console::style;
use harvester::config::Config;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;

use crate::{commands::*, error::*};

/// Prefix for success messages
static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
static WARNING_PREFIX: &str = "⚠️ ";
/// Prefix for error messages
static ERROR_PREFIX: &str = "✗ ";
/// Prefix for progress messages
static WORKING_PREFIX: &str = "⟳ ";

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Batch downloader for arXiv LaTeX sources and metadata")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the settings file. If not specified, `config.json` in the
  /// working directory is used.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  /// The settings file path to use, explicit or default.
  fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Entry point for the harvester CLI application
///
/// Parses arguments, sets up logging, and executes the requested command.
/// Only configuration-level problems produce a nonzero exit; per-paper
/// failures inside a batch are recorded and reported instead.
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  match &cli.command {
    Commands::Run => run(&cli).await,
    Commands::Init => init(&cli).await,
    Commands::Fetch { identifier } => fetch(&cli, identifier).await,
  }
}
