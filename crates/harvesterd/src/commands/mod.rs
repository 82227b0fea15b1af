//! The CLI subcommands.

use clap::Subcommand;

use super::*;

pub mod fetch;
pub mod init;
pub mod run;

pub use fetch::fetch;
pub use init::init;
pub use run::run;

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Process every configured paper sequentially
  Run,

  /// Write a default settings file
  Init,

  /// Process a single paper, ignoring the configured list
  Fetch {
    /// Paper identifier in dot or dash form
    /// Examples: "1706.03762", "1706-03762"
    identifier: String,
  },
}
