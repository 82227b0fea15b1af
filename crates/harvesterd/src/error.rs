//! Error types for the harvester CLI.

use thiserror::Error;

/// Error type alias used for the `harvesterd` crate.
pub type Result<T> = core::result::Result<T, HarvesterdError>;

/// Errors that can occur while driving the CLI.
///
/// Mostly transparent wrappers; the CLI's job is to surface library errors
/// with useful context, not to invent its own failure modes.
#[derive(Error, Debug)]
pub enum HarvesterdError {
  /// An error from the underlying harvester library.
  #[error(transparent)]
  Harvester(#[from] harvester::error::HarvesterError),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A user interaction (confirmation prompt) failed.
  #[error(transparent)]
  Interaction(#[from] dialoguer::Error),
}
