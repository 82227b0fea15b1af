//! Error types for the harvester library.
//!
//! This module provides a single error type covering every failure mode of
//! the pipeline: network transport, archive decoding, filesystem access, and
//! malformed identifiers or configuration. Most failures are recoverable at
//! the batch level — the driver records them per paper and keeps going — so
//! the variants here exist mainly to carry context to logs and reports.

use thiserror::Error;

/// Error type alias used for the [`harvester`](crate) crate.
pub type Result<T> = core::result::Result<T, HarvesterError>;

/// Errors that can occur while harvesting papers.
///
/// Transparent variants wrap the underlying library errors directly; the
/// message variants carry the context the pipeline has at the failure site.
#[derive(Error, Debug)]
pub enum HarvesterError {
  /// The provided paper identifier doesn't match either surface form.
  ///
  /// Accepted shapes are `YYMM.NNNNN` (dot) and `YYMM-NNNNN` (dash), e.g.
  /// `1706.03762` or `1706-03762`.
  #[error("Invalid arXiv identifier format")]
  InvalidIdentifier,

  /// A network request failed.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - The request times out
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// An API returned an error response or an unparseable payload.
  ///
  /// The string parameter contains the message from the API or the parse
  /// failure for debugging.
  #[error("API error: {0}")]
  Api(String),

  /// A downloaded archive could not be decoded as gzipped tar or plain gzip.
  #[error("Archive error: {0}")]
  Archive(String),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// JSON (de)serialization failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// Writing a CSV report failed.
  #[error(transparent)]
  Csv(#[from] csv::Error),

  /// The settings file is missing a value the pipeline needs.
  #[error("Configuration error: {0}")]
  Config(String),
}
