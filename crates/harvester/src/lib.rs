//! Batch acquisition of arXiv LaTeX sources and bibliographic metadata.
//!
//! `harvester` downloads the source archives for every published version of a
//! set of arXiv papers, keeps only the markup and bibliography files, and
//! collects title/author/reference metadata from the Semantic Scholar graph
//! API. It provides:
//!
//! - Identifier normalization between arXiv's dot (`1706.03762`) and
//!   filesystem-safe dash (`1706-03762`) forms
//! - Version discovery via the arXiv Atom API and submission-history page
//! - Per-version archive download, extraction, and size accounting
//! - Per-paper `metadata.json` / `references.json` documents
//! - Batch driving with per-paper metrics and resource sampling
//!
//! # Getting Started
//!
//! ```no_run
//! use harvester::{config::Config, harvest::Harvester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   // Load (or create) the settings file
//!   let config = Config::load_or_init("config.json")?;
//!
//!   // Process every configured paper sequentially
//!   let mut harvester = Harvester::new(config)?;
//!   let outcome = harvester.run(true).await?;
//!
//!   println!("{}/{} papers succeeded", outcome.stats.successful_papers, outcome.stats.total_papers);
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`identifier`]: the [`ArxivId`] type and its two surface encodings
//! - [`config`]: the JSON settings file and identifier enumeration
//! - [`client`]: arXiv Atom API and submission-history access
//! - [`metadata`]: Semantic Scholar collection and JSON document output
//! - [`download`]: archive fetch, extraction, filtering, size accounting
//! - [`metrics`]: per-paper records, aggregate statistics, resource sampling
//! - [`harvest`]: the sequential batch driver
//!
//! # Design Philosophy
//!
//! The pipeline is deliberately sequential: one paper at a time, one version
//! at a time, with a single read-only background task sampling RAM and disk
//! usage. No individual failure terminates a batch; every attempted paper is
//! recorded, successful or not.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod harvest;
pub mod identifier;
pub mod metadata;
pub mod metrics;

use crate::{error::*, identifier::ArxivId};

/// Common types for ergonomic imports.
///
/// Brings the error type, the `Result` alias, and the identifier type into
/// scope with a single glob import:
///
/// ```
/// use harvester::prelude::*;
///
/// fn parse(input: &str) -> Result<ArxivId> { input.parse() }
/// ```
pub mod prelude {
  pub use crate::{
    error::{HarvesterError, Result},
    identifier::ArxivId,
  };
}
