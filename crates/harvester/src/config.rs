//! Settings file handling.
//!
//! The harvester reads one flat JSON settings file at startup. It names the
//! output and metrics directories, the papers to process (an explicit list,
//! a numeric range, or both), the extension allow-list, request timing, and
//! the progress lists that let an interrupted batch resume. A missing file is
//! replaced with defaults; the driver rewrites the file after each paper to
//! persist progress.

use std::collections::HashSet;

use super::*;

/// Default sampling/timing values live on the type so `config.json` only
/// needs the keys the user actually changes.
impl Default for Config {
  fn default() -> Self {
    Self {
      output_dir:                PathBuf::from("./data"),
      metrics_dir:               PathBuf::from("./metrics"),
      papers:                    Vec::new(),
      range:                     None,
      fetch_metadata:            true,
      fetch_references:          true,
      keep_extensions:           vec!["tex".to_string(), "bib".to_string()],
      request_timeout_secs:      60,
      delay_between_papers_ms:   1000,
      delay_between_versions_ms: 500,
      retry_attempts:            0,
      api_keys:                  ApiKeys::default(),
      progress:                  Progress::default(),
    }
  }
}

/// Runtime settings for a harvesting batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Root directory for per-paper source trees and JSON documents
  pub output_dir:                PathBuf,
  /// Directory for the statistics, time-series, and per-paper CSV outputs
  pub metrics_dir:               PathBuf,
  /// Explicit identifiers to process, in either surface form
  pub papers:                    Vec<String>,
  /// Optional numeric range generating further identifiers
  pub range:                     Option<IdRange>,
  /// Whether to fetch and write `metadata.json`/`references.json` at all
  pub fetch_metadata:            bool,
  /// Whether to query Semantic Scholar for the reference list
  pub fetch_references:          bool,
  /// Filename extensions retained when filtering extracted archives
  pub keep_extensions:           Vec<String>,
  /// Fixed per-request timeout; no adaptive policy
  pub request_timeout_secs:      u64,
  /// Pause between papers (doubled after a failed paper)
  pub delay_between_papers_ms:   u64,
  /// Pause between versions of one paper
  pub delay_between_versions_ms: u64,
  /// Plain re-attempts for the metadata request; 0 means a single attempt
  pub retry_attempts:            u32,
  /// Optional API credentials
  pub api_keys:                  ApiKeys,
  /// Completed/failed identifier lists, rewritten after each paper
  pub progress:                  Progress,
}

/// A contiguous block of identifiers sharing one year-month prefix.
///
/// `{ "prefix": "2412", "start": 1, "end": 50 }` enumerates `2412.00001`
/// through `2412.00050`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRange {
  /// Year-month prefix, e.g. `2412`
  pub prefix: String,
  /// First sequence number, inclusive
  pub start:  u32,
  /// Last sequence number, inclusive
  pub end:    u32,
}

impl IdRange {
  /// Enumerates the dot-form identifiers covered by this range.
  pub fn ids(&self) -> impl Iterator<Item = String> + '_ {
    (self.start..=self.end).map(|n| format!("{}.{n:05}", self.prefix))
  }
}

/// API credentials. All optional; absent keys mean anonymous access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
  /// Semantic Scholar API key, sent as `x-api-key` when present
  pub semantic_scholar: Option<String>,
}

/// Progress bookkeeping across interrupted runs.
///
/// Identifiers are stored in dashed form. A paper listed in `completed` is
/// skipped on the next run; `failed` is informational.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
  /// Papers that finished with at least one successful version
  pub completed: Vec<String>,
  /// Papers whose processing failed outright
  pub failed:    Vec<String>,
}

impl Progress {
  /// Whether the given dashed identifier already completed in a prior run.
  pub fn is_completed(&self, dashed: &str) -> bool { self.completed.iter().any(|p| p == dashed) }

  /// Records a completed paper, once.
  pub fn mark_completed(&mut self, dashed: &str) {
    if !self.is_completed(dashed) {
      self.completed.push(dashed.to_string());
    }
    self.failed.retain(|p| p != dashed);
  }

  /// Records a failed paper, once.
  pub fn mark_failed(&mut self, dashed: &str) {
    if !self.failed.iter().any(|p| p == dashed) {
      self.failed.push(dashed.to_string());
    }
  }
}

impl Config {
  /// The settings file looked for when no `--config` path is given.
  pub fn default_path() -> PathBuf { PathBuf::from("config.json") }

  /// Loads the settings file at `path`.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Loads the settings file at `path`, writing defaults there first when the
  /// file does not exist.
  pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if path.exists() {
      Self::load(path)
    } else {
      info!("No settings file at {}, writing defaults", path.display());
      let config = Self::default();
      config.save(path)?;
      Ok(config)
    }
  }

  /// Writes the settings (including progress) back to `path`.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content + "\n")?;
    Ok(())
  }

  /// The full identifier list for this batch: the explicit `papers` entries
  /// first, then the `range` expansion, duplicates removed in order.
  ///
  /// Completed papers are *not* filtered here; skipping them is the driver's
  /// decision so single-paper invocations can re-run at will.
  pub fn paper_ids(&self) -> Result<Vec<ArxivId>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let range_ids = self.range.iter().flat_map(IdRange::ids);
    for raw in self.papers.iter().cloned().chain(range_ids) {
      let id: ArxivId = raw.parse()?;
      if seen.insert(id.clone()) {
        ids.push(id);
      }
    }
    Ok(ids)
  }

  /// The fixed per-request timeout as a [`Duration`].
  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_keep_tex_and_bib() {
    let config = Config::default();
    assert_eq!(config.keep_extensions, ["tex", "bib"]);
    assert_eq!(config.retry_attempts, 0);
    assert!(config.fetch_metadata && config.fetch_references);
  }

  #[test]
  fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.papers = vec!["1706.03762".to_string()];
    config.progress.mark_completed("1706-03762");
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.papers, config.papers);
    assert!(loaded.progress.is_completed("1706-03762"));
  }

  #[test]
  fn load_or_init_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    assert!(!path.exists());

    let config = Config::load_or_init(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.output_dir, PathBuf::from("./data"));
  }

  #[test]
  fn paper_ids_merges_list_and_range_without_duplicates() {
    let mut config = Config::default();
    config.papers = vec!["2412.00001".to_string(), "2412-00002".to_string()];
    config.range = Some(IdRange { prefix: "2412".to_string(), start: 1, end: 3 });

    let ids = config.paper_ids().unwrap();
    let dots: Vec<String> = ids.iter().map(ArxivId::dot).collect();
    assert_eq!(dots, ["2412.00001", "2412.00002", "2412.00003"]);
  }

  #[test]
  fn partial_settings_files_fall_back_to_defaults() {
    let config: Config = serde_json::from_str(r#"{"output_dir": "./papers"}"#).unwrap();
    assert_eq!(config.output_dir, PathBuf::from("./papers"));
    assert_eq!(config.keep_extensions, ["tex", "bib"]);
  }

  #[test]
  fn mark_completed_clears_earlier_failure() {
    let mut progress = Progress::default();
    progress.mark_failed("1706-03762");
    progress.mark_completed("1706-03762");
    assert!(progress.is_completed("1706-03762"));
    assert!(progress.failed.is_empty());
  }
}
