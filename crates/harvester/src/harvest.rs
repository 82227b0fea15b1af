//! Sequential batch driver.
//!
//! One paper at a time: discover the version count, download and extract
//! every version, collect metadata, append a finalized record to the batch
//! accumulator, persist progress, move on. No failure terminates the batch —
//! a paper with zero successful versions and no metadata still appears in the
//! records with `success = false` and zero counts.
//!
//! The accumulator is explicit state threaded through the loop and returned,
//! so a batch is a pure fold over the identifier list rather than a set of
//! ambient counters.

use std::time::Instant;

use super::*;
use crate::{
  client::ArxivClient,
  config::Config,
  download::{summarize_versions, Downloader, VersionOutcome},
  metadata::{build_documents, write_documents, ScholarRecord, SemanticScholar},
  metrics::{write_reports, BatchStats, PaperRecord, ResourceSample, ResourceSampler, SAMPLE_INTERVAL},
};

/// Everything a per-paper run produced, before it is flattened into a
/// [`PaperRecord`].
#[derive(Debug)]
pub struct PaperReport {
  /// The paper this report belongs to
  pub id:             ArxivId,
  /// Whether at least one version succeeded and the documents were written
  pub success:        bool,
  /// Outcome of every attempted version, in version order
  pub versions:       Vec<VersionOutcome>,
  /// Summed extracted size across versions
  pub size_before:    u64,
  /// Summed filtered size across versions
  pub size_after:     u64,
  /// Number of arXiv references collected
  pub num_references: usize,
}

/// The result of a completed batch: per-paper records, the resource time
/// series, and the derived aggregate statistics.
#[derive(Debug)]
pub struct BatchOutcome {
  /// One record per attempted paper, in processing order
  pub records: Vec<PaperRecord>,
  /// Resource samples, empty when sampling was off
  pub samples: Vec<ResourceSample>,
  /// Aggregates derived from the records and samples
  pub stats:   BatchStats,
}

/// Drives the full pipeline for a configured set of papers.
pub struct Harvester {
  /// arXiv Atom API and abstract-page access
  client:      ArxivClient,
  /// Semantic Scholar metadata access
  scholar:     SemanticScholar,
  /// Archive download and extraction
  downloader:  Downloader,
  /// The active settings, including progress bookkeeping
  config:      Config,
  /// Where to persist progress after each paper, when loaded from a file
  config_path: Option<PathBuf>,
}

impl Harvester {
  /// Builds a harvester from an already-loaded configuration. Progress is
  /// kept in memory only; use [`from_config_file`](Self::from_config_file)
  /// to persist it.
  pub fn new(config: Config) -> Result<Self> {
    let timeout = config.request_timeout();
    Ok(Self {
      client: ArxivClient::new(timeout)?,
      scholar: SemanticScholar::new(timeout, config.api_keys.semantic_scholar.clone())?,
      downloader: Downloader::new(
        config.output_dir.clone(),
        config.keep_extensions.clone(),
        timeout,
      )?,
      config,
      config_path: None,
    })
  }

  /// Builds a harvester from the settings file at `path`, rewriting that file
  /// with updated progress after each paper.
  pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let mut harvester = Self::new(Config::load(&path)?)?;
    harvester.config_path = Some(path);
    Ok(harvester)
  }

  /// The active configuration.
  pub fn config(&self) -> &Config { &self.config }

  /// Processes every version of one paper and writes its metadata documents.
  ///
  /// Version discovery failing entirely is not fatal: the count defaults to
  /// one and the single download attempt decides the paper's fate.
  pub async fn process_paper(&self, id: &ArxivId) -> PaperReport {
    info!("Processing paper {id}");

    let summary = self.client.fetch_summary(id).await;
    let latest = match &summary {
      Some(summary) => summary.latest_version,
      None => {
        warn!("Version discovery for {id} came up empty, assuming a single version");
        1
      },
    };
    debug!("{id}: {latest} version(s) to fetch");

    let version_delay = Duration::from_millis(self.config.delay_between_versions_ms);
    let mut versions = Vec::with_capacity(latest as usize);
    for version in 1..=latest {
      versions.push(self.downloader.fetch_version(id, version).await);
      tokio::time::sleep(version_delay).await;
    }
    let (mut success, size_before, size_after) = summarize_versions(&versions);

    let mut num_references = 0;
    if self.config.fetch_metadata {
      let revised_dates = self.client.version_dates(id).await;
      let scholar = if self.config.fetch_references {
        self.fetch_scholar(id).await
      } else {
        None
      };
      let (metadata, references) = build_documents(summary.as_ref(), scholar, &revised_dates);
      num_references = references.len();

      let paper_dir = self.config.output_dir.join(id.dashed());
      if let Err(e) = write_documents(&paper_dir, &metadata, &references) {
        // Filesystem trouble is fatal for this paper only.
        warn!("Writing documents for {id} failed: {e}");
        success = false;
      }
    }

    PaperReport { id: id.clone(), success, versions, size_before, size_after, num_references }
  }

  /// Semantic Scholar fetch with the configured number of plain re-attempts.
  async fn fetch_scholar(&self, id: &ArxivId) -> Option<ScholarRecord> {
    let attempts = self.config.retry_attempts + 1;
    for attempt in 1..=attempts {
      if let Some(record) = self.scholar.fetch(id).await {
        return Some(record);
      }
      if attempt < attempts {
        debug!("Retrying Semantic Scholar for {id} ({attempt}/{attempts})");
        tokio::time::sleep(Duration::from_secs(1)).await;
      }
    }
    None
  }

  /// Runs the whole batch sequentially, returning the accumulated outcome.
  ///
  /// Papers already listed as completed are skipped. Exit is always normal:
  /// per-paper failures are recorded, never propagated.
  pub async fn run(&mut self, sample_resources: bool) -> Result<BatchOutcome> {
    let ids = self.config.paper_ids()?;
    info!("Starting batch over {} paper(s)", ids.len());

    let sampler = sample_resources
      .then(|| ResourceSampler::spawn(self.config.output_dir.clone(), SAMPLE_INTERVAL));

    let started = Instant::now();
    let paper_delay = Duration::from_millis(self.config.delay_between_papers_ms);
    let mut records = Vec::with_capacity(ids.len());

    for id in &ids {
      if self.config.progress.is_completed(&id.dashed()) {
        info!("Skipping {id}, already completed");
        continue;
      }

      let paper_started = Instant::now();
      let report = self.process_paper(id).await;
      let elapsed = paper_started.elapsed();

      if report.success {
        self.config.progress.mark_completed(&id.dashed());
      } else {
        self.config.progress.mark_failed(&id.dashed());
      }
      if let Some(path) = &self.config_path {
        if let Err(e) = self.config.save(path) {
          warn!("Persisting progress to {} failed: {e}", path.display());
        }
      }

      records.push(PaperRecord {
        paper_id:             id.dot(),
        success:              report.success,
        process_time_seconds: elapsed.as_secs_f64(),
        size_before_bytes:    report.size_before,
        size_after_bytes:     report.size_after,
        num_references:       report.num_references,
        num_versions:         report.versions.len() as u32,
        timestamp:            Utc::now(),
      });

      // Breathe a little longer after a failure.
      let delay = if report.success { paper_delay } else { paper_delay * 2 };
      tokio::time::sleep(delay).await;
    }

    let samples = match sampler {
      Some(sampler) => sampler.finish().await,
      None => Vec::new(),
    };
    let stats = BatchStats::from_records(&records, &samples, started.elapsed());
    write_reports(&self.config.metrics_dir, &records, &samples, &stats)?;

    info!(
      "Batch complete: {}/{} paper(s) succeeded",
      stats.successful_papers, stats.total_papers
    );
    Ok(BatchOutcome { records, samples, stats })
  }
}
