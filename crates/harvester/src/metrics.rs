//! Per-paper records, aggregate statistics, and resource sampling.
//!
//! The batch driver appends one [`PaperRecord`] per attempted paper and, when
//! sampling is on, runs a single background task that measures process RAM
//! and output-directory disk usage once per second. The sampler is read-only
//! with respect to application state: it pushes [`ResourceSample`]s over a
//! single-writer channel and is shut down with a signal-and-join so the tail
//! of the series is flushed deterministically.
//!
//! At the end of a batch everything is persisted under the metrics directory:
//! `statistics.json`, `resource_usage.json`, `resource_usage.csv`, and
//! `papers.csv`.

use std::time::Instant;

use tokio::sync::{mpsc, watch};

use super::*;

/// Interval between resource samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Metrics for one attempted paper. Finalized once, never mutated afterward.
///
/// Field order matches the `papers.csv` column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
  /// Dot-form identifier
  pub paper_id:             String,
  /// Whether at least one version succeeded
  pub success:              bool,
  /// Wall time spent on this paper
  pub process_time_seconds: f64,
  /// Summed extracted size across versions
  pub size_before_bytes:    u64,
  /// Summed filtered size across versions
  pub size_after_bytes:     u64,
  /// Number of arXiv references collected
  pub num_references:       usize,
  /// Number of versions attempted
  pub num_versions:         u32,
  /// When processing of this paper finished
  pub timestamp:            DateTime<Utc>,
}

/// One reading of the resource sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
  /// Seconds since the batch started
  pub elapsed_seconds: f64,
  /// Resident set size of this process in MB
  pub ram_mb:          f64,
  /// Recursive size of the output directory in MB
  pub disk_mb:         f64,
}

/// Aggregate statistics over a completed batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
  /// Papers attempted
  pub total_papers:                 usize,
  /// Papers with at least one successful version
  pub successful_papers:            usize,
  /// Papers with no successful version
  pub failed_papers:                usize,
  /// `successful_papers / total_papers`
  pub success_rate:                 f64,
  /// Mean per-paper wall time
  pub average_process_time_seconds: f64,
  /// Summed per-paper wall time
  pub total_process_time_seconds:   f64,
  /// Wall time of the whole batch
  pub total_wall_time_seconds:      f64,
  /// Mean extracted size over successful papers with nonzero sizes
  pub average_size_before_bytes:    f64,
  /// Mean filtered size over successful papers with nonzero sizes
  pub average_size_after_bytes:     f64,
  /// Mean reference count over successful papers
  pub average_references_per_paper: f64,
  /// Summed reference count over successful papers
  pub total_references:             usize,
  /// Highest sampled RSS
  pub peak_ram_mb:                  f64,
  /// Mean sampled RSS
  pub average_ram_mb:               f64,
  /// Highest sampled output-directory size
  pub peak_disk_mb:                 f64,
  /// Mean sampled output-directory size
  pub average_disk_mb:              f64,
  /// Number of resource samples collected
  pub sample_count:                 usize,
}

impl BatchStats {
  /// Derives the aggregate view from the per-paper records and the resource
  /// time series.
  pub fn from_records(
    records: &[PaperRecord],
    samples: &[ResourceSample],
    wall_time: Duration,
  ) -> Self {
    let mut stats = Self {
      total_papers: records.len(),
      total_wall_time_seconds: wall_time.as_secs_f64(),
      sample_count: samples.len(),
      ..Self::default()
    };

    let successful: Vec<&PaperRecord> = records.iter().filter(|r| r.success).collect();
    stats.successful_papers = successful.len();
    stats.failed_papers = records.len() - successful.len();
    if !records.is_empty() {
      stats.success_rate = successful.len() as f64 / records.len() as f64;
      stats.total_process_time_seconds = records.iter().map(|r| r.process_time_seconds).sum();
      stats.average_process_time_seconds = stats.total_process_time_seconds / records.len() as f64;
    }

    // Size averages only count papers that actually produced bytes, so a run
    // of failures doesn't drag the mean to zero.
    let sizes_before: Vec<u64> =
      successful.iter().map(|r| r.size_before_bytes).filter(|size| *size > 0).collect();
    if !sizes_before.is_empty() {
      stats.average_size_before_bytes =
        sizes_before.iter().sum::<u64>() as f64 / sizes_before.len() as f64;
    }
    let sizes_after: Vec<u64> =
      successful.iter().map(|r| r.size_after_bytes).filter(|size| *size > 0).collect();
    if !sizes_after.is_empty() {
      stats.average_size_after_bytes =
        sizes_after.iter().sum::<u64>() as f64 / sizes_after.len() as f64;
    }

    stats.total_references = successful.iter().map(|r| r.num_references).sum();
    if !successful.is_empty() {
      stats.average_references_per_paper =
        stats.total_references as f64 / successful.len() as f64;
    }

    if !samples.is_empty() {
      stats.peak_ram_mb = samples.iter().map(|s| s.ram_mb).fold(0.0, f64::max);
      stats.average_ram_mb = samples.iter().map(|s| s.ram_mb).sum::<f64>() / samples.len() as f64;
      stats.peak_disk_mb = samples.iter().map(|s| s.disk_mb).fold(0.0, f64::max);
      stats.average_disk_mb =
        samples.iter().map(|s| s.disk_mb).sum::<f64>() / samples.len() as f64;
    }

    stats
  }
}

/// Background task sampling process RAM and output-directory disk usage.
///
/// The task owns the sending half of an unbounded channel; the driver keeps
/// the receiving half and drains it after [`finish`](Self::finish) has
/// signaled shutdown and joined the task, so no sample is lost or torn.
pub struct ResourceSampler {
  /// Shutdown signal; flipping the value ends the sampling loop.
  shutdown: watch::Sender<bool>,
  /// Handle joined during [`finish`](Self::finish).
  handle:   tokio::task::JoinHandle<()>,
  /// Receiving half drained after the task has ended.
  receiver: mpsc::UnboundedReceiver<ResourceSample>,
}

impl ResourceSampler {
  /// Spawns the sampling task over `data_dir` with the given interval.
  pub fn spawn(data_dir: PathBuf, interval: Duration) -> Self {
    let (sample_tx, receiver) = mpsc::unbounded_channel();
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
      let started = Instant::now();
      let mut ticker = tokio::time::interval(interval);
      loop {
        tokio::select! {
          _ = ticker.tick() => {
            let sample = ResourceSample {
              elapsed_seconds: started.elapsed().as_secs_f64(),
              ram_mb:          process_rss_mb().unwrap_or(0.0),
              disk_mb:         directory_size(&data_dir) as f64 / 1024.0 / 1024.0,
            };
            trace!("Resource sample: {sample:?}");
            if sample_tx.send(sample).is_err() {
              break;
            }
          },
          _ = shutdown_rx.changed() => break,
        }
      }
    });

    Self { shutdown, handle, receiver }
  }

  /// Signals the task to stop, joins it, and returns the full time series.
  pub async fn finish(mut self) -> Vec<ResourceSample> {
    let _ = self.shutdown.send(true);
    if let Err(e) = self.handle.await {
      warn!("Resource sampler task failed: {e}");
    }

    let mut samples = Vec::new();
    while let Ok(sample) = self.receiver.try_recv() {
      samples.push(sample);
    }
    samples
  }
}

/// Resident set size of this process in MB, read from `/proc/self/status`.
#[cfg(target_os = "linux")]
pub fn process_rss_mb() -> Option<f64> {
  let content = std::fs::read_to_string("/proc/self/status").ok()?;
  let vm_rss_kb = content
    .lines()
    .find(|line| line.starts_with("VmRSS:"))
    .and_then(|line| line.split_whitespace().nth(1))
    .and_then(|value| value.parse::<f64>().ok())?;
  Some(vm_rss_kb / 1024.0)
}

/// Resident set size of this process in MB, via `ps`.
#[cfg(target_os = "macos")]
pub fn process_rss_mb() -> Option<f64> {
  let output = std::process::Command::new("ps")
    .args(["-o", "rss=", "-p", &std::process::id().to_string()])
    .output()
    .ok()?;
  let rss_kb = String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok()?;
  Some(rss_kb / 1024.0)
}

/// Resident set size is not tracked on this platform.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn process_rss_mb() -> Option<f64> { None }

/// Recursive size in bytes of all files under `path`; unreadable entries are
/// skipped, a missing directory counts as zero.
pub fn directory_size(path: &Path) -> u64 {
  walkdir::WalkDir::new(path)
    .into_iter()
    .filter_map(|entry| entry.ok())
    .filter(|entry| entry.file_type().is_file())
    .filter_map(|entry| entry.metadata().ok())
    .map(|metadata| metadata.len())
    .sum()
}

/// Time-series document written to `resource_usage.json`.
#[derive(Debug, Serialize)]
struct TimeSeries<'a> {
  /// Seconds between samples
  sampling_interval_seconds: f64,
  /// The collected samples, in order
  samples:                   &'a [ResourceSample],
}

/// Persists all metrics outputs under `metrics_dir`.
pub fn write_reports(
  metrics_dir: &Path,
  records: &[PaperRecord],
  samples: &[ResourceSample],
  stats: &BatchStats,
) -> Result<()> {
  std::fs::create_dir_all(metrics_dir)?;

  let stats_path = metrics_dir.join("statistics.json");
  std::fs::write(&stats_path, serde_json::to_string_pretty(stats)? + "\n")?;

  let series = TimeSeries {
    sampling_interval_seconds: SAMPLE_INTERVAL.as_secs_f64(),
    samples,
  };
  let series_path = metrics_dir.join("resource_usage.json");
  std::fs::write(&series_path, serde_json::to_string_pretty(&series)? + "\n")?;

  let mut series_csv = csv::Writer::from_path(metrics_dir.join("resource_usage.csv"))?;
  for sample in samples {
    series_csv.serialize(sample)?;
  }
  series_csv.flush()?;

  let mut papers_csv = csv::Writer::from_path(metrics_dir.join("papers.csv"))?;
  for record in records {
    papers_csv.serialize(record)?;
  }
  papers_csv.flush()?;

  info!("Wrote metrics reports to {}", metrics_dir.display());
  Ok(())
}
