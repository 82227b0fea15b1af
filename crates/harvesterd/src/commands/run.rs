//! The `run` command: drive the full batch.

use harvester::harvest::Harvester;
use tracing::debug;

use super::*;

/// Runs the batch over every configured paper and prints the aggregate
/// statistics. Individual paper failures never fail the command.
pub async fn run(cli: &Cli) -> Result<()> {
  let config_path = cli.config_path();
  if !config_path.exists() {
    println!(
      "{} No settings file at {}; writing defaults. Edit it and re-run.",
      style(WARNING_PREFIX).yellow(),
      style(config_path.display()).cyan()
    );
    Config::default().save(&config_path).map_err(HarvesterdError::from)?;
    return Ok(());
  }

  let mut harvester = Harvester::from_config_file(&config_path)?;
  debug!("Loaded settings from {}", config_path.display());
  let paper_count = harvester.config().paper_ids()?.len();
  println!(
    "{} Harvesting {} paper(s) into {}",
    style(WORKING_PREFIX).cyan(),
    style(paper_count).yellow(),
    style(harvester.config().output_dir.display()).yellow()
  );

  let outcome = harvester.run(true).await?;
  let stats = &outcome.stats;

  println!(
    "{} Batch complete: {}/{} succeeded ({:.0}%)",
    style(SUCCESS_PREFIX).green(),
    style(stats.successful_papers).green(),
    stats.total_papers,
    stats.success_rate * 100.0
  );
  println!(
    "   Average sizes: {:.0} bytes before, {:.0} bytes after filtering",
    stats.average_size_before_bytes, stats.average_size_after_bytes
  );
  println!(
    "   References: {} total, {:.1} per paper",
    stats.total_references, stats.average_references_per_paper
  );
  if stats.sample_count > 0 {
    println!(
      "   Resources: peak RAM {:.1} MB, peak disk {:.1} MB over {} samples",
      stats.peak_ram_mb, stats.peak_disk_mb, stats.sample_count
    );
  }
  println!(
    "   Reports written to {}",
    style(harvester.config().metrics_dir.display()).yellow()
  );

  if stats.failed_papers > 0 {
    println!(
      "{} {} paper(s) failed; see papers.csv for details",
      style(WARNING_PREFIX).yellow(),
      stats.failed_papers
    );
  }

  Ok(())
}
