//! The `fetch` command: process a single paper.

use harvester::{harvest::Harvester, identifier::ArxivId};

use super::*;

/// Processes one paper using the configured settings (or defaults when no
/// settings file exists) and prints its report.
pub async fn fetch(cli: &Cli, identifier: &str) -> Result<()> {
  let id: ArxivId = match identifier.parse() {
    Ok(id) => id,
    Err(e) => {
      eprintln!(
        "{} {} is not an arXiv identifier (expected e.g. 1706.03762)",
        style(ERROR_PREFIX).red(),
        style(identifier).yellow()
      );
      return Err(HarvesterdError::from(e));
    },
  };

  let config_path = cli.config_path();
  let config =
    if config_path.exists() { Config::load(&config_path)? } else { Config::default() };

  println!("{} Fetching {}", style(WORKING_PREFIX).cyan(), style(&id).yellow());
  let harvester = Harvester::new(config)?;
  let report = harvester.process_paper(&id).await;

  if report.success {
    println!(
      "{} {}: {} version(s), {} bytes before, {} bytes after, {} reference(s)",
      style(SUCCESS_PREFIX).green(),
      id,
      report.versions.len(),
      report.size_before,
      report.size_after,
      report.num_references
    );
  } else {
    println!(
      "{} {} failed; no version could be downloaded and extracted",
      style(ERROR_PREFIX).red(),
      id
    );
  }
  Ok(())
}
