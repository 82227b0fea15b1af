//! The `init` command: write a default settings file.

use super::*;

/// Writes a default settings file at the configured path, asking before
/// overwriting an existing one unless `--accept-defaults` is set.
pub async fn init(cli: &Cli) -> Result<()> {
  let config_path = cli.config_path();

  if config_path.exists() && !cli.accept_defaults {
    let overwrite = dialoguer::Confirm::new()
      .with_prompt(format!(
        "Settings file {} already exists. Overwrite with defaults?",
        config_path.display()
      ))
      .default(false)
      .interact()?;
    if !overwrite {
      println!("{} Keeping the existing settings file", style(WARNING_PREFIX).yellow());
      return Ok(());
    }
  }

  Config::default().save(&config_path).map_err(HarvesterdError::from)?;
  println!(
    "{} Settings initialized at {}",
    style(SUCCESS_PREFIX).green(),
    style(config_path.display()).yellow()
  );
  println!("   Add paper identifiers to the {} list and run `harvester run`", style("papers").cyan());
  Ok(())
}
