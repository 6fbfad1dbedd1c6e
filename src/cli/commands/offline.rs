//! Offline command - download every release resource not yet cached

use crate::cli::args::{OfflineArgs, OutputFormat};
use crate::cli::engine::{resolve_origin, Engine};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::prefetch::OfflineReport;
use console::style;

/// Execute the offline command
pub async fn execute(args: OfflineArgs, config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, None)?;
    let engine = Engine::open(config, origin).await?;
    engine.coordinator.resume().await?;

    let report = engine.coordinator.download_offline().await?;
    match args.format {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CacheError::User(format!(
            "{} resource(s) could not be downloaded",
            report.failed.len()
        )))
    }
}

pub(super) fn print_report(report: &OfflineReport) {
    println!(
        "{} {} already cached, {} downloaded",
        style("✓").green(),
        report.already_cached,
        report.fetched.len()
    );
    for key in &report.fetched {
        println!("  {} {}", style("+").green(), key);
    }
    for (key, reason) in &report.failed {
        println!("  {} {} {}", style("✗").red(), key, style(reason).dim());
    }
}
