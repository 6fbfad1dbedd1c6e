//! Activate command - reconcile the cache against the release

use crate::cli::engine::{resolve_origin, Engine};
use crate::config::Config;
use crate::error::CacheResult;
use crate::reconcile::ReconcileReport;
use console::style;

/// Execute the activate command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, None)?;
    let engine = Engine::open(config, origin).await?;

    engine.coordinator.restore_installed().await?;
    let report = engine.coordinator.on_activate().await?;
    print_report(&report, engine.coordinator.manifest().len());
    Ok(())
}

/// Print the outcome of a reconciliation
pub(super) fn print_report(report: &ReconcileReport, resources: usize) {
    if report.cold_start {
        println!(
            "{} Cache created ({} resource(s) in release)",
            style("✓").green(),
            resources
        );
    } else {
        println!(
            "{} Cache upgraded ({} resource(s) in release)",
            style("✓").green(),
            resources
        );
    }

    println!("  {:<10} {}", "promoted", report.promoted);
    println!("  {:<10} {}", "retained", report.retained);
    println!("  {:<10} {}", "evicted", report.evicted.len());
    for key in &report.evicted {
        println!("    {} {}", style("-").red(), key);
    }
}
