//! Sync command - install and activate in one run

use super::activate::print_report;
use crate::cli::engine::{resolve_origin, Engine};
use crate::config::Config;
use crate::error::CacheResult;
use console::style;

/// Execute the sync command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, None)?;
    let engine = Engine::open(config, origin).await?;

    let staged = engine.coordinator.on_install().await?;
    println!("{} Staged {} shell resource(s)", style("✓").green(), staged);

    let report = engine.coordinator.on_activate().await?;
    print_report(&report, engine.coordinator.manifest().len());
    Ok(())
}
