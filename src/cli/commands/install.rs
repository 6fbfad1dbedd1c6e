//! Install command - stage the shell resources

use crate::cli::engine::{resolve_origin, Engine};
use crate::config::Config;
use crate::error::CacheResult;
use console::style;

/// Execute the install command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, None)?;
    let engine = Engine::open(config, origin).await?;

    let staged = engine.coordinator.on_install().await?;
    println!(
        "{} Staged {} shell resource(s) in {}",
        style("✓").green(),
        staged,
        engine.ctx.partitions.staging
    );
    Ok(())
}
