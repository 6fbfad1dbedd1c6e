//! Message command - deliver a host message to the engine

use super::offline::print_report;
use crate::cli::args::MessageArgs;
use crate::cli::engine::{resolve_origin, Engine};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::lifecycle::MessageOutcome;
use console::style;
use tracing::debug;

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config) -> CacheResult<()> {
    let origin = resolve_origin(config, None)?;
    let engine = Engine::open(config, origin).await?;

    match engine.coordinator.resume().await {
        Ok(()) => {}
        Err(CacheError::NotActivated) => debug!("Cache not activated, delivering message anyway"),
        Err(e) => return Err(e),
    }

    match engine.coordinator.on_message(&args.payload).await? {
        MessageOutcome::SkippedWaiting => {
            println!("{} Skipped waiting period", style("✓").green());
        }
        MessageOutcome::Downloaded(report) => print_report(&report),
        MessageOutcome::Ignored => {
            println!(
                "{} Message {:?} ignored",
                style("⚠").yellow(),
                args.payload
            );
        }
    }
    Ok(())
}
