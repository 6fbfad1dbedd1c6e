//! Clear command - delete every cache partition

use crate::cli::args::ClearArgs;
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use crate::store::{BlobStore, FsStore};
use console::style;
use std::io::{self, Write};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> CacheResult<()> {
    let store = FsStore::new(ConfigManager::store_dir(config));
    let names = config.store.partition_names();
    let existing = store.partitions().await?;

    let targets: Vec<&str> = names
        .all()
        .into_iter()
        .filter(|name| existing.iter().any(|p| p == name))
        .collect();

    if targets.is_empty() {
        println!("No cache partitions to clear.");
        return Ok(());
    }

    println!("This will delete {} partition(s):", targets.len());
    for name in &targets {
        println!("  {} {}", style("•").red(), name);
    }
    println!();

    if !args.yes {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut removed = 0;
    for name in targets {
        if store.delete_partition(name).await? {
            removed += 1;
        }
    }

    println!("{} cleared {} partition(s)", style("✓").green(), removed);
    Ok(())
}
