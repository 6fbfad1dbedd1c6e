//! cachesync - Offline resource cache synchronizer
//!
//! CLI entry point that dispatches to subcommands.

use cachesync::cli::{commands, Cli, Commands};
use cachesync::config::{Config, ConfigManager};
use cachesync::error::CacheResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config {}", manager.path().display());

    apply_overrides(&cli, &mut config);

    match cli.command {
        Commands::Install => commands::install(&config).await,
        Commands::Activate => commands::activate(&config).await,
        Commands::Sync => commands::sync(&config).await,
        Commands::Fetch(args) => commands::fetch(args, &config).await,
        Commands::Offline(args) => commands::offline(args, &config).await,
        Commands::Message(args) => commands::message(args, &config).await,
        Commands::Status(args) => commands::status(args, &config).await,
        Commands::Clear(args) => commands::clear(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("cachesync=warn"),
        1 => EnvFilter::new("cachesync=info"),
        _ => EnvFilter::new("cachesync=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Command-line flags take precedence over the config file
fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(ref release) = cli.release {
        config.app.release = release.clone();
    }
    if let Some(ref origin) = cli.origin {
        config.app.origin = Some(origin.clone());
    }
    if let Some(ref store) = cli.store {
        config.store.dir = Some(store.clone());
    }
}
