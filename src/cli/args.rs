//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cachesync - Offline resource cache synchronizer
///
/// Keeps a local cache of an application's resources in sync with the
/// manifest of the deployed release.
#[derive(Parser, Debug)]
#[command(name = "cachesync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CACHESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Release file (overrides app.release)
    #[arg(short, long, global = true, env = "CACHESYNC_RELEASE")]
    pub release: Option<PathBuf>,

    /// Serving origin (overrides app.origin)
    #[arg(long, global = true, env = "CACHESYNC_ORIGIN")]
    pub origin: Option<String>,

    /// Blob store directory (overrides store.dir)
    #[arg(long, global = true, env = "CACHESYNC_STORE")]
    pub store: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the shell resources into the staging partition
    Install,

    /// Reconcile the cache against the release manifest
    Activate,

    /// Install and activate in one step
    Sync,

    /// Serve a request through the cache
    Fetch(FetchArgs),

    /// Download every release resource missing from the cache
    Offline(OfflineArgs),

    /// Deliver a host message (skipWaiting, downloadOffline)
    Message(MessageArgs),

    /// Show cache partitions and manifest state
    Status(StatusArgs),

    /// Delete all cache partitions
    Clear(ClearArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path relative to the origin
    pub url: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the offline command
#[derive(Parser, Debug)]
pub struct OfflineArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the message command
#[derive(Parser, Debug)]
pub struct MessageArgs {
    /// Message payload
    pub payload: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for report commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}
