//! Engine setup shared by the CLI commands

use crate::cli::host::CliHost;
use crate::config::{Config, ConfigManager};
use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::key::Origin;
use crate::lifecycle::Coordinator;
use crate::manifest::Release;
use crate::store::FsStore;
use crate::transport::HttpTransport;
use std::sync::Arc;
use tracing::debug;

/// A coordinator wired to the on-disk store and the HTTP transport
pub struct Engine {
    pub ctx: CacheContext,
    pub coordinator: Coordinator,
}

impl Engine {
    /// Load the configured release and build an engine serving `origin`
    pub async fn open(config: &Config, origin: Origin) -> CacheResult<Self> {
        let release = Release::from_file(&config.app.release).await?;
        debug!(
            "Loaded release {} with {} resources",
            release.version.as_deref().unwrap_or("(unversioned)"),
            release.resources.len()
        );

        let ctx = context(config, origin);
        let coordinator = Coordinator::new(ctx.clone(), release, Arc::new(CliHost));
        Ok(Self { ctx, coordinator })
    }
}

/// Build the engine context from configuration
pub fn context(config: &Config, origin: Origin) -> CacheContext {
    let store = FsStore::new(ConfigManager::store_dir(config));
    let transport = HttpTransport::new(&config.network);

    CacheContext::new(Arc::new(store), Arc::new(transport), origin)
        .with_partitions(config.store.partition_names())
        .with_root_aliases(config.app.root_aliases.clone())
        .with_offline_concurrency(config.network.offline_concurrency)
}

/// The configured origin, or the origin of `request_url` when none is set
pub fn resolve_origin(config: &Config, request_url: Option<&str>) -> CacheResult<Origin> {
    match (&config.app.origin, request_url) {
        (Some(origin), _) => Origin::parse(origin),
        (None, Some(url)) if is_absolute(url) => Origin::from_url(url),
        _ => Err(CacheError::OriginNotConfigured),
    }
}

/// Resolve a command-line URL argument against the origin
pub fn absolute_url(origin: &Origin, url: &str) -> String {
    if is_absolute(url) {
        url.to_string()
    } else {
        format!("{}/{}", origin, url.trim_start_matches('/'))
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
