//! Lifecycle coordination
//!
//! The host runtime drives the engine through a small set of hooks
//! (`on_install`, `on_activate`, `on_fetch`, `on_message`). The coordinator
//! keeps the lifecycle phase and makes sure requests are only served once
//! the cache has been reconciled for the current release.
//!
//! ```text
//! Idle ──install──▶ Installing ──▶ Installed ──activate──▶ Activating ──▶ Serving
//!                        │                                     │
//!                        └──────────────▶ Failed ◀─────────────┘
//! ```

use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::intercept::{Intercept, Interceptor};
use crate::manifest::{ManifestStore, Release, ResourceManifest};
use crate::prefetch::{OfflineReport, Prefetcher};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::transport::Request;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Hooks the host runtime exposes to the engine
#[async_trait]
pub trait Host: Send + Sync {
    /// Take control of every open client immediately
    async fn claim_clients(&self);

    /// Activate this instance without waiting for older ones to release
    async fn skip_waiting(&self);
}

/// Lifecycle phase of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Installing,
    Installed,
    Activating,
    Serving,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Serving => "serving",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Commands accepted through host messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Promote a waiting instance immediately
    SkipWaiting,
    /// Download every manifest resource for offline use
    DownloadOffline,
}

impl Command {
    /// Parse a message payload; unknown payloads yield `None`
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "skipWaiting" => Some(Self::SkipWaiting),
            "downloadOffline" => Some(Self::DownloadOffline),
            _ => None,
        }
    }
}

/// What handling a message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkippedWaiting,
    Downloaded(OfflineReport),
    Ignored,
}

/// Drives install, activation and serving for one release
pub struct Coordinator {
    ctx: CacheContext,
    manifest: Arc<ResourceManifest>,
    shell: Vec<String>,
    host: Arc<dyn Host>,
    reconciler: Reconciler,
    prefetcher: Prefetcher,
    interceptor: Interceptor,
    phase: RwLock<Phase>,
}

impl Coordinator {
    pub fn new(ctx: CacheContext, release: Release, host: Arc<dyn Host>) -> Self {
        let release = release.collapse_root_aliases(&ctx.root_aliases);
        let manifest = Arc::new(release.resources);
        Self {
            reconciler: Reconciler::new(ctx.clone()),
            prefetcher: Prefetcher::new(ctx.clone()),
            interceptor: Interceptor::new(ctx.clone(), manifest.clone()),
            ctx,
            manifest,
            shell: release.shell,
            host,
            phase: RwLock::new(Phase::Idle),
        }
    }

    /// Current lifecycle phase
    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    /// Install hook: stage the shell resources
    pub async fn on_install(&self) -> CacheResult<usize> {
        self.enter(&[Phase::Idle, Phase::Failed], Phase::Installing)
            .await?;
        self.host.skip_waiting().await;

        match self.prefetcher.prefetch_shell(&self.shell).await {
            Ok(staged) => {
                self.set_phase(Phase::Installed).await;
                Ok(staged)
            }
            Err(e) => {
                warn!("Install failed: {}", e);
                self.set_phase(Phase::Failed).await;
                Err(e)
            }
        }
    }

    /// Activate hook: reconcile the cache, then take over clients
    pub async fn on_activate(&self) -> CacheResult<ReconcileReport> {
        self.enter(&[Phase::Installed], Phase::Activating).await?;

        match self.reconciler.reconcile(&self.manifest).await {
            Ok(report) => {
                self.host.claim_clients().await;
                self.set_phase(Phase::Serving).await;
                Ok(report)
            }
            Err(e) => {
                self.set_phase(Phase::Failed).await;
                Err(e)
            }
        }
    }

    /// Fetch hook: requests pass through until the instance is serving
    pub async fn on_fetch(&self, request: &Request) -> CacheResult<Intercept> {
        if self.phase().await != Phase::Serving {
            debug!("Not serving yet, passing through {}", request.url);
            return Ok(Intercept::PassThrough);
        }
        self.interceptor.handle(request).await
    }

    /// Message hook: run a recognized command, ignore anything else
    pub async fn on_message(&self, payload: &str) -> CacheResult<MessageOutcome> {
        match Command::parse(payload) {
            Some(Command::SkipWaiting) => {
                self.force_activate().await;
                Ok(MessageOutcome::SkippedWaiting)
            }
            Some(Command::DownloadOffline) => {
                let phase = self.phase().await;
                if phase != Phase::Serving {
                    warn!("Ignoring offline download while {}", phase);
                    return Ok(MessageOutcome::Ignored);
                }
                self.download_offline().await.map(MessageOutcome::Downloaded)
            }
            None => {
                debug!("Ignoring unrecognized message {:?}", payload);
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Skip any deferred-activation grace period
    pub async fn force_activate(&self) {
        info!("Skipping waiting period");
        self.host.skip_waiting().await;
    }

    /// Fetch every manifest resource the live partition is missing
    pub async fn download_offline(&self) -> CacheResult<OfflineReport> {
        self.prefetcher.prefetch_remaining(&self.manifest).await
    }

    /// Serve immediately when the cache was already reconciled for this release
    ///
    /// Used by hosts that restart between activation and serving.
    pub async fn resume(&self) -> CacheResult<()> {
        let partition = self.ctx.store.open(&self.ctx.partitions.manifest).await?;
        match ManifestStore::new(&*partition).load().await? {
            Some(stored) if stored == *self.manifest => {
                self.set_phase(Phase::Serving).await;
                debug!("Resumed serving {} resources", self.manifest.len());
                Ok(())
            }
            _ => Err(CacheError::NotActivated),
        }
    }

    /// Pick up shell resources staged by an install in an earlier process
    pub async fn restore_installed(&self) -> CacheResult<()> {
        let staging = self.ctx.store.open(&self.ctx.partitions.staging).await?;
        let staged: HashSet<String> = staging.keys().await?.into_iter().collect();
        let missing = self
            .shell
            .iter()
            .filter(|key| !staged.contains(&self.ctx.origin.canonical_url(key)))
            .count();
        if missing > 0 {
            debug!("{} shell resources missing from staging", missing);
            return Err(CacheError::NotInstalled(self.ctx.partitions.staging.clone()));
        }
        self.enter(&[Phase::Idle], Phase::Installed).await
    }

    async fn enter(&self, from: &[Phase], to: Phase) -> CacheResult<()> {
        let mut phase = self.phase.write().await;
        if !from.contains(&*phase) {
            return Err(CacheError::InvalidPhase {
                expected: from[0].as_str(),
                actual: phase.as_str(),
            });
        }
        info!("Lifecycle {} -> {}", *phase, to);
        *phase = to;
        Ok(())
    }

    async fn set_phase(&self, to: Phase) {
        let mut phase = self.phase.write().await;
        info!("Lifecycle {} -> {}", *phase, to);
        *phase = to;
    }
}
