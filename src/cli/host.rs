//! Host hooks for one-shot CLI runs
//!
//! A CLI process has no clients to claim and no older instance to wait for,
//! so both hooks only record that the engine asked for them.

use crate::lifecycle::Host;
use async_trait::async_trait;
use tracing::info;

/// Host used by the `cachesync` binary
#[derive(Debug, Default)]
pub struct CliHost;

#[async_trait]
impl Host for CliHost {
    async fn claim_clients(&self) {
        info!("Claiming clients");
    }

    async fn skip_waiting(&self) {
        info!("Skipping waiting period");
    }
}
