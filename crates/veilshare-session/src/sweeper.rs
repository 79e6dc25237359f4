//! `ExpirationSweeper`. Grounded directly on
//! `agcodex-persistence::session_manager`'s `start_auto_save` task shape:
//! a `tokio::spawn` + `tokio::time::interval` loop that snapshots live
//! state, then processes each item under its own lock, logging and
//! continuing past per-item failures rather than aborting the loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use veilshare_protocol::ClientId;
use veilshare_protocol::SessionId;

use crate::registry::SessionRegistry;

/// Side effects the sweeper needs that live outside `veilshare-session`
/// (socket fan-out, retention trimming) — implemented by
/// `veilshare-server` and injected so this crate stays free of axum and
/// `veilshare-chunkstore`.
#[async_trait]
pub trait SweeperHooks: Send + Sync {
    async fn on_session_expired(&self, session_id: &SessionId, members: &[ClientId]);

    /// Deferred `cleanupOldContent` pass.
    async fn trim_retention(&self, session_id: &SessionId);
}

pub struct ExpirationSweeper {
    registry: Arc<SessionRegistry>,
    hooks: Arc<dyn SweeperHooks>,
    interval: StdDuration,
}

impl ExpirationSweeper {
    pub fn new(registry: Arc<SessionRegistry>, hooks: Arc<dyn SweeperHooks>, interval: StdDuration) -> Self {
        Self { registry, hooks, interval }
    }

    /// Spawns the sweeper loop as an independent task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }

    /// One sweep: snapshot candidates, then process each under its own
    /// lock so a racing join can't be clobbered.
    async fn run_once(&self) {
        for session_id in self.registry.candidates_for_expiration() {
            let members = self.registry.expire(&session_id).await;
            if members.is_empty() {
                // Already expired by a racing tick, or had no live members.
                continue;
            }
            self.hooks.on_session_expired(&session_id, &members).await;
            self.hooks.trim_retention(&session_id).await;
            tracing::info!(%session_id, member_count = members.len(), "session expired");
        }
    }
}
