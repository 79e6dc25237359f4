//! Wires `ExpirationSweeper`'s side effects back into the socket/storage
//! layers the `veilshare-session` crate deliberately doesn't depend on.

use std::sync::Arc;

use async_trait::async_trait;
use veilshare_chunkstore::ChunkStore;
use veilshare_protocol::ClientId;
use veilshare_protocol::ServerEvent;
use veilshare_protocol::SessionExpiredPayload;
use veilshare_protocol::SessionId;
use veilshare_session::SweeperHooks;

use crate::config::Config;
use crate::connections::Connections;

pub struct ServerSweeperHooks {
    pub connections: Arc<Connections>,
    pub chunk_store: Arc<ChunkStore>,
    pub config: Arc<Config>,
}

#[async_trait]
impl SweeperHooks for ServerSweeperHooks {
    async fn on_session_expired(&self, session_id: &SessionId, members: &[ClientId]) {
        let event = ServerEvent::SessionExpired(SessionExpiredPayload {
            session_id: session_id.clone(),
            message: "session expired due to inactivity".to_string(),
        });
        for client_id in members {
            self.connections.send_to(session_id, client_id, event.clone());
            self.connections.unregister(session_id, client_id);
        }
    }

    async fn trim_retention(&self, session_id: &SessionId) {
        if let Err(err) = self.chunk_store.cleanup_old_content(session_id, self.config.max_items_per_session).await {
            tracing::warn!(error = %err, %session_id, "deferred retention trim failed");
        }
    }
}
