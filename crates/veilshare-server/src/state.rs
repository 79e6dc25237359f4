//! Constructor-injected services shared by every axum handler: singleton
//! registries owned by the process entry point rather than globals.

use std::sync::Arc;

use veilshare_chunkstore::ChunkStore;
use veilshare_session::SessionRegistry;

use crate::config::Config;
use crate::connections::Connections;
use crate::pending::PendingChunks;

#[derive(Clone)]
pub struct AppState {
    pub chunk_store: Arc<ChunkStore>,
    pub registry: Arc<SessionRegistry>,
    pub connections: Arc<Connections>,
    pub pending_chunks: Arc<PendingChunks>,
    pub config: Arc<Config>,
}
