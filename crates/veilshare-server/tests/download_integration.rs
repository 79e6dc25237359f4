//! Large-file download gateway scenario: a 2-chunk, 65,552-byte-per-chunk
//! content downloads as the exact concatenation of `iv || ciphertext`
//! per chunk, streamed rather than buffered whole.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::time::sleep;

use veilshare_chunkstore::ChunkStore;
use veilshare_protocol::ChunkFrame;
use veilshare_protocol::ClientId;
use veilshare_protocol::ContentId;
use veilshare_protocol::ContentMetadata;
use veilshare_protocol::ContentType;
use veilshare_protocol::Fingerprint;
use veilshare_protocol::SessionId;
use veilshare_server::connections::Connections;
use veilshare_server::pending::PendingChunks;
use veilshare_server::sweeper_hooks::ServerSweeperHooks;
use veilshare_server::AppState;
use veilshare_server::Config;
use veilshare_session::ExpirationSweeper;
use veilshare_session::SessionRegistry;

async fn spawn_server() -> (SocketAddr, Arc<ChunkStore>, Arc<SessionRegistry>) {
    let temp = tempfile::tempdir().unwrap();
    let config = Arc::new(Config { storage_path: temp.path().to_path_buf(), ..Config::default() });
    std::mem::forget(temp);

    let chunk_store = Arc::new(ChunkStore::open(config.storage_path.clone()).await.unwrap());
    let registry = Arc::new(SessionRegistry::new(config.idle_threshold()));
    let connections = Arc::new(Connections::default());
    let hooks = Arc::new(ServerSweeperHooks {
        connections: connections.clone(),
        chunk_store: chunk_store.clone(),
        config: config.clone(),
    });
    ExpirationSweeper::new(registry.clone(), hooks, config.cleanup_interval()).spawn();

    let state = AppState {
        chunk_store: chunk_store.clone(),
        registry: registry.clone(),
        connections,
        pending_chunks: Arc::new(PendingChunks::default()),
        config,
    };
    let router = veilshare_server::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });
    sleep(Duration::from_millis(20)).await;
    (addr, chunk_store, registry)
}

fn metadata(content_id: &str, session_id: &str, total_chunks: u32) -> ContentMetadata {
    ContentMetadata {
        content_id: ContentId(content_id.to_string()),
        session_id: SessionId(session_id.to_string()),
        sender_id: "A".to_string(),
        sender_name: "A".to_string(),
        content_type: ContentType::File,
        mime_type: Some("application/octet-stream".to_string()),
        file_name: Some("large.bin".to_string()),
        size: 0,
        image_info: None,
        text_info: None,
        file_info: None,
        total_chunks,
        total_size: 0,
        is_chunked: true,
        is_large_file: true,
        is_complete: false,
        is_pinned: false,
        created_at: Utc::now(),
        last_accessed_at: Utc::now(),
        encryption_metadata: None,
        additional_metadata: serde_json::json!({}),
    }
}

#[tokio::test]
async fn large_file_streams_as_iv_concatenated_with_ciphertext() {
    let (addr, chunk_store, registry) = spawn_server().await;
    let session_id = SessionId("s1".to_string());
    let content_id = ContentId("big".to_string());

    chunk_store.reserve_content(metadata("big", "s1", 2)).await.unwrap();
    let reserved_last_accessed = chunk_store.get_content_metadata(&content_id).unwrap().last_accessed_at;

    let iv0 = vec![0xA0u8; 12];
    let iv1 = vec![0xA1u8; 12];
    let ct0 = vec![0x11u8; 65_552];
    let ct1 = vec![0x22u8; 65_552];

    chunk_store
        .save_chunk(&ChunkFrame {
            content_id: content_id.clone(),
            chunk_index: 0,
            total_chunks: 2,
            iv: iv0.clone(),
            encrypted_data: ct0.clone(),
        })
        .await
        .unwrap();
    chunk_store
        .save_chunk(&ChunkFrame {
            content_id: content_id.clone(),
            chunk_index: 1,
            total_chunks: 2,
            iv: iv1.clone(),
            encrypted_data: ct1.clone(),
        })
        .await
        .unwrap();

    let client_id = ClientId::new();
    let outcome = registry
        .join_or_create(session_id.clone(), client_id, "A".to_string(), Fingerprint { iv: vec![0; 12], data: vec![0; 16] })
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/download/big"))
        .bearer_auth(&outcome.token.0)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body = response.bytes().await.unwrap();

    let mut expected = Vec::with_capacity(2 * (12 + 65_552));
    expected.extend_from_slice(&iv0);
    expected.extend_from_slice(&ct0);
    expected.extend_from_slice(&iv1);
    expected.extend_from_slice(&ct1);
    assert_eq!(body.len(), expected.len());
    assert_eq!(body.as_ref(), expected.as_slice());

    let refreshed = chunk_store.get_content_metadata(&ContentId("big".to_string())).unwrap();
    assert!(refreshed.last_accessed_at > reserved_last_accessed);
}

#[tokio::test]
async fn download_without_bearer_token_is_unauthorized() {
    let (addr, _chunk_store, _registry) = spawn_server().await;
    let client = reqwest::Client::new();
    let response = client.get(format!("http://{addr}/api/download/missing")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}
