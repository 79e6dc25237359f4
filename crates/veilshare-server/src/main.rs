//! Process entry point: singleton registries are constructor-injected
//! services with explicit lifetime owned here.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use veilshare_chunkstore::ChunkStore;
use veilshare_server::sweeper_hooks::ServerSweeperHooks;
use veilshare_server::AppState;
use veilshare_server::Config;
use veilshare_session::ExpirationSweeper;
use veilshare_session::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())).init();

    let config_path = std::env::var("VEILSHARE_CONFIG").unwrap_or_else(|_| "veilshare.toml".to_string());
    let config = Arc::new(Config::load(config_path)?);
    tracing::info!(storage_path = %config.storage_path.display(), bind_addr = %config.bind_addr, "starting veilshare-server");

    let chunk_store = Arc::new(ChunkStore::open(config.storage_path.clone()).await?);
    let registry = Arc::new(SessionRegistry::new(config.idle_threshold()));
    let connections = Arc::new(veilshare_server::connections::Connections::default());

    let hooks = Arc::new(ServerSweeperHooks {
        connections: connections.clone(),
        chunk_store: chunk_store.clone(),
        config: config.clone(),
    });
    let sweeper = ExpirationSweeper::new(registry.clone(), hooks, config.cleanup_interval());
    sweeper.spawn();

    let state = AppState {
        chunk_store,
        registry,
        connections,
        pending_chunks: Arc::new(veilshare_server::pending::PendingChunks::default()),
        config: config.clone(),
    };

    let router = veilshare_server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, router.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

/// Waits for Ctrl+C (or, on Unix, SIGTERM) so in-flight connections drain
/// before the process exits rather than dropping mid-write.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
