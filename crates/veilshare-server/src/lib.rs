//! SocketRouter, DownloadGateway, and process wiring for veilshare.
//! Owns no durable state itself: `ChunkStore` and `SessionRegistry` are
//! constructor-injected from `main`.

pub mod config;
pub mod connections;
pub mod download;
pub mod error;
pub mod health;
pub mod pending;
pub mod router;
pub mod socket;
pub mod state;
pub mod sweeper_hooks;

pub use config::Config;
pub use router::build_router;
pub use state::AppState;
