//! Wire contract between veilshare clients and the server.
//!
//! This crate owns nothing but types: every operation that interprets
//! them lives in `veilshare-chunkstore`, `veilshare-session`, or
//! `veilshare-server`.

pub mod chunk;
pub mod content;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod ids;


pub use chunk::ChunkFrame;
pub use chunk::ENCRYPTED_CHUNK_SIZE;
pub use content::ContentMetadata;
pub use content::ContentType;
pub use error::ProtocolError;
pub use error::WireError;
pub use error::WireErrorKind;
pub use events::ClearAllPayload;
pub use events::ClientEvent;
pub use events::ContentClearedPayload;
pub use events::ContentPayload;
pub use events::JoinPayload;
pub use events::JoinReply;
pub use events::LeavePayload;
pub use events::MemberView;
pub use events::PinPayload;
pub use events::PinStatePayload;
pub use events::RenamePayload;
pub use events::RenamedPayload;
pub use events::ServerEvent;
pub use events::SessionExpiredPayload;
pub use fingerprint::Fingerprint;
pub use ids::ClientId;
pub use ids::ContentId;
pub use ids::SessionId;
pub use ids::SessionToken;
