//! Error kinds shared across the socket/HTTP boundary.
//!
//! Style grounded on `agcodex-persistence::error::PersistenceError`: one
//! variant per failure mode with a terse `#[error]` message. Storage- and
//! session-internal errors (`StorageError`, session-registry failures)
//! live in their own crates and convert into `WireError` at the
//! socket/HTTP boundary, never leaking internal detail to clients.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Malformed payload: connection-local, logged, event dropped.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed event payload: {0}")]
    Malformed(String),

    #[error("unknown event type: {0}")]
    UnknownEvent(String),
}

/// Error surfaced to a client over the wire, serialized verbatim into a
/// reply or a `session-expired`-style signal. Never carries a stored
/// fingerprint or passphrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: WireErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireErrorKind {
    PassphraseMismatch,
    SessionExpired,
    Unauthorized,
    NotFound,
    OutOfOrder,
    StorageError,
    ProtocolError,
}

impl WireError {
    pub fn new(kind: WireErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
