//! Session-layer error kinds. `SocketRouter`/`DownloadGateway` map these
//! onto `WireError` at the boundary.

use thiserror::Error;

use veilshare_protocol::SessionId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("fingerprint does not match the session's stored fingerprint")]
    PassphraseMismatch,

    #[error("session {0} has expired")]
    SessionExpired(SessionId),

    #[error("token is missing, unknown, or revoked")]
    Unauthorized,

    #[error("session {0} does not exist")]
    NotFound(SessionId),
}
