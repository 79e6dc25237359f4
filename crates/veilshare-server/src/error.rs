//! Maps internal error kinds onto the wire/HTTP boundary.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use veilshare_chunkstore::StorageError;
use veilshare_protocol::WireError;
use veilshare_protocol::WireErrorKind;
use veilshare_session::SessionError;

pub fn session_error_to_wire(err: &SessionError) -> WireError {
    match err {
        SessionError::PassphraseMismatch => {
            WireError::new(WireErrorKind::PassphraseMismatch, "passphrase fingerprint does not match")
        }
        SessionError::SessionExpired(id) => {
            WireError::new(WireErrorKind::SessionExpired, format!("session {id} has expired"))
        }
        SessionError::Unauthorized => WireError::new(WireErrorKind::Unauthorized, "missing or revoked token"),
        SessionError::NotFound(id) => WireError::new(WireErrorKind::NotFound, format!("session {id} not found")),
    }
}

pub fn storage_error_to_wire(err: &StorageError) -> WireError {
    WireError::new(WireErrorKind::StorageError, err.to_string())
}

/// HTTP-side wrapper so `?` works in axum handlers.
pub struct HttpError(pub StatusCode, pub String);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<SessionError> for HttpError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized => HttpError(StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            SessionError::NotFound(_) | SessionError::SessionExpired(_) => {
                HttpError(StatusCode::NOT_FOUND, "not found".to_string())
            }
            SessionError::PassphraseMismatch => HttpError(StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        }
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage error on download path");
        HttpError(StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
    }
}
