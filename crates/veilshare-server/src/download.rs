//! `DownloadGateway`: streams the concatenation of a content's chunks
//! one at a time rather than buffering the whole payload, grounded on
//! `futures_util::stream` + `axum::body::Body`'s
//! streaming idiom (the pack's HTTP-streaming shape, e.g.
//! Idleness76-Weavegraph's SSE demo streams a `Stream` straight into an
//! axum body).

use axum::body::Body;
use axum::extract::Path;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use futures_util::stream;
use futures_util::StreamExt;

use veilshare_chunkstore::strip_length_prefix;
use veilshare_protocol::ContentId;
use veilshare_protocol::SessionToken;

use crate::error::HttpError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Some(SessionToken(token.to_string()))
}

/// `GET /api/download/{contentId}`. Each chunk file is read (bounded by
/// `ENCRYPTED_CHUNK_SIZE`), stripped of its on-disk length prefix, and
/// yielded as one `iv || ciphertext` frame; the response body is never
/// assembled in full before sending.
pub async fn download_content(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let token = bearer_token(&headers).ok_or(HttpError(StatusCode::UNAUTHORIZED, "missing bearer token".to_string()))?;
    let (session_id, _client_id) = state
        .registry
        .validate_token(&token)
        .ok_or(HttpError(StatusCode::UNAUTHORIZED, "unauthorized".to_string()))?;

    let metadata = state
        .chunk_store
        .get_content_metadata(&ContentId(content_id.clone()))
        .ok_or(HttpError(StatusCode::NOT_FOUND, "not found".to_string()))?;

    if metadata.session_id != session_id {
        return Err(HttpError(StatusCode::NOT_FOUND, "not found".to_string()));
    }

    state.chunk_store.touch_accessed(&metadata.content_id).await?;

    let chunk_paths = state.chunk_store.chunk_paths_ascending(&ContentId(content_id))?;
    let body_stream = stream::iter(chunk_paths).then(|path| async move {
        let bytes = tokio::fs::read(&path).await?;
        Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from(strip_length_prefix(bytes)))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(body_stream),
    )
        .into_response())
}
