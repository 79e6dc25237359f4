//! Socket wire events. Tagged sum type at the boundary: internal code
//! only ever sees a validated `ClientEvent` variant, never a raw JSON
//! blob.

use serde::Deserialize;
use serde::Serialize;

use crate::chunk::ChunkFrame;
use crate::content::ContentMetadata;
use crate::fingerprint::Fingerprint;
use crate::ids::ClientId;
use crate::ids::ContentId;
use crate::ids::SessionId;
use crate::ids::SessionToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub id: ClientId,
    pub name: String,
}

/// `join { sessionId, clientName, fingerprint }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub session_id: SessionId,
    pub client_name: String,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPayload {
    pub metadata: ContentMetadata,
    /// Present iff the content is non-chunked.
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinPayload {
    pub content_id: ContentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePayload {
    pub content_id: ContentId,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavePayload {
    pub session_id: SessionId,
}

/// Events a client may send. Tagged on `"type"` so the boundary decoder
/// rejects anything that doesn't match one of these shapes up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join(JoinPayload),
    Rejoin(JoinPayload),
    Leave(LeavePayload),
    Content(ContentPayload),
    Chunk(ChunkFrame),
    Pin(PinPayload),
    Unpin(PinPayload),
    Rename(RenamePayload),
    ClearAll(ClearAllPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReply {
    pub token: SessionToken,
    pub clients: Vec<MemberView>,
    pub content_manifest: Vec<ContentMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExpiredPayload {
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentClearedPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinStatePayload {
    pub content_id: ContentId,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedPayload {
    pub content_id: ContentId,
    pub file_name: String,
}

/// Server-initiated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    ClientJoined(MemberView),
    ClientRejoined(MemberView),
    ClientLeft(MemberView),
    Content(ContentPayload),
    Chunk(ChunkFrame),
    ContentCleared(ContentClearedPayload),
    SessionExpired(SessionExpiredPayload),
    PinState(PinStatePayload),
    Renamed(RenamedPayload),
}
