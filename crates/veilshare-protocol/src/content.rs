//! `ContentMetadata` and related types.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::ids::ContentId;
use crate::ids::SessionId;

/// Content kinds as an enum rather than a stringly-typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    File,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInfo {
    pub preview: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub extension: Option<String>,
}

/// Per-content encryption metadata for the non-chunked case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub iv: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub content_id: ContentId,
    pub session_id: SessionId,
    pub sender_id: String,
    pub sender_name: String,
    pub content_type: ContentType,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub size: u64,
    pub image_info: Option<ImageInfo>,
    pub text_info: Option<TextInfo>,
    pub file_info: Option<FileInfo>,
    pub total_chunks: u32,
    pub total_size: u64,
    pub is_chunked: bool,
    pub is_large_file: bool,
    pub is_complete: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub encryption_metadata: Option<EncryptionMetadata>,
    pub additional_metadata: serde_json::Value,
}

impl ContentMetadata {
    /// Chunks required for completeness: `total_chunks` when chunked, `0`
    /// otherwise — non-chunked content is complete as soon as its metadata
    /// lands.
    pub fn expected_chunk_count(&self) -> u32 {
        if self.is_chunked { self.total_chunks } else { 0 }
    }
}
