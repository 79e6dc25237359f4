//! Wire shape of a single chunk.

use serde::Deserialize;
use serde::Serialize;

use crate::ids::ContentId;

/// IVs of 12 bytes (AES-GCM) are the common case; 16-byte IVs are
/// accepted and stored as-is.
pub const MIN_IV_LEN: usize = 12;
pub const MAX_IV_LEN: usize = 16;

/// Fixed maximum ciphertext size per chunk on the HTTP download path.
/// The socket path has no such limit; chunk size there is whatever the
/// client's chunker produced.
pub const ENCRYPTED_CHUNK_SIZE: usize = 65552;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFrame {
    pub content_id: ContentId,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub iv: Vec<u8>,
    pub encrypted_data: Vec<u8>,
}

impl ChunkFrame {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.chunk_index >= self.total_chunks {
            return Err("chunkIndex must be < totalChunks");
        }
        if self.iv.len() < MIN_IV_LEN || self.iv.len() > MAX_IV_LEN {
            return Err("iv must be 12 or 16 bytes");
        }
        Ok(())
    }
}
