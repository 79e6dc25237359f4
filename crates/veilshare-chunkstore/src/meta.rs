//! Metadata framing: magic bytes + version header, then a bincode body.
//! Grounded on `agcodex-persistence::storage::SessionStorage`'s checkpoint
//! framing, adapted to content metadata instead of session checkpoints.

use veilshare_protocol::ContentMetadata;

use crate::ContentId;
use crate::StorageError;

const MAGIC: &[u8; 4] = b"VSMT";
const VERSION: u8 = 1;

pub fn encode(metadata: &ContentMetadata) -> Vec<u8> {
    let body = bincode::serde::encode_to_vec(metadata, bincode::config::standard())
        .expect("ContentMetadata encoding is infallible for in-memory data");
    let mut framed = Vec::with_capacity(MAGIC.len() + 1 + body.len());
    framed.extend_from_slice(MAGIC);
    framed.push(VERSION);
    framed.extend_from_slice(&body);
    framed
}

pub fn decode(content_id: &ContentId, bytes: &[u8]) -> Result<ContentMetadata, StorageError> {
    let header_len = MAGIC.len() + 1;
    if bytes.len() < header_len || &bytes[..MAGIC.len()] != MAGIC {
        return Err(StorageError::Corrupt {
            content_id: content_id.clone(),
            reason: "missing or invalid magic header".to_string(),
        });
    }
    let version = bytes[MAGIC.len()];
    if version != VERSION {
        return Err(StorageError::Corrupt {
            content_id: content_id.clone(),
            reason: format!("unsupported metadata version {version}"),
        });
    }
    let (metadata, _len) =
        bincode::serde::decode_from_slice(&bytes[header_len..], bincode::config::standard()).map_err(|source| {
            StorageError::Corrupt { content_id: content_id.clone(), reason: source.to_string() }
        })?;
    Ok(metadata)
}
