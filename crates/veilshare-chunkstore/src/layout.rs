//! On-disk layout:
//!
//! ```text
//! <root>/<sessionId>/<contentId>.meta
//! <root>/<sessionId>/<contentId>/<chunkIndex>.chunk
//! <root>/<sessionId>/_index.bin
//! ```

use std::path::Path;
use std::path::PathBuf;

use crate::ContentId;
use crate::StorageError;
use veilshare_protocol::SessionId;

/// Rejects components that would escape `root` or collide with the fixed
/// file names this module writes (`_index.bin`). `contentId`/`sessionId`
/// are client-chosen and otherwise untrusted.
pub fn safe_component(raw: &str) -> Result<&str, StorageError> {
    if raw.is_empty()
        || raw == "."
        || raw == ".."
        || raw.contains('/')
        || raw.contains('\\')
        || raw.contains('\0')
    {
        return Err(StorageError::UnsafeComponent(raw.to_string()));
    }
    Ok(raw)
}

pub fn session_dir(root: &Path, session_id: &SessionId) -> Result<PathBuf, StorageError> {
    Ok(root.join(safe_component(&session_id.0)?))
}

pub fn meta_path(root: &Path, session_id: &SessionId, content_id: &ContentId) -> Result<PathBuf, StorageError> {
    Ok(session_dir(root, session_id)?.join(format!("{}.meta", safe_component(&content_id.0)?)))
}

pub fn chunk_dir(root: &Path, session_id: &SessionId, content_id: &ContentId) -> Result<PathBuf, StorageError> {
    Ok(session_dir(root, session_id)?.join(safe_component(&content_id.0)?))
}

pub fn chunk_path(
    root: &Path,
    session_id: &SessionId,
    content_id: &ContentId,
    chunk_index: u32,
) -> Result<PathBuf, StorageError> {
    Ok(chunk_dir(root, session_id, content_id)?.join(format!("{chunk_index}.chunk")))
}

pub fn index_path(root: &Path, session_id: &SessionId) -> Result<PathBuf, StorageError> {
    Ok(session_dir(root, session_id)?.join("_index.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_components() {
        assert!(safe_component("../escape").is_err());
        assert!(safe_component("a/b").is_err());
        assert!(safe_component("").is_err());
        assert!(safe_component("normal-id").is_ok());
    }
}
