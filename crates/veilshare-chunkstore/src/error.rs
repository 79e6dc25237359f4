//! `StorageError`: every `ChunkStore` operation may fail with this.
//! Grounded on `agcodex-persistence::error::PersistenceError` — one
//! variant per failure mode, I/O wrapped rather than swallowed.

use thiserror::Error;

use crate::ContentId;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt metadata for {content_id}: {reason}")]
    Corrupt { content_id: ContentId, reason: String },

    #[error("unsafe path component: {0:?}")]
    UnsafeComponent(String),

    #[error("rejected empty file name")]
    EmptyFileName,

    #[error("missing chunk {chunk_index} of {content_id}")]
    MissingChunk { content_id: ContentId, chunk_index: u32 },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
