//! `ChunkStore`: content-addressed chunk storage, metadata index, and
//! retention policy. Grounded on
//! `agcodex-persistence::storage::SessionStorage`'s checkpoint/index split,
//! adapted from session checkpoints to chunked content with pinning.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::Mutex;

use veilshare_protocol::ChunkFrame;
use veilshare_protocol::ContentMetadata;
use veilshare_protocol::ContentId;
use veilshare_protocol::SessionId;

use crate::atomic::write_atomic;
use crate::index::SessionIndex;
use crate::layout;
use crate::meta;
use crate::StorageError;

/// Owns every on-disk chunk byte and the metadata index. One instance per
/// process; cheap to clone (`Arc` inside).
pub struct ChunkStore {
    root: PathBuf,
    content: DashMap<ContentId, ContentMetadata>,
    indices: DashMap<SessionId, SessionIndex>,
    locks: DashMap<ContentId, Arc<Mutex<()>>>,
}

impl ChunkStore {
    /// Opens (creating if absent) the store rooted at `root` and runs the
    /// startup reconciliation scan before returning.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| StorageError::io(root.display().to_string(), e))?;
        let store = Self { root, content: DashMap::new(), indices: DashMap::new(), locks: DashMap::new() };
        store.reconcile().await?;
        Ok(store)
    }

    fn lock_for(&self, content_id: &ContentId) -> Arc<Mutex<()>> {
        self.locks.entry(content_id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn index_entry_key(metadata: &ContentMetadata) -> (ContentId, chrono::DateTime<Utc>, bool) {
        (metadata.content_id.clone(), metadata.created_at, metadata.is_pinned)
    }

    async fn persist_metadata(&self, metadata: &ContentMetadata) -> Result<(), StorageError> {
        let path = layout::meta_path(&self.root, &metadata.session_id, &metadata.content_id)?;
        write_atomic(&path, &meta::encode(metadata)).await?;
        let (content_id, created_at, is_pinned) = Self::index_entry_key(metadata);
        self.indices.entry(metadata.session_id.clone()).or_default().upsert(&content_id, created_at, is_pinned);
        self.persist_index(&metadata.session_id).await?;
        self.content.insert(metadata.content_id.clone(), metadata.clone());
        Ok(())
    }

    async fn persist_index(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let path = layout::index_path(&self.root, session_id)?;
        let bytes = self.indices.get(session_id).map(|i| crate::index::encode(&i)).unwrap_or_default();
        write_atomic(&path, &bytes).await
    }

    /// Reserves (or overwrites) the parent metadata row for a piece of
    /// content before its chunks, or its body, arrive.
    pub async fn reserve_content(&self, metadata: ContentMetadata) -> Result<(), StorageError> {
        self.persist_metadata(&metadata).await
    }

    /// Requires the parent row to already be reserved; a chunk for an
    /// unknown `contentId` is the SocketRouter's out-of-order-buffer
    /// concern, not this store's.
    pub async fn save_chunk(&self, frame: &ChunkFrame) -> Result<ContentMetadata, StorageError> {
        let lock = self.lock_for(&frame.content_id);
        let _guard = lock.lock().await;

        let mut metadata = self
            .content
            .get(&frame.content_id)
            .map(|m| m.clone())
            .ok_or_else(|| StorageError::Corrupt {
                content_id: frame.content_id.clone(),
                reason: "chunk arrived before its content metadata was reserved".to_string(),
            })?;

        let path = layout::chunk_path(&self.root, &metadata.session_id, &frame.content_id, frame.chunk_index)?;
        let mut framed = Vec::with_capacity(frame.iv.len() + frame.encrypted_data.len() + 1);
        framed.push(frame.iv.len() as u8);
        framed.extend_from_slice(&frame.iv);
        framed.extend_from_slice(&frame.encrypted_data);
        write_atomic(&path, &framed).await?;

        let chunk_dir = layout::chunk_dir(&self.root, &metadata.session_id, &frame.content_id)?;
        let (count, total_size) = count_chunks(&chunk_dir).await?;
        metadata.is_complete = count >= metadata.expected_chunk_count();
        metadata.total_size = total_size;

        self.persist_metadata(&metadata).await?;
        Ok(metadata)
    }

    /// Returns ciphertext only; `iv` travels separately on the socket path
    /// (the original `ChunkFrame` carries it). See
    /// [`Self::chunk_paths_ascending`] for the download path, which needs
    /// `iv || ciphertext` framing instead.
    pub async fn get_chunk(&self, content_id: &ContentId, chunk_index: u32) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(metadata) = self.content.get(content_id).map(|m| m.clone()) else {
            return Ok(None);
        };
        let path = layout::chunk_path(&self.root, &metadata.session_id, content_id, chunk_index)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(decode_ciphertext(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path.display().to_string(), e)),
        }
    }

    /// Ordered chunk paths for streaming reads (DownloadGateway): callers
    /// open and stream each file in turn rather than buffering the whole
    /// payload. Each file's bytes are `len(iv) || iv || ciphertext`; strip
    /// the leading length byte with [`strip_length_prefix`] to get the
    /// `iv || ciphertext` wire framing the download response uses.
    pub fn chunk_paths_ascending(&self, content_id: &ContentId) -> Result<Vec<PathBuf>, StorageError> {
        let metadata = self.content.get(content_id).map(|m| m.clone()).ok_or_else(|| StorageError::MissingChunk {
            content_id: content_id.clone(),
            chunk_index: 0,
        })?;
        let chunk_dir = layout::chunk_dir(&self.root, &metadata.session_id, content_id)?;
        (0..metadata.total_chunks)
            .map(|i| {
                let path = chunk_dir.join(format!("{i}.chunk"));
                if path.exists() {
                    Ok(path)
                } else {
                    Err(StorageError::MissingChunk { content_id: content_id.clone(), chunk_index: i })
                }
            })
            .collect()
    }

    pub async fn get_all_chunks(&self, content_id: &ContentId) -> Result<Vec<Vec<u8>>, StorageError> {
        let mut out = Vec::new();
        for path in self.chunk_paths_ascending(content_id)? {
            let bytes = fs::read(&path).await.map_err(|e| StorageError::io(path.display().to_string(), e))?;
            out.push(decode_ciphertext(bytes));
        }
        Ok(out)
    }

    pub fn get_content_metadata(&self, content_id: &ContentId) -> Option<ContentMetadata> {
        self.content.get(content_id).map(|m| m.clone())
    }

    /// Pinned first, then `createdAt` desc, limit applied after ordering.
    pub fn list_content(&self, session_id: &SessionId, limit: usize) -> Vec<ContentMetadata> {
        let Some(index) = self.indices.get(session_id) else { return Vec::new() };
        index
            .ordered()
            .filter_map(|entry| self.content.get(&entry.content_id).map(|m| m.clone()))
            .take(limit)
            .collect()
    }

    pub async fn mark_content_complete(&self, content_id: &ContentId) -> Result<(), StorageError> {
        if let Some(mut metadata) = self.content.get(content_id).map(|m| m.clone()) {
            metadata.is_complete = true;
            self.persist_metadata(&metadata).await?;
        }
        Ok(())
    }

    pub async fn pin_content(&self, content_id: &ContentId) -> Result<(), StorageError> {
        self.set_pinned(content_id, true).await
    }

    pub async fn unpin_content(&self, content_id: &ContentId) -> Result<(), StorageError> {
        self.set_pinned(content_id, false).await
    }

    async fn set_pinned(&self, content_id: &ContentId, pinned: bool) -> Result<(), StorageError> {
        if let Some(mut metadata) = self.content.get(content_id).map(|m| m.clone()) {
            metadata.is_pinned = pinned;
            self.persist_metadata(&metadata).await?;
        }
        Ok(())
    }

    /// Rejects empty names.
    pub async fn rename_content(&self, content_id: &ContentId, new_file_name: String) -> Result<(), StorageError> {
        if new_file_name.is_empty() {
            return Err(StorageError::EmptyFileName);
        }
        let Some(mut metadata) = self.content.get(content_id).map(|m| m.clone()) else { return Ok(()) };
        metadata.file_name = Some(new_file_name.clone());
        if let serde_json::Value::Object(map) = &mut metadata.additional_metadata {
            map.insert("fileName".to_string(), serde_json::Value::String(new_file_name));
        }
        self.persist_metadata(&metadata).await
    }

    /// Deletes chunks and metadata row.
    pub async fn remove_content(&self, content_id: &ContentId) -> Result<(), StorageError> {
        let Some(metadata) = self.content.get(content_id).map(|m| m.clone()) else { return Ok(()) };
        let chunk_dir = layout::chunk_dir(&self.root, &metadata.session_id, content_id)?;
        if chunk_dir.exists() {
            fs::remove_dir_all(&chunk_dir).await.map_err(|e| StorageError::io(chunk_dir.display().to_string(), e))?;
        }
        let meta_path = layout::meta_path(&self.root, &metadata.session_id, content_id)?;
        if meta_path.exists() {
            fs::remove_file(&meta_path).await.map_err(|e| StorageError::io(meta_path.display().to_string(), e))?;
        }
        self.content.remove(content_id);
        self.locks.remove(content_id);
        if let Some(mut index) = self.indices.get_mut(&metadata.session_id) {
            index.remove(content_id);
        }
        self.persist_index(&metadata.session_id).await
    }

    /// Deletes all content for the session, pinned included.
    pub async fn clear_session(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let ids: Vec<ContentId> = self
            .indices
            .get(session_id)
            .map(|index| index.ordered().map(|e| e.content_id.clone()).collect())
            .unwrap_or_default();
        for id in ids {
            self.remove_content(&id).await?;
        }
        self.indices.remove(session_id);
        let dir = layout::session_dir(&self.root, session_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).await.map_err(|e| StorageError::io(dir.display().to_string(), e))?;
        }
        Ok(())
    }

    /// Keeps all pinned plus the newest `maxItems` non-pinned, deletes the
    /// rest oldest-first.
    pub async fn cleanup_old_content(
        &self,
        session_id: &SessionId,
        max_items: usize,
    ) -> Result<Vec<ContentId>, StorageError> {
        let ordered: Vec<(ContentId, bool)> = self
            .indices
            .get(session_id)
            .map(|index| index.ordered().map(|e| (e.content_id.clone(), e.is_pinned)).collect())
            .unwrap_or_default();

        let mut kept_non_pinned = 0usize;
        let mut to_remove = Vec::new();
        for (content_id, is_pinned) in ordered {
            if is_pinned {
                continue;
            }
            if kept_non_pinned < max_items {
                kept_non_pinned += 1;
            } else {
                to_remove.push(content_id);
            }
        }
        for id in &to_remove {
            self.remove_content(id).await?;
        }
        Ok(to_remove)
    }

    /// Updates `lastAccessedAt`, called on every successful download.
    pub async fn touch_accessed(&self, content_id: &ContentId) -> Result<(), StorageError> {
        if let Some(mut metadata) = self.content.get(content_id).map(|m| m.clone()) {
            metadata.last_accessed_at = Utc::now();
            self.persist_metadata(&metadata).await?;
        }
        Ok(())
    }

    pub fn get_pinned_content_count(&self, session_id: &SessionId) -> usize {
        self.indices.get(session_id).map(|i| i.pinned_count()).unwrap_or(0)
    }

    /// Startup reconciliation: recomputes `isComplete` and `totalSize`
    /// from the chunks actually present on disk, rebuilding the in-memory
    /// index from `.meta` rows rather than trusting `_index.bin` (which
    /// may itself be stale after a crash).
    async fn reconcile(&self) -> Result<(), StorageError> {
        let root = self.root.clone();
        let mut session_dirs = match fs::read_dir(&root).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::io(root.display().to_string(), e)),
        };

        while let Some(session_entry) =
            session_dirs.next_entry().await.map_err(|e| StorageError::io(root.display().to_string(), e))?
        {
            if !session_entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let session_dir_path = session_entry.path();
            let session_id = SessionId(session_entry.file_name().to_string_lossy().into_owned());

            let mut entries = fs::read_dir(&session_dir_path)
                .await
                .map_err(|e| StorageError::io(session_dir_path.display().to_string(), e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io(session_dir_path.display().to_string(), e))?
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("meta") {
                    continue;
                }
                let content_id = ContentId(
                    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
                );
                let bytes = fs::read(&path).await.map_err(|e| StorageError::io(path.display().to_string(), e))?;
                let mut metadata = match meta::decode(&content_id, &bytes) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        tracing::warn!(%content_id, error = %err, "skipping corrupt metadata row during reconciliation");
                        continue;
                    }
                };

                if metadata.is_chunked {
                    let chunk_dir = layout::chunk_dir(&self.root, &session_id, &content_id)?;
                    let (count, total_size) = count_chunks(&chunk_dir).await.unwrap_or((0, 0));
                    metadata.is_complete = count >= metadata.expected_chunk_count();
                    metadata.total_size = total_size;
                }

                let (content_id, created_at, is_pinned) = Self::index_entry_key(&metadata);
                self.indices.entry(session_id.clone()).or_default().upsert(&content_id, created_at, is_pinned);
                self.content.insert(metadata.content_id.clone(), metadata);
            }
            self.persist_index(&session_id).await?;
        }
        Ok(())
    }
}

/// Counts chunk files and sums ciphertext size (`totalSize` is always the
/// sum of `chunk.size`, not IV or framing overhead).
async fn count_chunks(chunk_dir: &Path) -> Result<(u32, u64), StorageError> {
    let mut read_dir = match fs::read_dir(chunk_dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((0, 0)),
        Err(e) => return Err(StorageError::io(chunk_dir.display().to_string(), e)),
    };
    let mut count = 0u32;
    let mut total_size = 0u64;
    while let Some(entry) = read_dir.next_entry().await.map_err(|e| StorageError::io(chunk_dir.display().to_string(), e))? {
        let path = entry.path();
        let bytes = fs::read(&path).await.map_err(|e| StorageError::io(path.display().to_string(), e))?;
        if let Some(&iv_len) = bytes.first() {
            let overhead = 1 + iv_len as usize;
            total_size += bytes.len().saturating_sub(overhead) as u64;
            count += 1;
        }
    }
    Ok((count, total_size))
}

fn decode_ciphertext(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.is_empty() {
        return bytes;
    }
    let iv_len = bytes[0] as usize;
    bytes.drain(0..(1 + iv_len).min(bytes.len()));
    bytes
}

/// Strips the on-disk length-prefix byte, leaving `iv || ciphertext` as
/// the download response frames each chunk.
pub fn strip_length_prefix(mut bytes: Vec<u8>) -> Vec<u8> {
    if !bytes.is_empty() {
        bytes.remove(0);
    }
    bytes
}
