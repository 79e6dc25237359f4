use chrono::Utc;
use veilshare_protocol::ChunkFrame;
use veilshare_protocol::ContentMetadata;
use veilshare_protocol::ContentType;

use crate::ChunkStore;
use crate::StorageError;
use veilshare_protocol::ContentId;
use veilshare_protocol::SessionId;

fn metadata(session: &str, content: &str, total_chunks: u32, pinned: bool) -> ContentMetadata {
    ContentMetadata {
        content_id: ContentId(content.to_string()),
        session_id: SessionId(session.to_string()),
        sender_id: "sender".to_string(),
        sender_name: "Sender".to_string(),
        content_type: ContentType::File,
        mime_type: Some("application/octet-stream".to_string()),
        file_name: Some("file.bin".to_string()),
        size: 0,
        image_info: None,
        text_info: None,
        file_info: None,
        total_chunks,
        total_size: 0,
        is_chunked: total_chunks > 0,
        is_large_file: total_chunks > 1,
        is_complete: total_chunks == 0,
        is_pinned: pinned,
        created_at: Utc::now(),
        last_accessed_at: Utc::now(),
        encryption_metadata: None,
        additional_metadata: serde_json::json!({}),
    }
}

fn frame(content: &str, index: u32, total: u32, data: Vec<u8>) -> ChunkFrame {
    ChunkFrame { content_id: ContentId(content.to_string()), chunk_index: index, total_chunks: total, iv: vec![0u8; 12], encrypted_data: data }
}

#[tokio::test]
async fn save_chunk_is_idempotent_and_marks_complete_on_last_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    store.reserve_content(metadata("s1", "c1", 2, false)).await.unwrap();

    store.save_chunk(&frame("c1", 0, 2, vec![1, 2, 3])).await.unwrap();
    store.save_chunk(&frame("c1", 0, 2, vec![1, 2, 3])).await.unwrap();
    let after_first = store.get_content_metadata(&ContentId("c1".to_string())).unwrap();
    assert!(!after_first.is_complete);

    let completed = store.save_chunk(&frame("c1", 1, 2, vec![4, 5])).await.unwrap();
    assert!(completed.is_complete);
    assert_eq!(completed.total_size, 3 + 2);
}

#[tokio::test]
async fn cleanup_old_content_keeps_all_pinned_and_newest_non_pinned() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    let session = SessionId("s1".to_string());

    for i in 0..5 {
        let mut m = metadata("s1", &format!("c{i}"), 0, false);
        m.created_at = Utc::now() + chrono::Duration::seconds(i);
        store.reserve_content(m).await.unwrap();
    }
    let mut pinned = metadata("s1", "pinned", 0, true);
    pinned.created_at = Utc::now() - chrono::Duration::seconds(100);
    store.reserve_content(pinned).await.unwrap();

    let removed = store.cleanup_old_content(&session, 2).await.unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(store.get_pinned_content_count(&session), 1);
    assert!(store.get_content_metadata(&ContentId("pinned".to_string())).is_some());
    assert!(store.get_content_metadata(&ContentId("c3".to_string())).is_some());
    assert!(store.get_content_metadata(&ContentId("c4".to_string())).is_some());
    assert!(store.get_content_metadata(&ContentId("c0".to_string())).is_none());
}

#[tokio::test]
async fn list_content_orders_pinned_first_then_recency_descending() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    let session = SessionId("s1".to_string());

    let mut older = metadata("s1", "older", 0, false);
    older.created_at = Utc::now() - chrono::Duration::seconds(10);
    store.reserve_content(older).await.unwrap();

    let mut newer = metadata("s1", "newer", 0, false);
    newer.created_at = Utc::now();
    store.reserve_content(newer).await.unwrap();

    store.reserve_content(metadata("s1", "pinned", 0, true)).await.unwrap();

    let listed = store.list_content(&session, 10);
    let ids: Vec<String> = listed.iter().map(|m| m.content_id.0.clone()).collect();
    assert_eq!(ids, vec!["pinned", "newer", "older"]);
}

#[tokio::test]
async fn remove_content_makes_it_invisible_to_readers() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    store.reserve_content(metadata("s1", "c1", 0, false)).await.unwrap();
    store.remove_content(&ContentId("c1".to_string())).await.unwrap();
    assert!(store.get_content_metadata(&ContentId("c1".to_string())).is_none());
    assert!(store.list_content(&SessionId("s1".to_string()), 10).is_empty());
}

#[tokio::test]
async fn rename_content_rejects_empty_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    store.reserve_content(metadata("s1", "c1", 0, false)).await.unwrap();
    let result = store.rename_content(&ContentId("c1".to_string()), String::new()).await;
    assert!(matches!(result, Err(StorageError::EmptyFileName)));
}

#[tokio::test]
async fn path_like_content_id_is_rejected_not_traversed() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChunkStore::open(dir.path()).await.unwrap();
    let result = store.reserve_content(metadata("s1", "../escape", 0, false)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reconcile_recomputes_completeness_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = ChunkStore::open(dir.path()).await.unwrap();
        store.reserve_content(metadata("s1", "c1", 2, false)).await.unwrap();
        store.save_chunk(&frame("c1", 0, 2, vec![9])).await.unwrap();
    }
    let reopened = ChunkStore::open(dir.path()).await.unwrap();
    let restored = reopened.get_content_metadata(&ContentId("c1".to_string())).unwrap();
    assert!(!restored.is_complete);
    assert_eq!(restored.total_size, 1);
}
