//! Per-session recency index: a `BTreeSet` ordered so that ascending
//! iteration already yields "pinned first, then `createdAt` descending"
//! without a sort at read time. Persisted as `_index.bin` and rebuilt by
//! [`crate::store::ChunkStore::reconcile`] on startup if missing or stale.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::ContentId;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    pub content_id: ContentId,
    pub created_at: DateTime<Utc>,
    pub is_pinned: bool,
}

impl IndexEntry {
    fn sort_key(&self) -> (u8, Reverse<DateTime<Utc>>, &str) {
        (if self.is_pinned { 0 } else { 1 }, Reverse(self.created_at), self.content_id.0.as_str())
    }
}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionIndex {
    entries: BTreeSet<IndexEntry>,
}

impl SessionIndex {
    pub fn upsert(&mut self, content_id: &ContentId, created_at: DateTime<Utc>, is_pinned: bool) {
        self.entries.retain(|e| &e.content_id != content_id);
        self.entries.insert(IndexEntry { content_id: content_id.clone(), created_at, is_pinned });
    }

    pub fn remove(&mut self, content_id: &ContentId) {
        self.entries.retain(|e| &e.content_id != content_id);
    }

    /// Ascending iteration is already pinned-first, `createdAt`-desc.
    pub fn ordered(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    pub fn pinned_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pinned).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn encode(index: &SessionIndex) -> Vec<u8> {
    bincode::serde::encode_to_vec(index, bincode::config::standard())
        .expect("SessionIndex encoding is infallible for in-memory data")
}

pub fn decode(bytes: &[u8]) -> Result<SessionIndex, bincode::error::DecodeError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(id: &str, secs: i64, pinned: bool) -> (ContentId, DateTime<Utc>, bool) {
        (ContentId(id.to_string()), DateTime::from_timestamp(secs, 0).unwrap(), pinned)
    }

    #[test]
    fn orders_pinned_first_then_recency_descending() {
        let mut index = SessionIndex::default();
        let (a, t, p) = entry_at("a", 100, false);
        index.upsert(&a, t, p);
        let (b, t, p) = entry_at("b", 200, false);
        index.upsert(&b, t, p);
        let (c, t, p) = entry_at("c", 50, true);
        index.upsert(&c, t, p);

        let order: Vec<String> = index.ordered().map(|e| e.content_id.0.clone()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let mut index = SessionIndex::default();
        let (a, t, p) = entry_at("a", 100, false);
        index.upsert(&a, t, p);
        index.upsert(&a, DateTime::from_timestamp(500, 0).unwrap(), true);
        assert_eq!(index.ordered().count(), 1);
        assert!(index.ordered().next().unwrap().is_pinned);
    }

    #[test]
    fn round_trips_through_bincode() {
        let mut index = SessionIndex::default();
        let (a, t, p) = entry_at("a", 100, true);
        index.upsert(&a, t, p);
        let bytes = encode(&index);
        let back = decode(&bytes).unwrap();
        assert_eq!(back.ordered().count(), 1);
    }
}
