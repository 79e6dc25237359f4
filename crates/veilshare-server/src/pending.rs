//! Out-of-order chunk buffer: holds chunks that arrived before their
//! content's metadata row, up to a configured bound, so a harmless race
//! between `content` and its first `chunk` events doesn't fail the
//! upload.

use dashmap::DashMap;

use veilshare_protocol::ChunkFrame;
use veilshare_protocol::ContentId;

#[derive(Default)]
pub struct PendingChunks {
    buffered: DashMap<ContentId, Vec<ChunkFrame>>,
}

pub enum Admit {
    Buffered,
    Overflow,
}

impl PendingChunks {
    /// Buffers `frame` against its eventual metadata arrival, rejecting
    /// with [`Admit::Overflow`] past `limit` frames for that content.
    pub fn buffer(&self, frame: ChunkFrame, limit: usize) -> Admit {
        let mut entry = self.buffered.entry(frame.content_id.clone()).or_default();
        if entry.len() >= limit {
            return Admit::Overflow;
        }
        entry.push(frame);
        Admit::Buffered
    }

    /// Takes every chunk buffered for `content_id`, e.g. once its
    /// metadata has just been reserved.
    pub fn take(&self, content_id: &ContentId) -> Vec<ChunkFrame> {
        self.buffered.remove(content_id).map(|(_, v)| v).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content_id: &str, index: u32) -> ChunkFrame {
        ChunkFrame {
            content_id: ContentId(content_id.to_string()),
            chunk_index: index,
            total_chunks: 3,
            iv: vec![0; 12],
            encrypted_data: vec![index as u8],
        }
    }

    #[test]
    fn buffers_up_to_limit_then_overflows() {
        let pending = PendingChunks::default();
        assert!(matches!(pending.buffer(frame("k", 0), 2), Admit::Buffered));
        assert!(matches!(pending.buffer(frame("k", 1), 2), Admit::Buffered));
        assert!(matches!(pending.buffer(frame("k", 2), 2), Admit::Overflow));
    }

    #[test]
    fn take_drains_and_clears_the_buffer() {
        let pending = PendingChunks::default();
        pending.buffer(frame("k", 0), 8);
        pending.buffer(frame("k", 1), 8);
        let drained = pending.take(&ContentId("k".to_string()));
        assert_eq!(drained.len(), 2);
        assert!(pending.take(&ContentId("k".to_string())).is_empty());
    }
}
