//! Per-worker scratch memory

/// Growable scratch buffers reused across comparisons.
///
/// `reset` only truncates; capacity is retained, so after warm-up the arena
/// never allocates again unless a longer concatenation shows up.
#[derive(Debug, Default)]
pub struct ScratchArena {
    pub(super) joined: Vec<u8>,
    pub(super) compressed: Vec<u8>,
}

impl ScratchArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            joined: Vec::with_capacity(bytes),
            compressed: Vec::with_capacity(super::deflate_bound(bytes)),
        }
    }

    pub fn reset(&mut self) {
        self.joined.clear();
        self.compressed.clear();
    }

    /// Writes `head ++ tail` into the joined region and returns it
    pub fn join(&mut self, head: &[u8], tail: &[u8]) -> &[u8] {
        self.joined.clear();
        self.joined.reserve(head.len() + tail.len());
        self.joined.extend_from_slice(head);
        self.joined.extend_from_slice(tail);
        &self.joined
    }

    pub fn capacity(&self) -> usize {
        self.joined.capacity() + self.compressed.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.compressed.is_empty()
    }
}
