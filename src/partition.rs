//! Corpus partitioning across workers
//!
//! Every worker but the last gets `n / w` samples; the last one also takes
//! the remainder. With fewer samples than workers the trailing chunks are
//! empty, which is valid.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::{Error, Result};

/// Contiguous slice of the corpus assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub offset: usize,
    pub len: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fixed chunk assignment for a corpus length and worker count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    corpus_len: usize,
    chunks: Vec<Chunk>,
}

impl Partition {
    pub fn new(corpus_len: usize, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid_config("worker count must be at least 1"));
        }

        let base = corpus_len / workers;
        let remainder = corpus_len % workers;

        let chunks = (0..workers)
            .map(|i| Chunk {
                offset: i * base,
                len: if i == workers - 1 { base + remainder } else { base },
            })
            .collect();

        Ok(Self { corpus_len, chunks })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus_len
    }

    pub fn workers(&self) -> usize {
        self.chunks.len()
    }

    /// Whether this plan is still valid for `corpus_len` samples on `workers`
    pub fn matches(&self, corpus_len: usize, workers: usize) -> bool {
        self.corpus_len == corpus_len && self.chunks.len() == workers
    }
}
