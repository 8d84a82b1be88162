//! Worker engines and the persistent pool that drives them
//!
//! A worker owns its compression stream, scratch arena and state for the
//! whole classifier lifetime. Per round it scores its chunk of the corpus
//! against the query and hands the filled record buffer back to the caller.

mod pool;

pub use pool::WorkerPool;

use crate::compression::{CompressionOracle, ScratchArena};
use crate::ncd::ncd_with;
use crate::partition::Chunk;
use crate::types::{DistanceRecord, Sample};
use crate::{Error, Result};

/// Round lifecycle of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Computing,
    Done,
}

/// Scores one chunk of the corpus per round
pub struct WorkerEngine {
    id: usize,
    oracle: CompressionOracle,
    arena: ScratchArena,
    state: WorkerState,
}

impl WorkerEngine {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            oracle: CompressionOracle::new(),
            arena: ScratchArena::new(),
            state: WorkerState::Idle,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Bytes currently held by the scratch arena
    pub fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Appends one record per sample of `chunk`, in corpus order.
    ///
    /// `records` is cleared first; its capacity is kept from earlier rounds.
    pub fn run(
        &mut self,
        corpus: &[Sample],
        chunk: Chunk,
        query: &[u8],
        cb: usize,
        records: &mut Vec<DistanceRecord>,
    ) -> Result<()> {
        self.state = WorkerState::Computing;
        records.clear();

        let result = self.score_chunk(corpus, chunk, query, cb, records);

        self.state = WorkerState::Done;
        result
    }

    fn score_chunk(
        &mut self,
        corpus: &[Sample],
        chunk: Chunk,
        query: &[u8],
        cb: usize,
        records: &mut Vec<DistanceRecord>,
    ) -> Result<()> {
        let samples = corpus.get(chunk.range()).ok_or_else(|| {
            Error::invalid_config(format!(
                "chunk {:?} out of bounds for corpus of {} samples",
                chunk.range(),
                corpus.len()
            ))
        })?;

        records.reserve(samples.len());
        for sample in samples {
            let distance = ncd_with(&mut self.oracle, &mut self.arena, &sample.text, query, cb)?;
            self.arena.reset();
            records.push(DistanceRecord {
                distance,
                class_index: sample.class_index,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Sample> {
        vec![
            Sample::new(0, "Parliament votes on the new border treaty"),
            Sample::new(1, "Striker scores twice as champions win the derby"),
            Sample::new(2, "Quarterly profits beat analyst forecasts"),
            Sample::new(3, "New chip doubles battery life of laptops"),
            Sample::new(1, "Tennis star withdraws from the open with injury"),
        ]
    }

    fn query_size(query: &[u8]) -> usize {
        let mut arena = ScratchArena::new();
        CompressionOracle::new()
            .compressed_size(&mut arena, query)
            .unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let corpus = corpus();
        let query = b"Champions lose the derby";
        let cb = query_size(query);
        let mut engine = WorkerEngine::new(0);
        let mut records = Vec::new();
        assert_eq!(engine.state(), WorkerState::Idle);

        engine
            .run(&corpus, Chunk { offset: 0, len: 2 }, query, cb, &mut records)
            .unwrap();
        assert_eq!(engine.state(), WorkerState::Done);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_records_follow_corpus_order() {
        let corpus = corpus();
        let query = b"Chip makers report profits";
        let cb = query_size(query);
        let mut engine = WorkerEngine::new(1);
        let mut records = Vec::new();

        engine
            .run(&corpus, Chunk { offset: 1, len: 4 }, query, cb, &mut records)
            .unwrap();
        let classes: Vec<usize> = records.iter().map(|r| r.class_index).collect();
        assert_eq!(classes, vec![1, 2, 3, 1]);
        assert!(records.iter().all(|r| r.distance.is_finite()));
    }

    #[test]
    fn test_buffer_is_cleared_between_rounds() {
        let corpus = corpus();
        let query = b"Border treaty";
        let cb = query_size(query);
        let mut engine = WorkerEngine::new(0);
        let mut records = Vec::new();

        engine
            .run(&corpus, Chunk { offset: 0, len: 5 }, query, cb, &mut records)
            .unwrap();
        engine
            .run(&corpus, Chunk { offset: 0, len: 1 }, query, cb, &mut records)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.capacity() >= 5);
    }

    #[test]
    fn test_empty_chunk_produces_nothing() {
        let corpus = corpus();
        let mut engine = WorkerEngine::new(4);
        let mut records = vec![DistanceRecord {
            distance: 1.0,
            class_index: 0,
        }];

        engine
            .run(&corpus, Chunk { offset: 0, len: 0 }, b"q", 9, &mut records)
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(engine.state(), WorkerState::Done);
    }

    #[test]
    fn test_arena_growth_bounded_by_largest_join() {
        let corpus: Vec<Sample> = (0..50)
            .map(|i| Sample::new(i % 4, format!("sample number {} about markets", i)))
            .collect();
        let query = b"markets rally";
        let cb = query_size(query);
        let mut engine = WorkerEngine::new(0);
        let mut records = Vec::new();

        engine
            .run(&corpus, Chunk { offset: 0, len: 1 }, query, cb, &mut records)
            .unwrap();
        let after_one = engine.arena_capacity();
        engine
            .run(&corpus, Chunk { offset: 0, len: 50 }, query, cb, &mut records)
            .unwrap();

        // All samples are about the same length, so the arena barely moves
        assert!(engine.arena_capacity() <= after_one * 2);
    }

    #[test]
    fn test_out_of_bounds_chunk_is_error() {
        let corpus = corpus();
        let mut engine = WorkerEngine::new(0);
        let mut records = Vec::new();
        let err = engine
            .run(&corpus, Chunk { offset: 3, len: 10 }, b"q", 9, &mut records)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(engine.state(), WorkerState::Done);
    }
}
