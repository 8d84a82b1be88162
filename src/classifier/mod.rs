//! NCD k-nearest-neighbor classifier
//!
//! One `predict` call is one fork-join round: the query is compressed once,
//! every worker scores its fixed chunk of the corpus, and the merged distances
//! are ranked and voted on after all workers have replied.

mod evaluate;

pub use evaluate::Evaluation;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use crate::compression::{CompressionOracle, ScratchArena};
use crate::partition::Partition;
use crate::types::{ClassIndex, Corpus, DistanceRecord, LabelSet};
use crate::vote::Aggregator;
use crate::worker::WorkerPool;
use crate::{Error, Result};

const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Construction options
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    /// Worker count; defaults to the available parallelism of the host
    pub workers: Option<NonZeroUsize>,
    /// Evaluation logs progress every this many items
    pub progress_interval: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            workers: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ClassifierOptions {
    /// Fixed worker count. `0` means "unset" and falls back to the host's
    /// available parallelism; reject it beforehand (see
    /// [`AppConfig::validate`](crate::config::AppConfig::validate)) if that
    /// fallback is unwanted.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: NonZeroUsize::new(workers),
            ..Self::default()
        }
    }

    fn resolve_workers(&self) -> usize {
        match self.workers {
            Some(workers) => workers.get(),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Result of a single prediction with the neighbors that decided it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class_index: ClassIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub neighbors: Vec<DistanceRecord>,
}

pub struct NcdClassifier {
    corpus: Corpus,
    labels: LabelSet,
    partition: Partition,
    pool: WorkerPool,
    query_oracle: CompressionOracle,
    query_arena: ScratchArena,
    buffers: Vec<Vec<DistanceRecord>>,
    aggregator: Aggregator,
    progress_interval: usize,
}

impl NcdClassifier {
    /// Validates the corpus, fixes the partition and starts the worker pool
    pub fn new(corpus: Corpus, labels: LabelSet, options: ClassifierOptions) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::invalid_config("label table is empty"));
        }
        if corpus.is_empty() {
            return Err(Error::invalid_input("training corpus is empty"));
        }
        if let Some((position, sample)) = corpus
            .iter()
            .enumerate()
            .find(|(_, s)| !labels.contains(s.class_index))
        {
            return Err(Error::invalid_input(format!(
                "training sample {} has class {} outside label table of {}",
                position,
                sample.class_index,
                labels.len()
            )));
        }

        let workers = options.resolve_workers();
        let partition = Partition::new(corpus.len(), workers)?;
        let pool = WorkerPool::spawn(corpus.clone(), workers)?;

        tracing::info!(
            samples = corpus.len(),
            classes = labels.len(),
            workers,
            "Classifier ready"
        );

        Ok(Self {
            buffers: vec![Vec::new(); workers],
            aggregator: Aggregator::with_capacity(corpus.len(), labels.len()),
            corpus,
            labels,
            partition,
            pool,
            query_oracle: CompressionOracle::new(),
            query_arena: ScratchArena::new(),
            progress_interval: options.progress_interval.max(1),
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.len()
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Class of the majority among the `k` training samples closest to `query`
    pub fn predict(&mut self, query: &[u8], k: usize) -> Result<ClassIndex> {
        self.round(Bytes::copy_from_slice(query), k)
    }

    /// Like [`predict`](Self::predict), also returning the `k` nearest records
    pub fn predict_detailed(&mut self, query: &[u8], k: usize) -> Result<Prediction> {
        let class_index = self.round(Bytes::copy_from_slice(query), k)?;
        Ok(Prediction {
            class_index,
            label: self.labels.name(class_index).map(str::to_string),
            neighbors: self.aggregator.nearest(k).to_vec(),
        })
    }

    fn round(&mut self, query: Bytes, k: usize) -> Result<ClassIndex> {
        if k == 0 {
            return Err(Error::invalid_input("k must be at least 1"));
        }
        if query.is_empty() {
            return Err(Error::invalid_input("query text is empty"));
        }

        let workers = self.pool.workers();
        if !self.partition.matches(self.corpus.len(), workers) {
            self.partition = Partition::new(self.corpus.len(), workers)?;
        }

        let cb = self
            .query_oracle
            .compressed_size(&mut self.query_arena, &query)?;
        self.query_arena.reset();

        self.pool
            .run_round(&self.partition, &query, cb, &mut self.buffers)?;

        self.aggregator.merge(&self.buffers);
        if self.aggregator.len() != self.corpus.len() {
            return Err(Error::WorkerLost(format!(
                "round produced {} distances for {} samples",
                self.aggregator.len(),
                self.corpus.len()
            )));
        }

        self.aggregator.rank()?;
        let class_index = self.aggregator.vote(k, self.labels.len())?;

        tracing::trace!(query_len = query.len(), cb, k, class_index, "Round complete");
        Ok(class_index)
    }
}
