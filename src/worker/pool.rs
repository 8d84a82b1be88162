//! Fixed-size pool of long-lived worker threads
//!
//! Threads are spawned once and parked on their inbox between rounds, so each
//! worker's compression stream and arena are reused for every query. Record
//! buffers travel by value: the caller hands one to each worker with the job
//! and only gets it back once that worker is done with the round.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};

use super::WorkerEngine;
use crate::partition::{Chunk, Partition};
use crate::types::{Corpus, DistanceRecord};
use crate::{Error, Result};

struct Job {
    chunk: Chunk,
    query: Bytes,
    cb: usize,
    records: Vec<DistanceRecord>,
}

struct Reply {
    worker: usize,
    records: Vec<DistanceRecord>,
    result: Result<()>,
}

pub struct WorkerPool {
    inboxes: Vec<Sender<Job>>,
    replies: Receiver<Reply>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` threads sharing `corpus`.
    ///
    /// Failing to start any single thread fails the whole pool; threads that
    /// did start are shut down again.
    pub fn spawn(corpus: Corpus, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid_config("worker count must be at least 1"));
        }

        let (reply_tx, replies) = channel::bounded(workers);
        let mut pool = Self {
            inboxes: Vec::with_capacity(workers),
            replies,
            handles: Vec::with_capacity(workers),
        };

        for id in 0..workers {
            let (job_tx, job_rx) = channel::bounded(1);
            let corpus = corpus.clone();
            let reply_tx = reply_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("ncdknn-worker-{id}"))
                .spawn(move || worker_loop(WorkerEngine::new(id), corpus, job_rx, reply_tx))
                .map_err(|e| Error::WorkerSpawn(format!("worker {}: {}", id, e)))?;

            pool.inboxes.push(job_tx);
            pool.handles.push(handle);
        }

        tracing::debug!(workers, corpus_len = corpus.len(), "Worker pool started");
        Ok(pool)
    }

    pub fn workers(&self) -> usize {
        self.inboxes.len()
    }

    /// Runs one fork-join round.
    ///
    /// Returns only after every worker that received a job has replied.
    /// `buffers[i]` holds worker `i`'s records afterwards.
    pub fn run_round(
        &self,
        partition: &Partition,
        query: &Bytes,
        cb: usize,
        buffers: &mut [Vec<DistanceRecord>],
    ) -> Result<()> {
        if partition.workers() != self.workers() || buffers.len() != self.workers() {
            return Err(Error::invalid_config(format!(
                "round shape mismatch: {} workers, {} chunks, {} buffers",
                self.workers(),
                partition.workers(),
                buffers.len()
            )));
        }

        let mut dispatched = 0;
        let mut first_error = None;

        for (worker, (inbox, chunk)) in self.inboxes.iter().zip(partition.chunks()).enumerate() {
            let job = Job {
                chunk: *chunk,
                query: query.clone(),
                cb,
                records: std::mem::take(&mut buffers[worker]),
            };
            if inbox.send(job).is_err() {
                first_error = Some(Error::WorkerLost(format!(
                    "worker {} inbox closed",
                    worker
                )));
                break;
            }
            dispatched += 1;
        }

        for _ in 0..dispatched {
            let reply = self
                .replies
                .recv()
                .map_err(|_| Error::WorkerLost("reply channel closed mid-round".into()))?;

            buffers[reply.worker] = reply.records;
            if let Err(err) = reply.result {
                tracing::error!(worker = reply.worker, error = %err, "Worker failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the inboxes ends every worker loop
        self.inboxes.clear();

        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "Worker thread panicked during shutdown");
            }
        }
    }
}

fn worker_loop(
    mut engine: WorkerEngine,
    corpus: Corpus,
    inbox: Receiver<Job>,
    replies: Sender<Reply>,
) {
    while let Ok(job) = inbox.recv() {
        let Job {
            chunk,
            query,
            cb,
            mut records,
        } = job;

        let worker = engine.id();
        let result = run_guarded(worker, &mut records, |records| {
            engine.run(&corpus, chunk, &query, cb, records)
        });

        let reply = Reply {
            worker,
            records,
            result,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }

    tracing::trace!(worker = engine.id(), "Worker exiting");
}

/// Runs `score`, turning a panic into `WorkerLost`.
///
/// The buffer may be half written after a panic, so it is replaced.
fn run_guarded<F>(worker: usize, records: &mut Vec<DistanceRecord>, score: F) -> Result<()>
where
    F: FnOnce(&mut Vec<DistanceRecord>) -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| score(&mut *records))) {
        Ok(result) => result,
        Err(_) => {
            *records = Vec::new();
            Err(Error::WorkerLost(format!(
                "worker {} panicked while scoring",
                worker
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{CompressionOracle, ScratchArena};
    use crate::types::Sample;

    fn corpus(n: usize) -> Corpus {
        (0..n)
            .map(|i| Sample::new(i % 4, format!("headline {} on markets and sport", i)))
            .collect::<Vec<_>>()
            .into()
    }

    fn query() -> (Bytes, usize) {
        let query = Bytes::from_static(b"markets rally on sport news");
        let mut arena = ScratchArena::new();
        let cb = CompressionOracle::new()
            .compressed_size(&mut arena, &query)
            .unwrap();
        (query, cb)
    }

    #[test]
    fn test_round_fills_every_buffer() {
        let corpus = corpus(7);
        let pool = WorkerPool::spawn(corpus.clone(), 3).unwrap();
        let partition = Partition::new(corpus.len(), 3).unwrap();
        let mut buffers = vec![Vec::new(); 3];
        let (query, cb) = query();

        pool.run_round(&partition, &query, cb, &mut buffers).unwrap();

        let lengths: Vec<usize> = buffers.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![2, 2, 3]);
    }

    #[test]
    fn test_rounds_are_repeatable() {
        let corpus = corpus(20);
        let pool = WorkerPool::spawn(corpus.clone(), 4).unwrap();
        let partition = Partition::new(corpus.len(), 4).unwrap();
        let mut buffers = vec![Vec::new(); 4];
        let (query, cb) = query();

        pool.run_round(&partition, &query, cb, &mut buffers).unwrap();
        let first = buffers.clone();
        pool.run_round(&partition, &query, cb, &mut buffers).unwrap();
        assert_eq!(first, buffers);
    }

    #[test]
    fn test_more_workers_than_samples() {
        let corpus = corpus(2);
        let pool = WorkerPool::spawn(corpus.clone(), 5).unwrap();
        let partition = Partition::new(corpus.len(), 5).unwrap();
        let mut buffers = vec![Vec::new(); 5];
        let (query, cb) = query();

        pool.run_round(&partition, &query, cb, &mut buffers).unwrap();
        assert_eq!(buffers.iter().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let corpus = corpus(4);
        let pool = WorkerPool::spawn(corpus.clone(), 2).unwrap();
        let partition = Partition::new(corpus.len(), 3).unwrap();
        let mut buffers = vec![Vec::new(); 2];
        let (query, cb) = query();

        assert!(pool.run_round(&partition, &query, cb, &mut buffers).is_err());
    }

    #[test]
    fn test_failed_round_is_fatal_and_pool_recovers() {
        let corpus = corpus(4);
        let pool = WorkerPool::spawn(corpus.clone(), 2).unwrap();
        let mut buffers = vec![Vec::new(); 2];
        let (query, cb) = query();

        // The last chunk reaches past the corpus, so that worker fails
        let oversized = Partition::new(corpus.len() + 5, 2).unwrap();
        let err = pool
            .run_round(&oversized, &query, cb, &mut buffers)
            .unwrap_err();
        assert!(err.is_fatal());

        // All replies were drained, so the next round starts clean
        let partition = Partition::new(corpus.len(), 2).unwrap();
        pool.run_round(&partition, &query, cb, &mut buffers).unwrap();
        let lengths: Vec<usize> = buffers.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![2, 2]);
    }

    #[test]
    fn test_panic_becomes_worker_lost() {
        let mut records = vec![DistanceRecord {
            distance: 0.5,
            class_index: 1,
        }];

        let result = run_guarded(3, &mut records, |records| {
            records.push(DistanceRecord {
                distance: 0.1,
                class_index: 0,
            });
            panic!("scoring blew up");
        });

        match result {
            Err(err @ Error::WorkerLost(_)) => {
                assert!(err.is_fatal());
                assert!(err.to_string().contains("worker 3"));
            }
            other => panic!("expected WorkerLost, got {:?}", other),
        }
        assert!(records.is_empty());
    }

    #[test]
    fn test_guard_passes_through_results() {
        let mut records = Vec::new();
        assert!(run_guarded(0, &mut records, |_| Ok(())).is_ok());
        let err = run_guarded(0, &mut records, |_| Err(Error::compression("bad stream")))
            .unwrap_err();
        assert!(matches!(err, Error::Compression(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPool::spawn(corpus(3), 0).is_err());
    }
}
