// src/scheduler/pool.rs

//! Fixed-size worker pool with a shared priority queue.
//!
//! Every worker pops from the same queue, highest [`Priority`] first and FIFO
//! within a priority. Idle workers park on a condition variable until work is
//! pushed or the pool shuts down.
//!
//! Shutdown is graceful: queued jobs are still drained, new jobs are refused.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use crate::config::PoolSection;
use crate::context::{self, ContextId, Job, enter_context, run_job};
use crate::errors::{ExecutorError, Result};
use crate::types::Priority;

use super::Scheduler;

struct QueuedJob {
    priority: Priority,
    seq: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    // Max-heap: higher priority wins, then the lower sequence number.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct PoolQueue {
    heap: BinaryHeap<QueuedJob>,
    next_seq: u64,
    shutdown: bool,
}

struct PoolShared {
    id: ContextId,
    label: String,
    queue: Mutex<PoolQueue>,
    available: Condvar,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolQueue> {
        // Jobs never run under this lock, so poisoning cannot leave the
        // queue half-updated.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_job(&self) -> Option<QueuedJob> {
        let mut queue = self.lock();
        loop {
            if let Some(job) = queue.heap.pop() {
                return Some(job);
            }
            if queue.shutdown {
                return None;
            }
            queue = self
                .available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// A fixed pool of named worker threads.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .finish_non_exhaustive()
    }
}

/// Builder for [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    worker_threads: usize,
    thread_name: String,
}

impl PoolBuilder {
    pub fn new() -> Self {
        let defaults = PoolSection::default();
        Self {
            worker_threads: defaults.worker_threads,
            thread_name: defaults.thread_name,
        }
    }

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Spawn the worker threads.
    pub fn build(self) -> Result<WorkerPool> {
        if self.worker_threads == 0 {
            return Err(ExecutorError::ConfigError(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let shared = Arc::new(PoolShared {
            id: ContextId::next(),
            label: self.thread_name.clone(),
            queue: Mutex::new(PoolQueue::default()),
            available: Condvar::new(),
        });

        let pool = WorkerPool {
            shared: Arc::clone(&shared),
            workers: Mutex::new(Vec::with_capacity(self.worker_threads)),
        };

        for index in 0..self.worker_threads {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.thread_name, index))
                .spawn(move || worker_loop(worker_shared, index));

            match spawned {
                Ok(handle) => pool.lock_workers().push(handle),
                Err(err) => {
                    // Workers spawned so far are stopped by `Drop`.
                    return Err(ExecutorError::IoError(err));
                }
            }
        }

        info!(
            pool = %shared.label,
            id = %shared.id,
            workers = self.worker_threads,
            "worker pool started"
        );

        Ok(pool)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Build a pool from a validated `[pool]` section.
    pub fn from_config(cfg: &PoolSection) -> Result<WorkerPool> {
        PoolBuilder::new()
            .worker_threads(cfg.worker_threads)
            .thread_name(cfg.thread_name.clone())
            .build()
    }

    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.lock().heap.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Refuse new work, let the workers drain the queue, then join them.
    ///
    /// Calling this from one of the pool's own workers does not join (that
    /// would deadlock); the workers still exit once the queue is empty.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.lock();
            if queue.shutdown {
                return;
            }
            queue.shutdown = true;
        }
        self.shared.available.notify_all();
        debug!(pool = %self.shared.label, "worker pool shutdown requested");

        if self.is_current() {
            warn!(
                pool = %self.shared.label,
                "shutdown called from a pool worker; not joining workers"
            );
            return;
        }

        let workers: Vec<_> = self.lock_workers().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!(pool = %self.shared.label, "worker thread terminated abnormally");
            }
        }
        info!(pool = %self.shared.label, "worker pool stopped");
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for WorkerPool {
    fn schedule(&self, priority: Priority, job: Job) -> Result<()> {
        {
            let mut queue = self.shared.lock();
            if queue.shutdown {
                return Err(ExecutorError::SchedulerUnavailable(format!(
                    "worker pool '{}' is shut down",
                    self.shared.label
                )));
            }
            let seq = queue.next_seq;
            queue.next_seq += 1;
            queue.heap.push(QueuedJob { priority, seq, job });
            trace!(pool = %self.shared.label, %priority, seq, "job queued");
        }
        self.shared.available.notify_one();
        Ok(())
    }

    fn is_current(&self) -> bool {
        context::current() == Some(self.shared.id)
    }

    fn label(&self) -> &str {
        &self.shared.label
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<PoolShared>, index: usize) {
    debug!(pool = %shared.label, worker = index, "worker started");

    enter_context(shared.id, || {
        while let Some(queued) = shared.next_job() {
            trace!(
                pool = %shared.label,
                worker = index,
                priority = %queued.priority,
                seq = queued.seq,
                "running job"
            );
            run_job(queued.job, &shared.label);
        }
    });

    debug!(pool = %shared.label, worker = index, "worker exiting");
}
