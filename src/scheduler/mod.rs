// src/scheduler/mod.rs

//! Pluggable scheduler abstraction.
//!
//! The executor talks to a [`Scheduler`] instead of spawning threads itself.
//! This keeps "where work runs" a collaborator decision and makes it easy to
//! swap in a recording fake in tests.
//!
//! - [`WorkerPool`] is a fixed pool of OS threads sharing one priority queue.
//! - [`TokioScheduler`] forwards work to the blocking pool of an existing
//!   tokio runtime.

pub mod pool;
pub mod tokio_scheduler;

use crate::context::Job;
use crate::errors::Result;
use crate::types::Priority;

pub use pool::{PoolBuilder, WorkerPool};
pub use tokio_scheduler::TokioScheduler;

/// Accepts units of work tagged with a priority and runs them asynchronously.
pub trait Scheduler: Send + Sync {
    /// Hand `job` over for asynchronous execution.
    ///
    /// Must never run `job` on the calling thread before returning. An error
    /// means the job was not admitted and will never run.
    fn schedule(&self, priority: Priority, job: Job) -> Result<()>;

    /// Whether the calling thread is currently executing a job of this
    /// scheduler.
    fn is_current(&self) -> bool;

    /// Human-readable name, used in logs.
    fn label(&self) -> &str;
}
