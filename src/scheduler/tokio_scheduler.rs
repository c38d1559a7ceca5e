// src/scheduler/tokio_scheduler.rs

//! Scheduler backed by an existing tokio runtime's blocking pool.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tracing::{trace, warn};

use crate::context::{self, ContextId, Job, enter_context, run_job};
use crate::errors::{ExecutorError, Result};
use crate::types::Priority;

use super::Scheduler;

/// Runs jobs via [`Handle::spawn_blocking`].
///
/// Tokio has no notion of task priority, so the hint is accepted and ignored.
/// A runtime that has shut down discards new blocking tasks without running
/// them; `schedule` reports that as [`ExecutorError::SchedulerUnavailable`].
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
    id: ContextId,
    label: String,
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            id: ContextId::next(),
            label: "tokio-blocking".to_string(),
        }
    }

    /// Use the runtime the caller is currently inside.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| ExecutorError::SchedulerUnavailable(e.to_string()))?;
        Ok(Self::new(handle))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, priority: Priority, job: Job) -> Result<()> {
        let id = self.id;
        trace!(scheduler = %self.label, %priority, "spawning blocking job (priority ignored)");

        let discarded = Arc::new(AtomicBool::new(false));
        let pending = PendingJob {
            job: Some(job),
            label: self.label.clone(),
            discarded: Arc::clone(&discarded),
        };

        // Detached: completion is reported through the job itself.
        drop(
            self.handle
                .spawn_blocking(move || enter_context(id, || pending.run())),
        );

        // A shut-down runtime drops the task before `spawn_blocking` returns.
        if discarded.load(Ordering::Acquire) {
            return Err(ExecutorError::SchedulerUnavailable(format!(
                "{}: runtime is shut down",
                self.label
            )));
        }
        Ok(())
    }

    fn is_current(&self) -> bool {
        context::current() == Some(self.id)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// A job handed to the blocking pool. Flags itself if tokio drops it unrun.
struct PendingJob {
    job: Option<Job>,
    label: String,
    discarded: Arc<AtomicBool>,
}

impl PendingJob {
    fn run(mut self) {
        if let Some(job) = self.job.take() {
            run_job(job, &self.label);
        }
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.job.is_some() {
            self.discarded.store(true, Ordering::Release);
            warn!(scheduler = %self.label, "blocking job discarded by the runtime before it ran");
        }
    }
}
