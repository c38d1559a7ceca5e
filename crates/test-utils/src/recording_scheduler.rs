use std::sync::{Arc, Mutex};

use action_executor::errors::Result;
use action_executor::{Job, Priority, Scheduler};

/// A fake scheduler that:
/// - records the priority of every job handed to it
/// - forwards the job to a real inner scheduler.
pub struct RecordingScheduler {
    inner: Arc<dyn Scheduler>,
    scheduled: Arc<Mutex<Vec<Priority>>>,
}

impl RecordingScheduler {
    pub fn new(inner: Arc<dyn Scheduler>) -> Self {
        Self {
            inner,
            scheduled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Priorities seen so far, in scheduling order.
    pub fn priorities(&self) -> Vec<Priority> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&self, priority: Priority, job: Job) -> Result<()> {
        {
            let mut guard = self.scheduled.lock().unwrap();
            guard.push(priority);
        }
        self.inner.schedule(priority, job)
    }

    fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    fn label(&self) -> &str {
        "recording"
    }
}
