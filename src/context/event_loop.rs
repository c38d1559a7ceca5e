// src/context/event_loop.rs

//! Serial, single-thread delivery context.
//!
//! An [`EventLoop`] drains jobs one at a time, in submission order, on
//! whichever thread calls [`EventLoop::run`]. Two ways to use it:
//!
//! - [`EventLoop::new`] hands the loop back to the caller, which runs it on a
//!   thread it owns (typically the process main/UI thread). The returned
//!   [`EventLoopHandle`] is then the "primary context".
//! - [`EventLoop::spawn`] runs the loop on a dedicated named thread, giving a
//!   fixed serial queue that completions can be pinned to.
//!
//! The loop exits after [`EventLoopHandle::shutdown`] once every job queued
//! before the shutdown has run, or when all handles have been dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{ExecutorError, Result};

use super::{ContextId, DeliveryContext, Job, enter_context, run_job};

enum Message {
    Run(Job),
    Shutdown,
}

struct LoopShared {
    id: ContextId,
    label: String,
    closed: AtomicBool,
    /// Held across the `closed` check and the send, so no `Run` can land
    /// behind `Shutdown`.
    send_gate: Mutex<()>,
}

impl LoopShared {
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.send_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The receiving half: owns the job queue and runs it.
pub struct EventLoop {
    shared: Arc<LoopShared>,
    rx: mpsc::UnboundedReceiver<Message>,
}

/// Cloneable sending half; implements [`DeliveryContext`].
#[derive(Clone)]
pub struct EventLoopHandle {
    shared: Arc<LoopShared>,
    tx: mpsc::UnboundedSender<Message>,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for EventLoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopHandle")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("closed", &self.shared.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl EventLoop {
    /// Create a loop that the caller will drive with [`EventLoop::run`].
    pub fn new(label: impl Into<String>) -> (EventLoop, EventLoopHandle) {
        let shared = Arc::new(LoopShared {
            id: ContextId::next(),
            label: label.into(),
            closed: AtomicBool::new(false),
            send_gate: Mutex::new(()),
        });
        let (tx, rx) = mpsc::unbounded_channel();

        let event_loop = EventLoop {
            shared: Arc::clone(&shared),
            rx,
        };
        let handle = EventLoopHandle { shared, tx };
        (event_loop, handle)
    }

    /// Create a loop and run it on a new thread named after `label`.
    pub fn spawn(label: impl Into<String>) -> Result<EventLoopHandle> {
        let label = label.into();
        let (event_loop, handle) = EventLoop::new(label.clone());

        thread::Builder::new()
            .name(label)
            .spawn(move || event_loop.run())?;

        Ok(handle)
    }

    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    /// Run queued jobs on the current thread until shutdown.
    ///
    /// Blocks the calling thread; must not be called from inside an async
    /// runtime worker.
    pub fn run(mut self) {
        let id = self.shared.id;
        info!(context = %self.shared.label, %id, "event loop started");

        enter_context(id, || {
            while let Some(message) = self.rx.blocking_recv() {
                match message {
                    Message::Run(job) => run_job(job, &self.shared.label),
                    Message::Shutdown => {
                        debug!(context = %self.shared.label, "shutdown message received");
                        break;
                    }
                }
            }
        });

        self.shared.closed.store(true, Ordering::Release);
        info!(context = %self.shared.label, %id, "event loop finished");
    }
}

impl EventLoopHandle {
    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    /// Stop accepting jobs; the loop exits after draining what was already
    /// queued.
    pub fn shutdown(&self) {
        let _gate = self.shared.gate();
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(context = %self.shared.label, "event loop shutdown requested");
        // The loop may already be gone; nothing left to stop then.
        let _ = self.tx.send(Message::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

impl DeliveryContext for EventLoopHandle {
    fn deliver(&self, job: Job) -> Result<()> {
        let _gate = self.shared.gate();
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(ExecutorError::ContextClosed(self.shared.label.clone()));
        }
        self.tx
            .send(Message::Run(job))
            .map_err(|_| ExecutorError::ContextClosed(self.shared.label.clone()))
    }

    fn is_current(&self) -> bool {
        super::current() == Some(self.shared.id)
    }

    fn label(&self) -> &str {
        &self.shared.label
    }
}
