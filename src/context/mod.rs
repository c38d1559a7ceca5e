// src/context/mod.rs

//! Execution and delivery contexts.
//!
//! A *context* is somewhere a unit of work can run: a worker of the pool, a
//! serial event loop, the main/UI loop owned by the host application. Every
//! context has a process-unique [`ContextId`]; while a context is running a
//! job it installs its id in a thread-local so code can ask "am I on context
//! X?" via [`current`] or [`DeliveryContext::is_current`].
//!
//! - [`DeliveryContext`] is the capability the executor needs to marshal a
//!   completion somewhere specific.
//! - [`event_loop`] provides the serial, single-thread implementation.

pub mod event_loop;

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::error;

use crate::errors::Result;

pub use event_loop::{EventLoop, EventLoopHandle};

/// A type-erased unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Process-unique identifier of an execution or delivery context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// The context the current thread is running inside, if any.
pub fn current() -> Option<ContextId> {
    CURRENT_CONTEXT.with(Cell::get)
}

/// Run `f` with `id` installed as the current context, restoring the previous
/// value afterwards (also on unwind).
pub(crate) fn enter_context<R>(id: ContextId, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<ContextId>);

    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT_CONTEXT.with(|cell| cell.set(self.0));
        }
    }

    let _restore = Restore(CURRENT_CONTEXT.with(|cell| cell.replace(Some(id))));
    f()
}

/// Run a job, containing any panic so the hosting thread survives.
pub(crate) fn run_job(job: Job, context: &str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            context,
            panic = %panic_message(payload.as_ref()),
            "job panicked; continuing"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// A context that accepts zero-argument jobs and guarantees they run on it.
///
/// The executor never assumes a global main thread exists; whoever owns the
/// UI/event loop hands out an implementation of this trait.
pub trait DeliveryContext: Send + Sync {
    /// Enqueue `job` to run on this context.
    ///
    /// Returns [`ExecutorError::ContextClosed`](crate::errors::ExecutorError::ContextClosed)
    /// if the context no longer accepts work; the job is dropped unrun.
    fn deliver(&self, job: Job) -> Result<()>;

    /// Whether the calling thread is currently running inside this context.
    fn is_current(&self) -> bool;

    /// Human-readable name, used in logs.
    fn label(&self) -> &str;
}

impl<C: DeliveryContext + ?Sized> DeliveryContext for Arc<C> {
    fn deliver(&self, job: Job) -> Result<()> {
        (**self).deliver(job)
    }

    fn is_current(&self) -> bool {
        (**self).is_current()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
