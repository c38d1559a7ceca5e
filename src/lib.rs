// src/lib.rs

//! Offload a single action to a background execution context and deliver its
//! output to a context chosen by the caller, without blocking the caller.
//!
//! The pieces:
//! - [`exec::ActionExecutor`]: immutable configuration plus the callback,
//!   `async` and deliver-on-main entry points.
//! - [`scheduler::Scheduler`]: where actions run ([`scheduler::WorkerPool`],
//!   [`scheduler::TokioScheduler`]).
//! - [`context::DeliveryContext`]: where completions run
//!   ([`context::EventLoop`] for main/UI loops and serial queues).
//!
//! ```ignore
//! use std::sync::Arc;
//! use action_executor::{ActionExecutor, EventLoop, Priority, WorkerPool};
//!
//! let pool = Arc::new(WorkerPool::builder().worker_threads(2).build()?);
//! let (main_loop, main) = EventLoop::new("main");
//!
//! let square = ActionExecutor::builder(pool, |x: u64| x * x)
//!     .priority(Priority::High)
//!     .build();
//!
//! let ui = main.clone();
//! square.execute_and_deliver_on_main(&main, 12, move |out| {
//!     assert!(ui.is_current());
//!     println!("{out}");
//!     ui.shutdown();
//! })?;
//!
//! main_loop.run();
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod scheduler;
pub mod types;

pub use context::{DeliveryContext, EventLoop, EventLoopHandle, Job};
pub use errors::{ExecutorError, Result};
pub use exec::{ActionExecutor, ExecutorBuilder};
pub use scheduler::{Scheduler, TokioScheduler, WorkerPool};
pub use types::{InvocationState, Priority};
