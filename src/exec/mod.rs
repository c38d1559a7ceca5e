// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`executor`] owns [`ActionExecutor`], its builder, and the unit-typed
//!   convenience entry points.
//! - [`invocation`] models one call: input, completion sink and the
//!   `Scheduled -> Running -> Completing -> Delivered` lifecycle.

pub mod executor;
pub mod invocation;

pub use executor::{Action, ActionExecutor, ExecutorBuilder};
pub use invocation::InvocationId;
