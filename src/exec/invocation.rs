// src/exec/invocation.rs

//! A single, ephemeral invocation of an action.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, trace};

use crate::context::{DeliveryContext, Job};
use crate::types::InvocationState;

/// Process-unique identifier of one `execute*` call; only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(u64);

impl InvocationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        InvocationId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv#{}", self.0)
    }
}

/// Tracks the `Scheduled -> Running -> Completing -> Delivered` lifecycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lifecycle {
    id: InvocationId,
    state: InvocationState,
}

impl Lifecycle {
    fn new(id: InvocationId) -> Self {
        trace!(invocation = %id, state = ?InvocationState::Scheduled, "invocation state");
        Self {
            id,
            state: InvocationState::Scheduled,
        }
    }

    pub(crate) fn state(&self) -> InvocationState {
        self.state
    }

    fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            is_next_state(self.state, next),
            "illegal invocation transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        trace!(invocation = %self.id, state = ?next, "invocation state");
    }
}

fn is_next_state(from: InvocationState, to: InvocationState) -> bool {
    use InvocationState::*;
    matches!(
        (from, to),
        (Scheduled, Running) | (Running, Completing) | (Completing, Delivered)
    )
}

/// Input plus completion sink for one call.
///
/// Consumed by [`Invocation::run`], which is what makes "exactly once" hold:
/// the sink is an `FnOnce` that can only be moved out a single time.
pub(crate) struct Invocation<I, O> {
    lifecycle: Lifecycle,
    input: I,
    completion: Box<dyn FnOnce(O) + Send + 'static>,
}

impl<I, O> Invocation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(input: I, completion: impl FnOnce(O) + Send + 'static) -> Self {
        Self {
            lifecycle: Lifecycle::new(InvocationId::next()),
            input,
            completion: Box::new(completion),
        }
    }

    pub(crate) fn id(&self) -> InvocationId {
        self.lifecycle.id
    }

    /// Run the action on the current (execution) context, then hand the output
    /// to `target`, or call the completion right here if there is none.
    pub(crate) fn run(
        self,
        action: &(dyn Fn(I) -> O + Send + Sync),
        target: Option<Arc<dyn DeliveryContext>>,
    ) {
        let Invocation {
            mut lifecycle,
            input,
            completion,
        } = self;

        lifecycle.advance(InvocationState::Running);
        let output = action(input);
        lifecycle.advance(InvocationState::Completing);

        match target {
            None => {
                completion(output);
                lifecycle.advance(InvocationState::Delivered);
            }
            Some(context) => {
                let job: Job = Box::new(move || {
                    completion(output);
                    lifecycle.advance(InvocationState::Delivered);
                });

                if let Err(err) = context.deliver(job) {
                    error!(
                        invocation = %lifecycle.id,
                        state = ?lifecycle.state(),
                        context = %context.label(),
                        error = %err,
                        "delivery context rejected completion; dropping it"
                    );
                }
            }
        }
    }
}
