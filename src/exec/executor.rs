// src/exec/executor.rs

//! The action executor.
//!
//! An [`ActionExecutor`] is immutable configuration: an action, a priority
//! and an optional fixed delivery context. Every `execute*` call builds a
//! fresh invocation, hands it to the [`Scheduler`] and returns. All entry
//! points funnel into one primitive, `dispatch`, which differs only in the
//! delivery target:
//!
//! | entry point                         | completion runs on                        |
//! |-------------------------------------|-------------------------------------------|
//! | `execute`                           | configured context, else execution context |
//! | `execute_async`                     | awaiting task resumes on its own runtime  |
//! | `execute_and_deliver_on_main`       | the given main context, always            |
//! | `execute_and_deliver_on_main_async` | hops through main, then resumes the task  |

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::config::ExecutorSection;
use crate::context::DeliveryContext;
use crate::errors::{ExecutorError, Result};
use crate::scheduler::Scheduler;
use crate::types::Priority;

use super::invocation::Invocation;

/// The action an executor runs.
pub type Action<I, O> = Arc<dyn Fn(I) -> O + Send + Sync + 'static>;

/// Runs an action off the caller's thread and delivers its output to a
/// chosen context.
///
/// Cloning is cheap and yields an executor sharing the same configuration.
pub struct ActionExecutor<I, O> {
    action: Action<I, O>,
    priority: Priority,
    delivery: Option<Arc<dyn DeliveryContext>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<I, O> Clone for ActionExecutor<I, O> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            priority: self.priority,
            delivery: self.delivery.clone(),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<I, O> fmt::Debug for ActionExecutor<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("priority", &self.priority)
            .field("delivery", &self.delivery.as_ref().map(|c| c.label()))
            .field("scheduler", &self.scheduler.label())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ActionExecutor`]; only the scheduler and action are required.
pub struct ExecutorBuilder<I, O> {
    action: Action<I, O>,
    priority: Priority,
    delivery: Option<Arc<dyn DeliveryContext>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<I, O> ExecutorBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, action: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(action),
            priority: Priority::default(),
            delivery: None,
            scheduler,
        }
    }

    /// Take defaults from a validated `[executor]` section.
    pub fn with_config(mut self, cfg: &ExecutorSection) -> Self {
        self.priority = cfg.default_priority;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Pin completions of `execute` to `context`, whatever the caller's
    /// context is.
    pub fn deliver_on<C>(mut self, context: C) -> Self
    where
        C: DeliveryContext + 'static,
    {
        self.delivery = Some(Arc::new(context));
        self
    }

    pub fn build(self) -> ActionExecutor<I, O> {
        ActionExecutor {
            action: self.action,
            priority: self.priority,
            delivery: self.delivery,
            scheduler: self.scheduler,
        }
    }
}

impl<I, O> ActionExecutor<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Executor with default priority and no fixed delivery context.
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, action: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        ExecutorBuilder::new(scheduler, action).build()
    }

    pub fn builder<F>(scheduler: Arc<dyn Scheduler>, action: F) -> ExecutorBuilder<I, O>
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        ExecutorBuilder::new(scheduler, action)
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn delivery_context(&self) -> Option<&Arc<dyn DeliveryContext>> {
        self.delivery.as_ref()
    }

    /// Fire-and-forget.
    ///
    /// Returns once the action has been handed to the scheduler. `completion`
    /// is then called exactly once with the action's output: on the
    /// configured delivery context if there is one, otherwise on the
    /// execution context that ran the action.
    ///
    /// An error means the scheduler refused the work; `completion` will never
    /// be called.
    pub fn execute<C>(&self, input: I, completion: C) -> Result<()>
    where
        C: FnOnce(O) + Send + 'static,
    {
        self.dispatch(input, self.delivery.clone(), completion)
    }

    /// Suspending form of [`execute`](Self::execute).
    ///
    /// The awaiting task resumes on whatever thread its runtime polls it
    /// from, not necessarily the one it started on.
    pub async fn execute_async(&self, input: I) -> Result<O> {
        let (tx, rx) = oneshot::channel();
        self.execute(input, move |output| {
            // The awaiting side may have been dropped; nothing to deliver to.
            let _ = tx.send(output);
        })?;
        rx.await.map_err(|_| ExecutorError::Abandoned)
    }

    /// Like [`execute`](Self::execute), but always delivers on `main`,
    /// overriding any configured delivery context.
    pub fn execute_and_deliver_on_main<M, C>(&self, main: &M, input: I, completion: C) -> Result<()>
    where
        M: DeliveryContext + Clone + 'static,
        C: FnOnce(O) + Send + 'static,
    {
        let main: Arc<dyn DeliveryContext> = Arc::new(main.clone());
        self.dispatch(input, Some(main), completion)
    }

    /// Suspending form of
    /// [`execute_and_deliver_on_main`](Self::execute_and_deliver_on_main).
    ///
    /// Resolves after the output has been handed over on `main`, so the
    /// result is ordered after every job queued on `main` before it.
    pub async fn execute_and_deliver_on_main_async<M>(&self, main: &M, input: I) -> Result<O>
    where
        M: DeliveryContext + Clone + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute_and_deliver_on_main(main, input, move |output| {
            let _ = tx.send(output);
        })?;
        rx.await.map_err(|_| ExecutorError::Abandoned)
    }

    fn dispatch<C>(
        &self,
        input: I,
        target: Option<Arc<dyn DeliveryContext>>,
        completion: C,
    ) -> Result<()>
    where
        C: FnOnce(O) + Send + 'static,
    {
        let invocation = Invocation::new(input, completion);
        let id = invocation.id();
        let action = Arc::clone(&self.action);

        trace!(
            invocation = %id,
            priority = %self.priority,
            scheduler = %self.scheduler.label(),
            deliver_to = target.as_ref().map(|c| c.label()).unwrap_or("<execution context>"),
            "scheduling invocation"
        );

        self.scheduler
            .schedule(
                self.priority,
                Box::new(move || invocation.run(&*action, target)),
            )
            .inspect_err(|err| {
                warn!(invocation = %id, error = %err, "scheduler refused invocation");
            })
    }
}

impl<O> ActionExecutor<(), O>
where
    O: Send + 'static,
{
    /// Executor for an action that takes no input.
    pub fn from_fn<F>(scheduler: Arc<dyn Scheduler>, action: F) -> Self
    where
        F: Fn() -> O + Send + Sync + 'static,
    {
        ExecutorBuilder::new(scheduler, move |()| action()).build()
    }

    /// `execute((), completion)`.
    pub fn execute_unit<C>(&self, completion: C) -> Result<()>
    where
        C: FnOnce(O) + Send + 'static,
    {
        self.execute((), completion)
    }

    /// `execute_async(())`.
    pub async fn execute_unit_async(&self) -> Result<O> {
        self.execute_async(()).await
    }

    /// `execute_and_deliver_on_main(main, (), completion)`.
    pub fn execute_unit_and_deliver_on_main<M, C>(&self, main: &M, completion: C) -> Result<()>
    where
        M: DeliveryContext + Clone + 'static,
        C: FnOnce(O) + Send + 'static,
    {
        self.execute_and_deliver_on_main(main, (), completion)
    }
}

impl<I> ActionExecutor<I, ()>
where
    I: Send + 'static,
{
    /// `execute(input, completion)` with a completion that takes no value.
    pub fn execute_notify<D>(&self, input: I, done: D) -> Result<()>
    where
        D: FnOnce() + Send + 'static,
    {
        self.execute(input, move |()| done())
    }
}

impl ActionExecutor<(), ()> {
    /// `execute((), |()| done())`.
    pub fn run<D>(&self, done: D) -> Result<()>
    where
        D: FnOnce() + Send + 'static,
    {
        self.execute_notify((), done)
    }

    /// `execute_and_deliver_on_main(main, (), |()| done())`.
    pub fn run_and_deliver_on_main<M, D>(&self, main: &M, done: D) -> Result<()>
    where
        M: DeliveryContext + Clone + 'static,
        D: FnOnce() + Send + 'static,
    {
        self.execute_and_deliver_on_main(main, (), move |()| done())
    }
}
