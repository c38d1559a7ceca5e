pub mod builders;
pub mod recording_scheduler;

use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle, ThreadId};

use action_executor::context::{self, ContextId};
use action_executor::{EventLoop, EventLoopHandle, WorkerPool};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=trace cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .with_thread_names(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A small pool named `test-worker-<n>`.
pub fn test_pool(threads: usize) -> Arc<WorkerPool> {
    Arc::new(
        WorkerPool::builder()
            .worker_threads(threads)
            .thread_name("test-worker")
            .build()
            .expect("failed to start test worker pool"),
    )
}

/// Start an event loop on a dedicated thread called `main`, standing in for
/// the application's UI thread.
///
/// Call `shutdown()` on the handle and join the thread at the end of the test.
pub fn spawn_main_loop() -> (EventLoopHandle, JoinHandle<()>) {
    let (event_loop, handle) = EventLoop::new("main");
    let thread = thread::Builder::new()
        .name("main".to_string())
        .spawn(move || event_loop.run())
        .expect("failed to spawn main loop thread");
    (handle, thread)
}

/// Where a closure observed itself running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub thread: ThreadId,
    pub thread_name: Option<String>,
    pub context: Option<ContextId>,
}

impl Observation {
    pub fn here() -> Self {
        let current = thread::current();
        Self {
            thread: current.id(),
            thread_name: current.name().map(str::to_string),
            context: context::current(),
        }
    }
}

/// Shared log of observations, cloneable into actions and completions.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    seen: Arc<Mutex<Vec<Observation>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.seen.lock().unwrap().push(Observation::here());
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.seen.lock().unwrap().clone()
    }
}
