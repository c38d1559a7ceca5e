// src/config/model.rs

use std::thread;

use serde::Deserialize;

use crate::types::Priority;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pool]
/// worker_threads = 4
/// thread_name = "action-worker"
///
/// [executor]
/// default_priority = "high"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Worker pool sizing from `[pool]`.
    #[serde(default)]
    pub pool: PoolSection,

    /// Executor defaults from `[executor]`.
    #[serde(default)]
    pub executor: ExecutorSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pool: PoolSection,
    pub executor: ExecutorSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(pool: PoolSection, executor: ExecutorSection) -> Self {
        Self { pool, executor }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Number of OS threads in the worker pool.
    ///
    /// Defaults to the available parallelism of the host.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Prefix for worker thread names; workers are named `<prefix>-<index>`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_worker_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_thread_name() -> String {
    "action-worker".to_string()
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            thread_name: default_thread_name(),
        }
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorSection {
    /// Priority used by executors built with `ExecutorBuilder::with_config`
    /// unless they override it.
    #[serde(default)]
    pub default_priority: Priority,
}
