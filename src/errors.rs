// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The scheduler refused the job (e.g. the pool has been shut down).
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    /// A delivery context no longer accepts work.
    #[error("Delivery context closed: {0}")]
    ContextClosed(String),

    /// The invocation was dropped before its output reached the awaiting task.
    #[error("Invocation abandoned before delivery")]
    Abandoned,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
