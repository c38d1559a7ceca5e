// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExecutorError, Result};

/// Upper bound on `[pool].worker_threads`.
pub const MAX_WORKER_THREADS: usize = 1024;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ExecutorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pool, raw.executor))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pool(cfg)?;
    Ok(())
}

fn validate_pool(cfg: &RawConfigFile) -> Result<()> {
    let threads = cfg.pool.worker_threads;
    if threads == 0 {
        return Err(ExecutorError::ConfigError(
            "[pool].worker_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if threads > MAX_WORKER_THREADS {
        return Err(ExecutorError::ConfigError(format!(
            "[pool].worker_threads must be <= {MAX_WORKER_THREADS} (got {threads})"
        )));
    }

    if cfg.pool.thread_name.trim().is_empty() {
        return Err(ExecutorError::ConfigError(
            "[pool].thread_name must not be empty".to_string(),
        ));
    }

    // default_priority is strongly typed and validated during
    // deserialization.
    Ok(())
}
