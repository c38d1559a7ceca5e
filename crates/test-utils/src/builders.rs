#![allow(dead_code)]

use action_executor::Priority;
use action_executor::config::{ConfigFile, ExecutorSection, PoolSection, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                pool: PoolSection::default(),
                executor: ExecutorSection::default(),
            },
        }
    }

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.config.pool.worker_threads = n;
        self
    }

    pub fn thread_name(mut self, name: &str) -> Self {
        self.config.pool.thread_name = name.to_string();
        self
    }

    pub fn default_priority(mut self, priority: Priority) -> Self {
        self.config.executor.default_priority = priority;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
