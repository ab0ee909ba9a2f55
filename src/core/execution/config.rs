//! Configuration for lsim simulation execution
//!
//! This module provides configuration types for controlling simulation execution behavior,
//! including concurrency settings, thread pool management and the per-tick pass bound.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default bound on firing passes per structural part and tick
pub const DEFAULT_MAX_PASSES: usize = 64;

/// Default time the run loop parks waiting for an external stimulus
pub const DEFAULT_IDLE_WAIT_MS: u64 = 10;

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Sequential execution mode - children are visited in declaration order within a single thread
    #[default]
    Sequential,
    /// Parallel execution mode using Rayon - independent children of a stage run concurrently
    Rayon,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Configuration for simulation execution
///
/// This struct holds configuration options that control how the simulation is executed,
/// including concurrency settings and resource management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Strategy applied to every structural part. `None` keeps the strategy
    /// each part was built with.
    pub concurrency_mode: Option<ConcurrencyMode>,
    /// The size of the thread pool for parallel execution
    /// Only relevant for parts using the Rayon strategy
    pub thread_pool_size: Option<usize>,
    /// Firing passes allowed per structural part and tick before the
    /// tick fails with `NonTermination`
    pub max_passes: usize,
    /// How long `run_until` waits for a stimulus before re-checking its stop predicate
    pub idle_wait_ms: u64,
}

impl SimulationConfig {
    /// Create a new simulation configuration with default values
    ///
    /// Default configuration keeps per-part strategies and uses no dedicated thread pool
    pub fn new() -> Self {
        Self {
            concurrency_mode: None,
            thread_pool_size: None,
            max_passes: DEFAULT_MAX_PASSES,
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
        }
    }

    /// Set the concurrency mode for every structural part
    ///
    /// # Arguments
    /// * `mode` - The concurrency mode to use
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = Some(mode);
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects parts using the Rayon strategy
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    pub fn with_idle_wait_ms(mut self, millis: u64) -> Self {
        self.idle_wait_ms = millis;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::Validation(
                "max_passes must be at least 1".to_string(),
            ));
        }
        if self.thread_pool_size == Some(0) {
            return Err(ConfigError::Validation(
                "thread_pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
