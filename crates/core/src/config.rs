//! Controller configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Configuration for a controller instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Worker count of the pool created at start
    pub initial_pool_size: usize,

    /// Prefix for worker thread names
    pub thread_name_prefix: String,

    /// Input length multiplier for the sequence-aggregate workload
    pub sequence_scale: i32,

    /// Input length multiplier for the comparison-sort workload
    pub sort_scale: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: 1,
            thread_name_prefix: "tandem-worker".to_string(),
            sequence_scale: 10_000,
            sort_scale: 1_000,
        }
    }
}

impl ControllerConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the initial pool size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.initial_pool_size = size;
        self
    }

    /// Set both workload scales.
    pub fn with_scales(mut self, sequence_scale: i32, sort_scale: i32) -> Self {
        self.sequence_scale = sequence_scale;
        self.sort_scale = sort_scale;
        self
    }

    /// Check that the scales are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_scale <= 0 {
            return Err(ConfigError::Invalid(format!(
                "sequence_scale must be positive, got {}",
                self.sequence_scale
            )));
        }
        if self.sort_scale <= 0 {
            return Err(ConfigError::Invalid(format!(
                "sort_scale must be positive, got {}",
                self.sort_scale
            )));
        }
        Ok(())
    }
}
