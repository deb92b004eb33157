use screener_core::ScreenerError;
use serde::{Deserialize, Serialize};
use std::env;

/// Default ceiling on concurrently screened candidates.
pub const DEFAULT_MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub max_workers: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl ScreenerConfig {
    /// Read overrides from the environment (`SCREENER_MAX_WORKERS`).
    pub fn from_env() -> Result<Self, ScreenerError> {
        let mut config = Self::default();
        if let Ok(raw) = env::var("SCREENER_MAX_WORKERS") {
            config.max_workers = raw.trim().parse().map_err(|_| {
                ScreenerError::Config(format!("SCREENER_MAX_WORKERS must be a positive integer, got '{}'", raw))
            })?;
        }
        Ok(config)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Concurrency ceiling for a batch of `candidates`: `min(candidates, max_workers)`,
    /// never below one worker for a non-empty batch.
    pub fn worker_count(&self, candidates: usize) -> usize {
        candidates.min(self.max_workers.max(1))
    }
}
