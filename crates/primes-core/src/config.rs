//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::PrimesError;

pub const DEFAULT_WORKER_COUNT: usize = 100;
pub const DEFAULT_MAX_BOUND: u64 = 2_500_000;

/// Configuration recognized by the core.
///
/// Missing fields fall back to their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of candidates checked concurrently.
    pub worker_count: usize,

    /// Largest bound `start` accepts.
    pub max_bound: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            max_bound: DEFAULT_MAX_BOUND,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, PrimesError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PrimesError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_max_bound(mut self, max_bound: u64) -> Self {
        self.max_bound = max_bound;
        self
    }

    pub fn validate(&self) -> Result<(), PrimesError> {
        if self.worker_count == 0 {
            return Err(PrimesError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count, 100);
        assert_eq!(config.max_bound, 2_500_000);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_json_overrides_one_field() {
        let config = EngineConfig::from_json_str(r#"{"worker_count": 4}"#).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_bound, DEFAULT_MAX_BOUND);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{"worker_count": 0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = EngineConfig::from_json_str("{worker_count").unwrap_err();
        assert!(matches!(err, PrimesError::ConfigDecode(_)));
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = EngineConfig::from_file("/nonexistent/primes.json").unwrap_err();
        assert!(matches!(err, PrimesError::ConfigRead(_)));
    }
}
