//! Errors - エラー型と分類
//!
//! - bound / baseline / config の検証エラーは `start` や `build` から同期的に返す
//! - InvariantViolation はエラーとして返さず、ResultSink に通知するだけ（診断用）

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ErrorKind は失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// n < 0
    InvalidBound,
    /// n > configured maximum
    BoundTooLarge,
    /// submission after the pool was closed or shut down
    PoolClosed,
    /// primes_found > candidates_completed was observed (non-fatal)
    InvariantViolation,
    /// baseline counters that already break the invariant
    InvalidBaseline,
    /// configuration rejected at build time
    InvalidConfig,
}

#[derive(Debug, Error)]
pub enum PrimesError {
    #[error("bound must be non-negative, got {0}")]
    InvalidBound(i64),

    #[error("bound {bound} exceeds the configured maximum {max}")]
    BoundTooLarge { bound: u64, max: u64 },

    #[error("task pool is closed")]
    PoolClosed,

    #[error("baseline primes_found={primes} exceeds candidates_completed={completed}")]
    InvalidBaseline { primes: u64, completed: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config decode: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    #[error("config read: {0}")]
    ConfigRead(#[from] std::io::Error),
}

impl PrimesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBound(_) => ErrorKind::InvalidBound,
            Self::BoundTooLarge { .. } => ErrorKind::BoundTooLarge,
            Self::PoolClosed => ErrorKind::PoolClosed,
            Self::InvalidBaseline { .. } => ErrorKind::InvalidBaseline,
            Self::InvalidConfig(_) | Self::ConfigDecode(_) | Self::ConfigRead(_) => {
                ErrorKind::InvalidConfig
            }
        }
    }
}
