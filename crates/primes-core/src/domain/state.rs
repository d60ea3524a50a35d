//! State - run の状態
//!
//! # 状態遷移
//! - idle: まだ一度も start されていない
//! - running: candidate を処理中
//! - completed: n 件すべての outcome が報告された
//! - cancelled: cancel() された（その後は un-cancel しない）
//!
//! completed / cancelled から start すると新しい run が running になる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    /// Returns true once the run can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Starting values for a run's counters.
///
/// Lets a caller keep a running total across repeated runs. Must satisfy
/// `primes_found <= candidates_completed` itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub primes_found: u64,
    pub candidates_completed: u64,
}

impl Baseline {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(primes_found: u64, candidates_completed: u64) -> Self {
        Self {
            primes_found,
            candidates_completed,
        }
    }
}

/// Final (or current) view of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub bound: u64,
    pub status: RunStatus,
    pub primes_found: u64,
    pub candidates_completed: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
