//! ResultSink port - 結果通知の抽象化
//!
//! presentation layer はこの trait を実装して表示を更新する。
//!
//! # 呼び出し規約
//! - worker から並行に呼ばれる（`Send + Sync` が必要）
//! - prime の通知順は candidate の大小ではなくスケジューリング順
//! - 実装は短時間で return すること（hot path 上で呼ばれる）
//! - コールバック内から同期的に `RunController` を呼ばないこと
//!   （cancel は報告中の worker が抜けるのを controller のロックを持ったまま待つ）

use serde::{Deserialize, Serialize};

pub trait ResultSink: Send + Sync {
    /// A prime was found; `primes_so_far` includes it.
    fn on_prime_found(&self, candidate: u64, primes_so_far: u64);

    /// One more candidate finished; `candidates_completed` includes it.
    fn on_progress(&self, candidates_completed: u64);

    /// `primes_found > candidates_completed` was observed. Diagnostic only.
    fn on_invariant_violation(&self, primes_so_far: u64, completed_so_far: u64);

    /// Every candidate of the run has been reported.
    fn on_run_complete(&self, total_primes: u64, total_processed: u64);
}

/// One sink notification as a value, for sinks that store or forward them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    PrimeFound {
        candidate: u64,
        primes_so_far: u64,
    },
    Progress {
        candidates_completed: u64,
    },
    InvariantViolation {
        primes_so_far: u64,
        completed_so_far: u64,
    },
    RunComplete {
        total_primes: u64,
        total_processed: u64,
    },
}

/// NoopSink は何もしない
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn on_prime_found(&self, _candidate: u64, _primes_so_far: u64) {}
    fn on_progress(&self, _candidates_completed: u64) {}
    fn on_invariant_violation(&self, _primes_so_far: u64, _completed_so_far: u64) {}
    fn on_run_complete(&self, _total_primes: u64, _total_processed: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_event_is_tagged() {
        let e = SinkEvent::PrimeFound {
            candidate: 7,
            primes_so_far: 4,
        };
        let v = serde_json::to_value(e).unwrap();
        assert_eq!(v["event"], "prime_found");
        assert_eq!(v["candidate"], 7);
    }

    #[test]
    fn noop_sink_is_object_safe() {
        let sink: Box<dyn ResultSink> = Box::new(NoopSink);
        sink.on_progress(1);
        sink.on_run_complete(0, 1);
    }
}
