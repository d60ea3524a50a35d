//! RecordingSink - 通知をメモリに記録する sink
//!
//! テストや、後からまとめて表示したい場合に使う。

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ports::{ResultSink, SinkEvent};

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: SinkEvent) {
        self.guard().push(event);
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.guard().clone()
    }

    /// Candidates reported as prime, in arrival order.
    pub fn primes(&self) -> Vec<u64> {
        self.guard()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::PrimeFound { candidate, .. } => Some(*candidate),
                _ => None,
            })
            .collect()
    }

    pub fn progress_count(&self) -> usize {
        self.guard()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Progress { .. }))
            .count()
    }

    pub fn violations(&self) -> Vec<(u64, u64)> {
        self.guard()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::InvariantViolation {
                    primes_so_far,
                    completed_so_far,
                } => Some((*primes_so_far, *completed_so_far)),
                _ => None,
            })
            .collect()
    }

    /// `(total_primes, total_processed)` of every completed run.
    pub fn completions(&self) -> Vec<(u64, u64)> {
        self.guard()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::RunComplete {
                    total_primes,
                    total_processed,
                } => Some((*total_primes, *total_processed)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

impl ResultSink for RecordingSink {
    fn on_prime_found(&self, candidate: u64, primes_so_far: u64) {
        self.push(SinkEvent::PrimeFound {
            candidate,
            primes_so_far,
        });
    }

    fn on_progress(&self, candidates_completed: u64) {
        self.push(SinkEvent::Progress {
            candidates_completed,
        });
    }

    fn on_invariant_violation(&self, primes_so_far: u64, completed_so_far: u64) {
        self.push(SinkEvent::InvariantViolation {
            primes_so_far,
            completed_so_far,
        });
    }

    fn on_run_complete(&self, total_primes: u64, total_processed: u64) {
        self.push(SinkEvent::RunComplete {
            total_primes,
            total_processed,
        });
    }
}
