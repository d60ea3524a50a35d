use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// What a pool did with the candidates it accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Checked and reported.
    pub executed: u64,
    /// Dropped because of shutdown (never started, or finished after it).
    pub discarded: u64,
    /// Checks that panicked. Also counted in `executed` when reported.
    pub panicked: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    executed: AtomicU64,
    discarded: AtomicU64,
    panicked: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn discarded(&self, n: u64) {
        self.discarded.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            executed: self.executed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Counter values read from a live run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub primes_found: u64,
    pub candidates_completed: u64,
}

impl CounterSnapshot {
    pub fn holds_invariant(&self) -> bool {
        self.primes_found <= self.candidates_completed
    }
}
