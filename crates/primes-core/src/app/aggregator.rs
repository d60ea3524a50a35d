//! ResultAggregator - outcome を RunState に集約する
//!
//! # 不変条件
//! 常に `primes_found <= candidates_completed`。
//!
//! # 更新順序
//! 1. candidates_completed を fetch_add
//! 2. prime なら primes_found を fetch_add（必ず 1 の後）
//! 3. primes → completed の順に読んで不変条件をチェック
//!
//! 全 reporter が「completed を先に増やす」ので、primes を読んだ後に completed を
//! 読めば、正しく同期されている限り違反は観測されない。
//!
//! # cancel
//! reporter は report gate を通ってから counter を触る。`RunState::cancel` は
//! フラグを立てたあと gate 内の reporter がいなくなるまで待つので、cancel が
//! return した後に counter が変わることはない。

use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, trace};

use crate::domain::{Baseline, Outcome, PrimesError, RunId, RunStatus, RunSummary};
use crate::observability::CounterSnapshot;
use crate::pool::ReportFn;
use crate::ports::ResultSink;

/// Shared counters and cancellation flag of one run.
pub struct RunState {
    run_id: RunId,
    bound: u64,
    primes_found: AtomicU64,
    candidates_completed: AtomicU64,
    /// outcomes fully reported (sink notified); drives completion
    settled: AtomicU64,
    /// reporters currently inside the report gate
    reporters: AtomicUsize,
    cancelled: AtomicBool,
    status: watch::Sender<RunStatus>,
    started_at: DateTime<Utc>,
    finished_at: OnceLock<DateTime<Utc>>,
}

/// Held by a reporter while it mutates the counters.
struct ReportGuard<'a> {
    reporters: &'a AtomicUsize,
}

impl Drop for ReportGuard<'_> {
    fn drop(&mut self) {
        self.reporters.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RunState {
    pub fn new(run_id: RunId, bound: u64, baseline: Baseline) -> Result<Self, PrimesError> {
        if baseline.primes_found > baseline.candidates_completed {
            return Err(PrimesError::InvalidBaseline {
                primes: baseline.primes_found,
                completed: baseline.candidates_completed,
            });
        }
        let (status, _) = watch::channel(RunStatus::Running);
        Ok(Self {
            run_id,
            bound,
            primes_found: AtomicU64::new(baseline.primes_found),
            candidates_completed: AtomicU64::new(baseline.candidates_completed),
            settled: AtomicU64::new(0),
            reporters: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            status,
            started_at: Utc::now(),
            finished_at: OnceLock::new(),
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn bound(&self) -> u64 {
        self.bound
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Read primes before completed, so a correctly synchronized run never
    /// yields a snapshot that breaks the invariant.
    pub fn snapshot(&self) -> CounterSnapshot {
        let primes_found = self.primes_found.load(Ordering::SeqCst);
        let candidates_completed = self.candidates_completed.load(Ordering::SeqCst);
        CounterSnapshot {
            primes_found,
            candidates_completed,
        }
    }

    pub fn summary(&self) -> RunSummary {
        let counters = self.snapshot();
        RunSummary {
            run_id: self.run_id,
            bound: self.bound,
            status: self.status(),
            primes_found: counters.primes_found,
            candidates_completed: counters.candidates_completed,
            started_at: self.started_at,
            finished_at: self.finished_at.get().copied(),
        }
    }

    /// Freeze the run. Returns true if this call moved it to `Cancelled`.
    ///
    /// Every caller blocks briefly until reporters already inside the gate
    /// have left, so the counters are final once any call returns.
    /// Must not be called from inside a `ResultSink` callback.
    pub fn cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        while self.reporters.load(Ordering::SeqCst) != 0 {
            std::thread::yield_now();
        }
        // may lose to a reporter that settled the last outcome before the flag
        first && self.transition(RunStatus::Running, RunStatus::Cancelled)
    }

    fn enter(&self) -> Option<ReportGuard<'_>> {
        self.reporters.fetch_add(1, Ordering::SeqCst);
        let guard = ReportGuard {
            reporters: &self.reporters,
        };
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        Some(guard)
    }

    fn transition(&self, from: RunStatus, to: RunStatus) -> bool {
        let moved = self.status.send_if_modified(|status| {
            if *status == from {
                *status = to;
                true
            } else {
                false
            }
        });
        if moved {
            let _ = self.finished_at.set(Utc::now());
        }
        moved
    }

    #[cfg(test)]
    pub(crate) fn force_counters(&self, primes_found: u64, candidates_completed: u64) {
        self.primes_found.store(primes_found, Ordering::SeqCst);
        self.candidates_completed
            .store(candidates_completed, Ordering::SeqCst);
    }
}

/// Serializes outcomes of one run into its RunState and notifies the sink.
pub struct ResultAggregator {
    state: Arc<RunState>,
    sink: Arc<dyn ResultSink>,
}

impl ResultAggregator {
    pub fn new(state: Arc<RunState>, sink: Arc<dyn ResultSink>) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Record one outcome. Returns false when the run is cancelled and the
    /// outcome was dropped.
    pub fn report(&self, outcome: Outcome) -> bool {
        let state = &self.state;
        let Some(_guard) = state.enter() else {
            trace!(run_id = %state.run_id, candidate = %outcome.candidate, "run cancelled; dropping outcome");
            return false;
        };

        let completed = state.candidates_completed.fetch_add(1, Ordering::SeqCst) + 1;
        let primes = if outcome.is_prime {
            state.primes_found.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            state.primes_found.load(Ordering::SeqCst)
        };
        let observed_completed = state.candidates_completed.load(Ordering::SeqCst);

        if primes > observed_completed {
            error!(
                run_id = %state.run_id,
                primes_found = primes,
                candidates_completed = observed_completed,
                "invariant violated: more primes than completed candidates"
            );
            self.sink.on_invariant_violation(primes, observed_completed);
        }

        if outcome.is_prime {
            self.sink.on_prime_found(outcome.candidate.value(), primes);
        }
        self.sink.on_progress(completed);

        state.settled.fetch_add(1, Ordering::SeqCst);
        self.finish_if_settled();
        true
    }

    /// Complete the run once all `bound` outcomes are settled. Emits
    /// `on_run_complete` exactly once. A zero bound completes immediately.
    pub fn finish_if_settled(&self) -> bool {
        let state = &self.state;
        if state.settled.load(Ordering::SeqCst) < state.bound {
            return false;
        }
        if !state.transition(RunStatus::Running, RunStatus::Completed) {
            return false;
        }
        let totals = state.snapshot();
        info!(
            run_id = %state.run_id,
            bound = state.bound,
            primes_found = totals.primes_found,
            candidates_completed = totals.candidates_completed,
            "run completed"
        );
        self.sink
            .on_run_complete(totals.primes_found, totals.candidates_completed);
        true
    }

    /// Adapt into the pool's report callback.
    pub fn into_report_fn(self: Arc<Self>) -> ReportFn {
        Arc::new(move |outcome: Outcome| self.report(outcome))
    }
}
