//! TaskPool - 固定数の worker で candidate を並行にチェックする
//!
//! # フロー
//! 1. `spawn()` で W 本の worker を起動（全員が同じ CandidateQueue を見る）
//! 2. `submit()` / `submit_all()` で candidate を投入（block しない）
//! 3. worker は check を実行し、shutdown されていなければ report に渡す
//! 4. `close()` なら残りを処理して終了、`shutdown()` なら残りは捨てる
//! 5. `join()` で全 worker の終了を待ち、PoolStats を返す

mod queue;
mod worker;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use self::queue::CandidateQueue;
use self::worker::{WorkerShared, worker_loop};
use crate::domain::{Candidate, Outcome, PrimesError};
use crate::observability::{PoolCounters, PoolStats};
use crate::primality::CheckFn;

/// Receives each outcome. Returns false when the outcome was not accepted.
pub type ReportFn = Arc<dyn Fn(Outcome) -> bool + Send + Sync>;

/// Pool handle.
/// - drop すると worker 全体が止まる（未処理分は捨てられる）
/// - `join()` で全 worker の終了を待てる
pub struct TaskPool {
    queue: Arc<CandidateQueue>,
    counters: Arc<PoolCounters>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Spawn `workers` workers (at least one) on `runtime`.
    ///
    /// `workers` caps how many checks run at once. The checks share the
    /// runtime's threads, so a pool meant to stay out of the way of timers
    /// and signals should get a runtime of its own.
    pub fn spawn(runtime: &Handle, workers: usize, check: CheckFn, report: ReportFn) -> Self {
        let workers = workers.max(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = Arc::new(CandidateQueue::new());
        let counters = Arc::new(PoolCounters::default());
        let shared = Arc::new(WorkerShared {
            queue: Arc::clone(&queue),
            check,
            report,
            counters: Arc::clone(&counters),
        });

        let joins = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                let rx = shutdown_rx.clone();
                runtime.spawn(worker_loop(worker_id, shared, rx))
            })
            .collect();

        Self {
            queue,
            counters,
            shutdown_tx,
            joins,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.joins.len()
    }

    /// Enqueue one candidate. Never blocks.
    pub fn submit(&self, candidate: Candidate) -> Result<(), PrimesError> {
        self.queue.push(candidate)
    }

    /// Enqueue a batch. Returns how many were accepted.
    pub fn submit_all(
        &self,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<usize, PrimesError> {
        self.queue.push_all(candidates)
    }

    /// Stop accepting submissions; workers finish what is queued and exit.
    pub fn close(&self) {
        self.queue.close();
    }

    /// Stop accepting submissions and cancel everything not yet reported.
    ///
    /// In-flight checks run to completion but their outcomes are dropped.
    pub fn shutdown(&self) {
        let dropped = self.queue.discard_pending();
        self.counters.discarded(dropped as u64);
        // send_replace: the flag must stick even when every worker already exited
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Candidates queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Wait until every accepted candidate was reported or discarded.
    ///
    /// Call `close()` or `shutdown()` first, otherwise idle workers keep
    /// waiting for more submissions.
    pub async fn join(self) -> PoolStats {
        let Self {
            queue,
            counters,
            shutdown_tx,
            joins,
        } = self;
        for join in joins {
            if let Err(e) = join.await {
                warn!(error = %e, "worker task failed");
            }
        }
        counters.discarded(queue.discard_pending() as u64);
        drop(shutdown_tx);
        counters.snapshot()
    }

    pub async fn shutdown_and_join(self) -> PoolStats {
        self.shutdown();
        self.join().await
    }
}
