//! RunController - 1 回の run を組み立てて管理する
//!
//! # 状態遷移
//! Idle → Running → (Completed | Cancelled)
//!
//! # cancel-and-replace
//! Running 中の start() は前の run を cancel してから新しい run を始める。
//! 前の run の outcome が新しい RunState に混ざることはない
//! （run ごとに RunState と TaskPool を作り直すため）。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

use super::aggregator::{ResultAggregator, RunState};
use crate::config::EngineConfig;
use crate::domain::{Baseline, Candidate, PrimesError, RunId, RunStatus, RunSummary};
use crate::pool::TaskPool;
use crate::ports::ResultSink;
use crate::primality::CheckFn;

struct ActiveRun {
    aggregator: Arc<ResultAggregator>,
    pool: Option<TaskPool>,
}

impl ActiveRun {
    fn state(&self) -> &Arc<RunState> {
        self.aggregator.state()
    }
}

/// Orchestrates runs. One run is current at a time.
///
/// Workers are spawned on the runtime captured at build time, so `start` and
/// `cancel` may be called from any thread.
pub struct RunController {
    config: EngineConfig,
    sink: Arc<dyn ResultSink>,
    check: CheckFn,
    runtime: Handle,
    current: Mutex<Option<ActiveRun>>,
}

impl RunController {
    pub(crate) fn from_parts(
        config: EngineConfig,
        sink: Arc<dyn ResultSink>,
        check: CheckFn,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            sink,
            check,
            runtime,
            current: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin a run over candidates 1..=n. Returns without waiting for it.
    pub fn start(&self, n: i64) -> Result<RunHandle, PrimesError> {
        self.start_with_baseline(n, Baseline::zero())
    }

    /// Like `start`, with counters beginning at `baseline`.
    pub fn start_with_baseline(&self, n: i64, baseline: Baseline) -> Result<RunHandle, PrimesError> {
        let bound = self.validate_bound(n)?;
        let state = Arc::new(RunState::new(RunId::generate(), bound, baseline)?);
        let run_id = state.run_id();

        let mut current = self.lock();
        if let Some(previous) = current.take() {
            retire(&self.runtime, previous);
        }

        let aggregator = Arc::new(ResultAggregator::new(
            Arc::clone(&state),
            Arc::clone(&self.sink),
        ));

        let pool = if bound == 0 {
            None
        } else {
            let workers = usize::try_from(bound)
                .map_or(self.config.worker_count, |b| b.min(self.config.worker_count));
            let pool = TaskPool::spawn(
                &self.runtime,
                workers,
                Arc::clone(&self.check),
                Arc::clone(&aggregator).into_report_fn(),
            );
            pool.submit_all((1..=bound).map(Candidate::new))?;
            pool.close();
            Some(pool)
        };

        info!(
            %run_id,
            bound,
            workers = pool.as_ref().map_or(0, TaskPool::worker_count),
            baseline_primes = baseline.primes_found,
            baseline_completed = baseline.candidates_completed,
            "run started"
        );

        let handle = RunHandle::new(state);
        *current = Some(ActiveRun {
            aggregator: Arc::clone(&aggregator),
            pool,
        });
        drop(current);

        // sink callbacks run without the controller lock held
        if bound == 0 {
            aggregator.finish_if_settled();
        }
        Ok(handle)
    }

    /// Cancel the current run. Idempotent; a no-op unless a run is Running.
    ///
    /// When this returns the run's counters are final.
    pub fn cancel(&self) {
        let mut current = self.lock();
        let Some(run) = current.as_mut() else {
            debug!("cancel ignored: no run started");
            return;
        };
        if !run.state().cancel() {
            debug!(run_id = %run.state().run_id(), status = ?run.state().status(), "cancel ignored");
            return;
        }
        let counters = run.state().snapshot();
        info!(
            run_id = %run.state().run_id(),
            primes_found = counters.primes_found,
            candidates_completed = counters.candidates_completed,
            "run cancelled"
        );
        if let Some(pool) = run.pool.take() {
            drain_in_background(&self.runtime, run.state().run_id(), pool);
        }
    }

    /// Idle until the first start, then the status of the latest run.
    pub fn status(&self) -> RunStatus {
        self.lock()
            .as_ref()
            .map_or(RunStatus::Idle, |run| run.state().status())
    }

    /// Counters and status of the latest run.
    pub fn snapshot(&self) -> Option<RunSummary> {
        self.lock().as_ref().map(|run| run.state().summary())
    }

    fn validate_bound(&self, n: i64) -> Result<u64, PrimesError> {
        let bound = u64::try_from(n).map_err(|_| PrimesError::InvalidBound(n))?;
        if bound > self.config.max_bound {
            return Err(PrimesError::BoundTooLarge {
                bound,
                max: self.config.max_bound,
            });
        }
        Ok(bound)
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            retire(&self.runtime, run);
        }
    }
}

/// Take a superseded run out of service.
fn retire(runtime: &Handle, run: ActiveRun) {
    let run_id = run.state().run_id();
    if run.state().cancel() {
        info!(%run_id, "run superseded; cancelled");
    }
    if let Some(pool) = run.pool {
        drain_in_background(runtime, run_id, pool);
    }
}

/// Shut a pool down and log what it did once its workers exit.
fn drain_in_background(runtime: &Handle, run_id: RunId, pool: TaskPool) {
    pool.shutdown();
    runtime.spawn(async move {
        let stats = pool.join().await;
        debug!(
            %run_id,
            executed = stats.executed,
            discarded = stats.discarded,
            panicked = stats.panicked,
            "pool drained"
        );
    });
}

/// Handle to one run returned by `start`.
#[derive(Clone)]
pub struct RunHandle {
    state: Arc<RunState>,
    status_rx: watch::Receiver<RunStatus>,
}

impl RunHandle {
    fn new(state: Arc<RunState>) -> Self {
        let status_rx = state.subscribe();
        Self { state, status_rx }
    }

    pub fn run_id(&self) -> RunId {
        self.state.run_id()
    }

    pub fn status(&self) -> RunStatus {
        self.state.status()
    }

    pub fn summary(&self) -> RunSummary {
        self.state.summary()
    }

    /// Wait until the run is Completed or Cancelled.
    pub async fn wait(&mut self) -> RunSummary {
        // the sender lives in RunState, which this handle keeps alive
        let _ = self.status_rx.wait_for(RunStatus::is_terminal).await;
        self.state.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RunControllerBuilder;
    use crate::domain::ErrorKind;
    use crate::impls::RecordingSink;

    fn controller(workers: usize, max_bound: u64) -> (RunController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let controller = RunControllerBuilder::new()
            .config(
                EngineConfig::default()
                    .with_worker_count(workers)
                    .with_max_bound(max_bound),
            )
            .sink(sink.clone())
            .build()
            .unwrap();
        (controller, sink)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ten_has_four_primes() {
        let (controller, sink) = controller(4, 1_000);
        let mut handle = controller.start(10).unwrap();
        let summary = handle.wait().await;

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.primes_found, 4);
        assert_eq!(summary.candidates_completed, 10);
        let mut primes = sink.primes();
        primes.sort_unstable();
        assert_eq!(primes, vec![2, 3, 5, 7]);
        assert_eq!(controller.status(), RunStatus::Completed);
    }

    #[tokio::test]
    async fn negative_bound_is_rejected() {
        let (controller, _) = controller(4, 1_000);
        let err = controller.start(-1).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidBound);
        assert_eq!(controller.status(), RunStatus::Idle);
    }

    #[tokio::test]
    async fn bound_above_configured_max_is_rejected() {
        let (controller, _) = controller(4, 50);
        let err = controller.start(51).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::BoundTooLarge);
        assert!(controller.start(50).is_ok());
    }

    #[tokio::test]
    async fn rejected_start_leaves_current_run_alone() {
        let (controller, _) = controller(2, 100);
        let mut handle = controller.start(20).unwrap();
        assert!(controller.start(101).is_err());
        let summary = handle.wait().await;
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.candidates_completed, 20);
    }

    #[tokio::test]
    async fn zero_completes_without_workers() {
        let (controller, sink) = controller(4, 100);
        let mut handle = controller.start(0).unwrap();
        assert_eq!(handle.status(), RunStatus::Completed);
        let summary = handle.wait().await;
        assert_eq!(summary.candidates_completed, 0);
        assert_eq!(sink.completions(), vec![(0, 0)]);
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_no_op() {
        let (controller, sink) = controller(4, 100);
        controller.cancel();
        controller.cancel();
        assert_eq!(controller.status(), RunStatus::Idle);
        assert!(controller.snapshot().is_none());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn baseline_resumes_running_total() {
        let (controller, sink) = controller(2, 100);
        let first = controller.start(10).unwrap().wait().await;
        let baseline = Baseline::new(first.primes_found, first.candidates_completed);
        let second = controller
            .start_with_baseline(5, baseline)
            .unwrap()
            .wait()
            .await;

        assert_eq!(second.primes_found, 4 + 3);
        assert_eq!(second.candidates_completed, 15);
        assert_eq!(sink.completions(), vec![(4, 10), (7, 15)]);
    }

    #[tokio::test]
    async fn invalid_baseline_is_rejected() {
        let (controller, _) = controller(2, 100);
        let err = controller
            .start_with_baseline(5, Baseline::new(2, 1))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidBaseline);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dropping_the_controller_cancels_the_run() {
        let (controller, _) = controller(2, 1_000_000);
        let mut handle = controller.start(1_000_000).unwrap();
        drop(controller);
        let summary = handle.wait().await;
        assert_eq!(summary.status, RunStatus::Cancelled);
        assert!(summary.candidates_completed < 1_000_000);
    }

    /// Reads the controller's status from inside `on_run_complete`.
    #[derive(Default)]
    struct StatusReadingSink {
        controller: std::sync::OnceLock<std::sync::Weak<RunController>>,
        seen: Mutex<Vec<RunStatus>>,
    }

    impl ResultSink for StatusReadingSink {
        fn on_prime_found(&self, _candidate: u64, _primes_so_far: u64) {}
        fn on_progress(&self, _candidates_completed: u64) {}
        fn on_invariant_violation(&self, _primes_so_far: u64, _completed_so_far: u64) {}
        fn on_run_complete(&self, _total_primes: u64, _total_processed: u64) {
            if let Some(controller) = self.controller.get().and_then(std::sync::Weak::upgrade) {
                self.seen.lock().unwrap().push(controller.status());
            }
        }
    }

    #[test]
    fn completion_callback_may_read_status_for_zero_bound() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sink = Arc::new(StatusReadingSink::default());
        let controller = Arc::new(
            RunControllerBuilder::new()
                .sink(sink.clone())
                .runtime(runtime.handle().clone())
                .build()
                .unwrap(),
        );
        sink.controller.set(Arc::downgrade(&controller)).unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn({
            let controller = Arc::clone(&controller);
            move || {
                let started = controller.start(0).map(|h| h.status());
                let _ = done_tx.send(started);
            }
        });

        let started = done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("start(0) did not return");
        assert_eq!(started.unwrap(), RunStatus::Completed);
        assert_eq!(*sink.seen.lock().unwrap(), vec![RunStatus::Completed]);
    }
}
