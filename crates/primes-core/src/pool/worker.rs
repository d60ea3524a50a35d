use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{trace, warn};

use super::queue::CandidateQueue;
use super::ReportFn;
use crate::domain::{Candidate, Outcome};
use crate::observability::PoolCounters;
use crate::primality::CheckFn;

/// Everything a worker shares with its siblings.
pub(crate) struct WorkerShared {
    pub(crate) queue: Arc<CandidateQueue>,
    pub(crate) check: CheckFn,
    pub(crate) report: ReportFn,
    pub(crate) counters: Arc<PoolCounters>,
}

pub(crate) async fn worker_loop(
    worker_id: usize,
    shared: Arc<WorkerShared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        let next = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // sender dropped: the pool handle is gone
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = shared.queue.next() => next,
        };

        // closed and drained
        let Some(candidate) = next else {
            break;
        };

        let outcome = run_check(worker_id, &shared, candidate);

        // safe point: a cancelled pool never reports
        if *shutdown_rx.borrow() {
            trace!(worker_id, %candidate, "discarding outcome after shutdown");
            shared.counters.discarded(1);
            break;
        }

        if (shared.report)(outcome) {
            shared.counters.executed();
        } else {
            shared.counters.discarded(1);
        }

        // one check runs without suspension; let siblings and timers in between checks
        tokio::task::yield_now().await;
    }
    trace!(worker_id, "worker exited");
}

/// Run the check at the task boundary. A panic becomes a not-prime outcome.
fn run_check(worker_id: usize, shared: &WorkerShared, candidate: Candidate) -> Outcome {
    let check = &shared.check;
    match panic::catch_unwind(AssertUnwindSafe(|| check(candidate.value()))) {
        Ok(true) => Outcome::prime(candidate),
        Ok(false) => Outcome::composite(candidate),
        Err(payload) => {
            shared.counters.panicked();
            warn!(
                worker_id,
                %candidate,
                panic = %panic_message(payload.as_ref()),
                "primality check panicked; treating candidate as not prime"
            );
            Outcome::composite(candidate)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_with(check: CheckFn) -> WorkerShared {
        WorkerShared {
            queue: Arc::new(CandidateQueue::new()),
            check,
            report: Arc::new(|_: Outcome| true),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    #[test]
    fn run_check_maps_result() {
        let shared = shared_with(crate::primality::trial_division());
        assert!(run_check(0, &shared, Candidate::new(5)).is_prime);
        assert!(!run_check(0, &shared, Candidate::new(6)).is_prime);
        assert_eq!(shared.counters.snapshot().panicked, 0);
    }

    #[test]
    fn panicking_check_is_not_prime() {
        let shared = shared_with(Arc::new(|k: u64| {
            if k == 7 {
                panic!("boom on {k}");
            }
            true
        }));
        let outcome = run_check(3, &shared, Candidate::new(7));
        assert_eq!(outcome, Outcome::composite(Candidate::new(7)));
        assert_eq!(shared.counters.snapshot().panicked, 1);
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
