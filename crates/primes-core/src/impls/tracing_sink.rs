//! TracingSink - 通知をログに出すだけの sink

use tracing::{debug, error, info};

use crate::ports::ResultSink;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn on_prime_found(&self, candidate: u64, primes_so_far: u64) {
        debug!(candidate, primes_so_far, "prime found");
    }

    fn on_progress(&self, candidates_completed: u64) {
        debug!(candidates_completed, "progress");
    }

    fn on_invariant_violation(&self, primes_so_far: u64, completed_so_far: u64) {
        error!(primes_so_far, completed_so_far, "invariant violated");
    }

    fn on_run_complete(&self, total_primes: u64, total_processed: u64) {
        info!(total_primes, total_processed, "run complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{RunControllerBuilder, RunStatus};

    #[tokio::test]
    async fn drives_a_run_to_completion() {
        let controller = RunControllerBuilder::new()
            .sink(Arc::new(TracingSink))
            .build()
            .unwrap();
        let summary = controller.start(20).unwrap().wait().await;
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.primes_found, 8);
    }
}
