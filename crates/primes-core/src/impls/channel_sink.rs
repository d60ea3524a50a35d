//! ChannelSink - 通知を tokio の channel に流す sink
//!
//! presentation layer 側は receiver から `SinkEvent` を受け取って描画する。
//! worker を止めないように unbounded channel を使う。

use tokio::sync::mpsc;

use crate::ports::{ResultSink, SinkEvent};

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        // ignore send error: the receiver may already be dropped
        let _ = self.tx.send(event);
    }
}

impl ResultSink for ChannelSink {
    fn on_prime_found(&self, candidate: u64, primes_so_far: u64) {
        self.send(SinkEvent::PrimeFound {
            candidate,
            primes_so_far,
        });
    }

    fn on_progress(&self, candidates_completed: u64) {
        self.send(SinkEvent::Progress {
            candidates_completed,
        });
    }

    fn on_invariant_violation(&self, primes_so_far: u64, completed_so_far: u64) {
        self.send(SinkEvent::InvariantViolation {
            primes_so_far,
            completed_so_far,
        });
    }

    fn on_run_complete(&self, total_primes: u64, total_processed: u64) {
        self.send(SinkEvent::RunComplete {
            total_primes,
            total_processed,
        });
    }
}
