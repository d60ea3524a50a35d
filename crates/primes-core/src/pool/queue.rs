//! CandidateQueue - worker 間で共有する未処理 candidate のキュー
//!
//! # 実装詳細
//! - VecDeque を std の Mutex で保護（ロックは await を跨がない）
//! - push 時に Notify で待機中の worker を起こす
//! - close 後の push は PoolClosed

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::domain::{Candidate, PrimesError};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Candidate>,
    closed: bool,
}

/// Result of a non-waiting pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pop {
    Ready(Candidate),
    Empty,
    Closed,
}

/// Unbounded FIFO of candidates. Pushing never blocks.
#[derive(Default)]
pub(crate) struct CandidateQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl CandidateQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, candidate: Candidate) -> Result<(), PrimesError> {
        {
            let mut state = self.guard();
            if state.closed {
                return Err(PrimesError::PoolClosed);
            }
            state.pending.push_back(candidate);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Push a batch under a single lock. Returns how many were queued.
    pub(crate) fn push_all(
        &self,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<usize, PrimesError> {
        let added = {
            let mut state = self.guard();
            if state.closed {
                return Err(PrimesError::PoolClosed);
            }
            let before = state.pending.len();
            state.pending.extend(candidates);
            state.pending.len() - before
        };
        self.notify.notify_waiters();
        Ok(added)
    }

    pub(crate) fn pop(&self) -> Pop {
        let mut state = self.guard();
        match state.pending.pop_front() {
            Some(candidate) => Pop::Ready(candidate),
            None if state.closed => Pop::Closed,
            None => Pop::Empty,
        }
    }

    /// Wait for the next candidate. `None` once the queue is closed and empty.
    ///
    /// Cancel-safe: a candidate is only taken in the same poll that returns it.
    pub(crate) async fn next(&self) -> Option<Candidate> {
        loop {
            // register before checking so a push between pop() and await is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.pop() {
                Pop::Ready(candidate) => return Some(candidate),
                Pop::Closed => return None,
                Pop::Empty => notified.await,
            }
        }
    }

    /// Stop accepting pushes. Already queued candidates stay.
    pub(crate) fn close(&self) {
        self.guard().closed = true;
        self.notify.notify_waiters();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.guard().closed
    }

    /// Close and throw away everything still queued. Returns the number dropped.
    pub(crate) fn discard_pending(&self) -> usize {
        let dropped = {
            let mut state = self.guard();
            state.closed = true;
            let n = state.pending.len();
            state.pending.clear();
            n
        };
        self.notify.notify_waiters();
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.guard().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn c(v: u64) -> Candidate {
        Candidate::new(v)
    }

    #[test]
    fn fifo_order() {
        let queue = CandidateQueue::new();
        queue.push(c(1)).unwrap();
        queue.push_all([c(2), c(3)]).unwrap();
        assert_eq!(queue.pop(), Pop::Ready(c(1)));
        assert_eq!(queue.pop(), Pop::Ready(c(2)));
        assert_eq!(queue.pop(), Pop::Ready(c(3)));
        assert_eq!(queue.pop(), Pop::Empty);
    }

    #[test]
    fn push_after_close_fails() {
        let queue = CandidateQueue::new();
        queue.close();
        assert!(matches!(queue.push(c(1)), Err(PrimesError::PoolClosed)));
        assert!(matches!(
            queue.push_all([c(1)]),
            Err(PrimesError::PoolClosed)
        ));
    }

    #[test]
    fn closed_queue_still_drains() {
        let queue = CandidateQueue::new();
        queue.push_all((1..=2).map(c)).unwrap();
        queue.close();
        assert_eq!(queue.pop(), Pop::Ready(c(1)));
        assert_eq!(queue.pop(), Pop::Ready(c(2)));
        assert_eq!(queue.pop(), Pop::Closed);
    }

    #[test]
    fn discard_pending_counts_dropped() {
        let queue = CandidateQueue::new();
        assert_eq!(queue.push_all((1..=5).map(c)).unwrap(), 5);
        assert_eq!(queue.discard_pending(), 5);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn push_wakes_waiting_next() {
        let queue = Arc::new(CandidateQueue::new());
        let waiter = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.next().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.push(c(42)).unwrap();

        assert_eq!(waiter.await.unwrap(), Some(c(42)));
    }

    #[tokio::test]
    async fn close_wakes_waiting_next() {
        let queue = Arc::new(CandidateQueue::new());
        let waiter = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.next().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.close();

        assert_eq!(waiter.await.unwrap(), None);
    }
}
