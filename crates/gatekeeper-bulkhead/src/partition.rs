//! A single partition's concurrency budget.

use crate::config::PartitionLimits;
use crate::error::BulkheadError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One partition's semaphore-backed concurrency budget.
///
/// Wraps a [`tokio::sync::Semaphore`], which is already FIFO for queued
/// acquisitions, so the partition only needs to track how many callers are
/// currently queued against `queue_size`.
pub(crate) struct Partition {
    pub(crate) key: String,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) limits: PartitionLimits,
    queued: AtomicUsize,
}

impl Partition {
    pub(crate) fn new(key: impl Into<String>, limits: PartitionLimits) -> Self {
        Self {
            key: key.into(),
            semaphore: Arc::new(Semaphore::new(limits.capacity)),
            limits,
            queued: AtomicUsize::new(0),
        }
    }

    pub(crate) fn in_use(&self) -> usize {
        self.limits
            .capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    pub(crate) fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Attempts to acquire a permit without waiting.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().ok()
    }

    /// Whether this partition has at least `required` permits free, the
    /// headroom test a lender must pass before a borrower can draw from it.
    pub(crate) fn has_headroom(&self, required: usize) -> bool {
        self.available() >= required
    }

    /// Enqueues and waits for a permit, honoring `queue_size` and
    /// `queue_timeout`.
    pub(crate) async fn acquire_queued(
        self: &Arc<Self>,
    ) -> Result<OwnedSemaphorePermit, BulkheadError> {
        loop {
            let current = self.queued.load(Ordering::SeqCst);
            if current >= self.limits.queue_size {
                return Err(BulkheadError::Full {
                    partition: self.key.clone(),
                    capacity: self.limits.capacity,
                });
            }
            if self
                .queued
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        let started = Instant::now();
        let semaphore = Arc::clone(&self.semaphore);
        let result = match self.limits.queue_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, semaphore.acquire_owned()).await
            {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_)) => Err(BulkheadError::Full {
                    partition: self.key.clone(),
                    capacity: self.limits.capacity,
                }),
                Err(_) => Err(BulkheadError::Timeout {
                    partition: self.key.clone(),
                    queued_for: started.elapsed(),
                }),
            },
            None => semaphore.acquire_owned().await.map_err(|_| BulkheadError::Full {
                partition: self.key.clone(),
                capacity: self.limits.capacity,
            }),
        };

        self.queued.fetch_sub(1, Ordering::SeqCst);
        result
    }

    pub(crate) fn queued_count(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

pub(crate) fn headroom_requirement(capacity: usize, max_borrow_percentage: f64) -> usize {
    ((capacity as f64) * max_borrow_percentage).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn try_acquire_succeeds_within_capacity() {
        let partition = Arc::new(Partition::new("p", PartitionLimits::new(2)));
        let a = partition.try_acquire();
        let b = partition.try_acquire();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(partition.try_acquire().is_none());
    }

    #[test]
    fn headroom_requirement_rounds_up() {
        assert_eq!(headroom_requirement(10, 0.3), 3);
        assert_eq!(headroom_requirement(3, 0.5), 2);
    }

    #[tokio::test]
    async fn acquire_queued_rejects_past_queue_size() {
        let partition = Arc::new(Partition::new("p", PartitionLimits::new(1).queue_size(0)));
        let _held = partition.try_acquire().unwrap();
        let err = partition.acquire_queued().await.unwrap_err();
        assert!(matches!(err, BulkheadError::Full { .. }));
    }

    #[tokio::test]
    async fn acquire_queued_times_out() {
        let partition = Arc::new(
            Partition::new("p", PartitionLimits::new(1))
                .with_queue(1, Some(Duration::from_millis(20))),
        );
        let _held = partition.try_acquire().unwrap();
        let err = partition.acquire_queued().await.unwrap_err();
        assert!(matches!(err, BulkheadError::Timeout { .. }));
    }

    impl Partition {
        fn with_queue(mut self, size: usize, timeout: Option<Duration>) -> Self {
            self.limits.queue_size = size;
            self.limits.queue_timeout = timeout;
            self
        }
    }
}
