//! The back-pressure semaphore itself.

use crate::config::{BackPressureConfig, OverflowStrategy, WaiterPriority};
use crate::error::{BackPressureError, Result};
use crate::events::BackPressureEvent;
use crate::token::SemaphoreToken;
use crate::waiter::{WaiterEntry, WaiterQueue};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

struct State {
    held_permits: usize,
    held_bytes: u64,
    queued_bytes: u64,
    waiters: WaiterQueue,
}

impl State {
    fn fast_path_fits(&self, config: &BackPressureConfig, bytes: u64) -> bool {
        let outstanding = self.held_permits + self.waiters.len();
        self.held_permits < config.max_concurrency
            && outstanding < config.max_outstanding
            && match config.max_queue_memory {
                Some(max) => self.held_bytes + self.queued_bytes + bytes <= max,
                None => true,
            }
    }

    fn has_queue_room(&self, config: &BackPressureConfig) -> bool {
        self.held_permits + self.waiters.len() < config.max_outstanding
    }
}

pub(crate) struct Inner {
    state: Mutex<State>,
    config: BackPressureConfig,
}

impl Inner {
    pub(crate) fn release(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.held_permits = state.held_permits.saturating_sub(1);
        state.held_bytes = state.held_bytes.saturating_sub(bytes);

        let mut bytes_budget = |held_bytes: u64| {
            self.config
                .max_queue_memory
                .map(|max| max.saturating_sub(held_bytes))
                .unwrap_or(u64::MAX)
        };

        while state.held_permits < self.config.max_concurrency {
            let budget = bytes_budget(state.held_bytes);
            let Some(waiter) = state.waiters.pop_best_fit(budget) else {
                break;
            };
            state.held_permits += 1;
            state.held_bytes += waiter.bytes;
            state.queued_bytes = state.queued_bytes.saturating_sub(waiter.bytes);
            waiter.mark_granted();
        }

        self.emit(BackPressureEvent::PermitReleased {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            held: state.held_permits,
        });

        #[cfg(feature = "metrics")]
        gauge!("backpressure_held_permits", "backpressure" => self.config.name.clone())
            .set(state.held_permits as f64);
    }

    fn emit(&self, event: BackPressureEvent) {
        self.config.event_listeners.emit(&event);
    }
}

/// Admission control over three budgets — held permits, held-plus-queued
/// outstanding callers, and (optionally) a memory budget shared by held and
/// queued callers — with a priority-then-FIFO wait queue for callers that
/// can't be admitted immediately.
#[derive(Clone)]
pub struct BackPressureSemaphore {
    inner: Arc<Inner>,
}

impl BackPressureSemaphore {
    /// Creates a new semaphore from the given configuration.
    pub fn new(config: BackPressureConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    held_permits: 0,
                    held_bytes: 0,
                    queued_bytes: 0,
                    waiters: WaiterQueue::new(),
                }),
                config,
            }),
        }
    }

    /// Attempts to acquire a permit without waiting. Returns `None` if the
    /// fast path does not immediately succeed; the caller may then fall
    /// back to [`Self::acquire`] or treat the absence as a rejection.
    pub fn try_acquire(&self, bytes: u64) -> Option<SemaphoreToken> {
        let mut state = self.inner.state.lock();
        if state.fast_path_fits(&self.inner.config, bytes) {
            state.held_permits += 1;
            state.held_bytes += bytes;
            let held = state.held_permits;
            let queued = state.waiters.len();
            drop(state);
            self.inner.emit(BackPressureEvent::PermitGranted {
                pattern_name: self.inner.config.name.clone(),
                timestamp: Instant::now(),
                held,
                queued,
            });
            #[cfg(feature = "metrics")]
            {
                counter!("backpressure_permits_granted_total", "backpressure" => self.inner.config.name.clone())
                    .increment(1);
                gauge!("backpressure_held_permits", "backpressure" => self.inner.config.name.clone())
                    .set(held as f64);
            }
            Some(SemaphoreToken::new(
                Arc::clone(&self.inner),
                bytes,
                WaiterPriority::Normal,
            ))
        } else {
            None
        }
    }

    /// Acquires a permit, suspending per the configured
    /// [`OverflowStrategy`] if the fast path doesn't immediately succeed.
    pub async fn acquire(&self, bytes: u64, priority: WaiterPriority) -> Result<SemaphoreToken> {
        self.acquire_internal(bytes, priority, None).await
    }

    /// Acquires a permit, suspending up to `timeout` regardless of the
    /// configured strategy (`Error` without a timeout behaves as an
    /// immediate rejection; every other strategy gains a deadline).
    pub async fn acquire_with_timeout(
        &self,
        bytes: u64,
        timeout: Duration,
        priority: WaiterPriority,
    ) -> Result<SemaphoreToken> {
        self.acquire_internal(bytes, priority, Some(timeout)).await
    }

    async fn acquire_internal(
        &self,
        bytes: u64,
        priority: WaiterPriority,
        timeout: Option<Duration>,
    ) -> Result<SemaphoreToken> {
        if let Some(token) = self.try_acquire(bytes) {
            return Ok(SemaphoreToken::new(
                Arc::clone(&self.inner),
                token.bytes(),
                priority,
            ));
        }

        match self.inner.config.strategy {
            OverflowStrategy::DropNewest => {
                self.reject("queue_full");
                Err(BackPressureError::QueueFull)
            }
            OverflowStrategy::Error if timeout.is_none() => {
                self.reject("queue_full");
                Err(BackPressureError::QueueFull)
            }
            OverflowStrategy::DropOldest => {
                let waiter = {
                    let mut state = self.inner.state.lock();
                    if !state.has_queue_room(&self.inner.config) {
                        if let Some(evicted) = state.waiters.evict_lowest_oldest() {
                            state.queued_bytes = state.queued_bytes.saturating_sub(evicted.bytes);
                            evicted.mark_cancelled();
                        }
                    }
                    let waiter = WaiterEntry::new(priority, bytes);
                    state.waiters.push(Arc::clone(&waiter));
                    state.queued_bytes += bytes;
                    waiter
                };
                self.emit_enqueued();
                self.wait_for_waiter(waiter, timeout).await
            }
            OverflowStrategy::Suspend | OverflowStrategy::Error => {
                let waiter = {
                    let mut state = self.inner.state.lock();
                    if !state.has_queue_room(&self.inner.config) {
                        self.reject("queue_full");
                        return Err(BackPressureError::QueueFull);
                    }
                    let waiter = WaiterEntry::new(priority, bytes);
                    state.waiters.push(Arc::clone(&waiter));
                    state.queued_bytes += bytes;
                    waiter
                };
                self.emit_enqueued();
                self.wait_for_waiter(waiter, timeout).await
            }
        }
    }

    async fn wait_for_waiter(
        &self,
        waiter: Arc<WaiterEntry>,
        timeout: Option<Duration>,
    ) -> Result<SemaphoreToken> {
        let enqueued_at = waiter.enqueued_at;
        let notified = waiter.notify.notified();

        let outcome = match timeout {
            Some(duration) => tokio::time::timeout(duration, notified).await,
            None => Ok(notified.await),
        };

        match outcome {
            Ok(()) if waiter.is_granted() => {
                let wait_time = enqueued_at.elapsed();
                self.inner.emit(BackPressureEvent::WaiterGranted {
                    pattern_name: self.inner.config.name.clone(),
                    timestamp: Instant::now(),
                    wait_time,
                });
                Ok(SemaphoreToken::new(
                    Arc::clone(&self.inner),
                    waiter.bytes,
                    waiter.priority,
                ))
            }
            Ok(()) => {
                self.inner.emit(BackPressureEvent::WaiterEvicted {
                    pattern_name: self.inner.config.name.clone(),
                    timestamp: Instant::now(),
                    queued_for: enqueued_at.elapsed(),
                });
                Err(BackPressureError::Cancelled)
            }
            Err(_elapsed) => {
                waiter.mark_cancelled();
                {
                    let mut state = self.inner.state.lock();
                    state.queued_bytes = state.queued_bytes.saturating_sub(waiter.bytes);
                    state.waiters.sweep_cancelled();
                }
                let duration = timeout.unwrap_or_default();
                self.inner.emit(BackPressureEvent::WaiterTimedOut {
                    pattern_name: self.inner.config.name.clone(),
                    timestamp: Instant::now(),
                    timeout: duration,
                });
                Err(BackPressureError::Timeout(duration))
            }
        }
    }

    fn reject(&self, reason: &'static str) {
        self.inner.emit(BackPressureEvent::Rejected {
            pattern_name: self.inner.config.name.clone(),
            timestamp: Instant::now(),
            reason,
        });
        #[cfg(feature = "metrics")]
        counter!("backpressure_rejections_total", "backpressure" => self.inner.config.name.clone())
            .increment(1);
    }

    fn emit_enqueued(&self) {
        let queue_len = self.inner.state.lock().waiters.len();
        self.inner.emit(BackPressureEvent::Enqueued {
            pattern_name: self.inner.config.name.clone(),
            timestamp: Instant::now(),
            queue_len,
        });
    }

    /// Current snapshot statistics.
    pub fn stats(&self) -> BackPressureStats {
        let state = self.inner.state.lock();
        BackPressureStats {
            held_permits: state.held_permits,
            queued_waiters: state.waiters.len(),
            held_bytes: state.held_bytes,
            queued_bytes: state.queued_bytes,
            max_concurrency: self.inner.config.max_concurrency,
            max_outstanding: self.inner.config.max_outstanding,
        }
    }

    /// Returns `true` if the semaphore currently has headroom to admit a
    /// zero-byte caller on the fast path (a lightweight health signal).
    pub fn has_capacity(&self) -> bool {
        self.inner.state.lock().fast_path_fits(&self.inner.config, 0)
    }
}

/// A snapshot of a [`BackPressureSemaphore`]'s current load.
#[derive(Debug, Clone, Copy)]
pub struct BackPressureStats {
    /// Permits currently held.
    pub held_permits: usize,
    /// Callers currently queued.
    pub queued_waiters: usize,
    /// Bytes currently debited by held callers.
    pub held_bytes: u64,
    /// Bytes currently debited by queued callers.
    pub queued_bytes: u64,
    /// The configured concurrency budget.
    pub max_concurrency: usize,
    /// The configured outstanding (held + queued) budget.
    pub max_outstanding: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn config(max_concurrency: usize, max_outstanding: usize, strategy: OverflowStrategy) -> BackPressureConfig {
        BackPressureConfig::builder()
            .max_concurrency(max_concurrency)
            .max_outstanding(max_outstanding)
            .strategy(strategy)
            .build()
    }

    #[tokio::test]
    async fn fast_path_grants_within_concurrency_limit() {
        let sem = BackPressureSemaphore::new(config(2, 10, OverflowStrategy::Suspend));
        let t1 = sem.try_acquire(0).unwrap();
        let t2 = sem.try_acquire(0).unwrap();
        assert!(sem.try_acquire(0).is_none());
        drop(t1);
        drop(t2);
    }

    #[tokio::test]
    async fn release_wakes_a_suspended_waiter() {
        let sem = BackPressureSemaphore::new(config(1, 10, OverflowStrategy::Suspend));
        let first = sem.try_acquire(0).unwrap();

        let sem2 = sem.clone();
        let waiter = tokio::spawn(async move { sem2.acquire(0, WaiterPriority::Normal).await });

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        drop(first);

        let token = waiter.await.unwrap().unwrap();
        assert_eq!(sem.stats().held_permits, 1);
        drop(token);
        assert_eq!(sem.stats().held_permits, 0);
    }

    #[tokio::test]
    async fn higher_priority_waiter_is_served_first() {
        let sem = BackPressureSemaphore::new(config(1, 10, OverflowStrategy::Suspend));
        let first = sem.try_acquire(0).unwrap();

        let sem_low = sem.clone();
        let low = tokio::spawn(async move { sem_low.acquire(0, WaiterPriority::Low).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        let sem_high = sem.clone();
        let high = tokio::spawn(async move { sem_high.acquire(0, WaiterPriority::Critical).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        drop(first);

        let high_token = high.await.unwrap();
        assert!(high_token.is_ok());

        drop(high_token.unwrap());
        let low_token = low.await.unwrap();
        assert!(low_token.is_ok());
    }

    #[tokio::test]
    async fn drop_newest_rejects_when_full() {
        let sem = BackPressureSemaphore::new(config(1, 1, OverflowStrategy::DropNewest));
        let _first = sem.try_acquire(0).unwrap();
        let result = sem.acquire(0, WaiterPriority::Normal).await;
        assert!(matches!(result, Err(BackPressureError::QueueFull)));
    }

    #[tokio::test]
    async fn error_strategy_without_timeout_rejects_immediately() {
        let sem = BackPressureSemaphore::new(config(1, 10, OverflowStrategy::Error));
        let _first = sem.try_acquire(0).unwrap();
        let result = sem.acquire(0, WaiterPriority::Normal).await;
        assert!(matches!(result, Err(BackPressureError::QueueFull)));
    }

    #[tokio::test]
    async fn acquire_with_timeout_expires() {
        let sem = BackPressureSemaphore::new(config(1, 10, OverflowStrategy::Suspend));
        let _first = sem.try_acquire(0).unwrap();
        let result = sem
            .acquire_with_timeout(0, StdDuration::from_millis(20), WaiterPriority::Normal)
            .await;
        assert!(matches!(result, Err(BackPressureError::Timeout(_))));
    }

    #[tokio::test]
    async fn drop_oldest_evicts_lower_priority_waiter() {
        let sem = BackPressureSemaphore::new(config(1, 2, OverflowStrategy::DropOldest));
        let _first = sem.try_acquire(0).unwrap();

        let sem_low = sem.clone();
        let low = tokio::spawn(async move { sem_low.acquire(0, WaiterPriority::Low).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        let high_result = sem.acquire(0, WaiterPriority::High).await;
        assert!(high_result.is_ok());

        let low_result = low.await.unwrap();
        assert!(matches!(low_result, Err(BackPressureError::Cancelled)));
    }

    #[tokio::test]
    async fn memory_budget_is_enforced_on_fast_path() {
        let config = BackPressureConfig::builder()
            .max_concurrency(10)
            .max_outstanding(10)
            .max_queue_memory(Some(100))
            .strategy(OverflowStrategy::DropNewest)
            .build();
        let sem = BackPressureSemaphore::new(config);
        let _t1 = sem.try_acquire(60).unwrap();
        assert!(sem.try_acquire(60).is_none());
        assert!(sem.try_acquire(40).is_some());
    }
}
