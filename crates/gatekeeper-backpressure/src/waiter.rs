//! The priority-then-FIFO wait queue backing [`crate::BackPressureSemaphore`].

use crate::config::WaiterPriority;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

/// A suspended acquisition attempt.
pub(crate) struct WaiterEntry {
    pub(crate) priority: WaiterPriority,
    pub(crate) bytes: u64,
    pub(crate) enqueued_at: Instant,
    pub(crate) notify: Notify,
    /// Set by the queue owner before notifying, when this waiter has been
    /// evicted (e.g. by `DropOldest`) rather than granted.
    pub(crate) cancelled: AtomicBool,
    /// Set by the queue owner before notifying, when budget has already
    /// been debited on this waiter's behalf.
    pub(crate) granted: AtomicBool,
}

impl WaiterEntry {
    pub(crate) fn new(priority: WaiterPriority, bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            priority,
            bytes,
            enqueued_at: Instant::now(),
            notify: Notify::new(),
            cancelled: AtomicBool::new(false),
            granted: AtomicBool::new(false),
        })
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub(crate) fn mark_granted(&self) {
        self.granted.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

/// Four FIFO tiers, one per [`WaiterPriority`]; `pop_best_fit` and
/// `evict_lowest_oldest` both scan tiers highest-to-lowest or
/// lowest-to-highest respectively, giving priority-then-FIFO ordering
/// without a heap.
#[derive(Default)]
pub(crate) struct WaiterQueue {
    tiers: [VecDeque<Arc<WaiterEntry>>; 4],
    len: usize,
}

impl WaiterQueue {
    pub(crate) fn new() -> Self {
        Self {
            tiers: Default::default(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn push(&mut self, waiter: Arc<WaiterEntry>) {
        self.tiers[waiter.priority as usize].push_back(waiter);
        self.len += 1;
    }

    /// Removes and returns the first waiter (highest priority, oldest
    /// enqueued within that tier) whose byte requirement fits within
    /// `bytes_available`, skipping tiers with none (cancelled entries are
    /// swept out as encountered).
    pub(crate) fn pop_best_fit(&mut self, bytes_available: u64) -> Option<Arc<WaiterEntry>> {
        for tier in self.tiers.iter_mut().rev() {
            loop {
                match tier.front() {
                    Some(candidate) if candidate.is_cancelled() => {
                        tier.pop_front();
                        self.len -= 1;
                        continue;
                    }
                    Some(candidate) if candidate.bytes <= bytes_available => {
                        let waiter = tier.pop_front().unwrap();
                        self.len -= 1;
                        return Some(waiter);
                    }
                    _ => break,
                }
            }
        }
        None
    }

    /// Evicts the globally lowest-priority, oldest-enqueued live waiter, to
    /// make room under `DropOldest`. Returns the evicted waiter so the
    /// caller can mark it cancelled and notify it.
    pub(crate) fn evict_lowest_oldest(&mut self) -> Option<Arc<WaiterEntry>> {
        for tier in self.tiers.iter_mut() {
            while let Some(candidate) = tier.front() {
                if candidate.is_cancelled() {
                    tier.pop_front();
                    self.len -= 1;
                    continue;
                }
                let waiter = tier.pop_front().unwrap();
                self.len -= 1;
                return Some(waiter);
            }
        }
        None
    }

    /// Sweeps every tier of cancelled entries, bounding queue growth from
    /// waiters that timed out or were evicted but never popped.
    pub(crate) fn sweep_cancelled(&mut self) {
        for tier in self.tiers.iter_mut() {
            let before = tier.len();
            tier.retain(|w| !w.is_cancelled());
            self.len -= before - tier.len();
        }
    }
}
