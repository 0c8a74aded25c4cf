//! Configuration for the back-pressure semaphore.

use crate::events::BackPressureEvent;
use gatekeeper_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Relative priority of a caller waiting for a permit.
///
/// Higher variants are served first; ties are broken by enqueue order
/// (FIFO within a tier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WaiterPriority {
    /// Lowest priority; served only once nothing else is waiting.
    Low = 0,
    /// The default priority for callers that don't specify one.
    Normal = 1,
    /// Served ahead of `Normal` and `Low` waiters.
    High = 2,
    /// Served ahead of every other tier.
    Critical = 3,
}

impl Default for WaiterPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// What happens when a caller cannot be granted a permit immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Enqueue the caller and suspend until a permit frees up, it is
    /// cancelled, or (if a timeout was supplied to the call) it expires.
    Suspend,
    /// Evict the lowest-priority, oldest-enqueued waiter to make room,
    /// then enqueue the new caller.
    DropOldest,
    /// Reject the new caller immediately rather than queueing it.
    DropNewest,
    /// Reject immediately with `BackPressure.queueFull`, or, if a timeout
    /// is supplied, behave like `Suspend` but resume with a timeout error
    /// on expiry instead of waiting forever.
    Error,
}

/// Configuration for a [`crate::BackPressureSemaphore`].
#[derive(Clone)]
pub struct BackPressureConfig {
    pub(crate) max_concurrency: usize,
    pub(crate) max_outstanding: usize,
    pub(crate) max_queue_memory: Option<u64>,
    pub(crate) strategy: OverflowStrategy,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BackPressureEvent>,
}

impl BackPressureConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BackPressureConfigBuilder {
        BackPressureConfigBuilder::new()
    }
}

/// Builder for [`BackPressureConfig`].
pub struct BackPressureConfigBuilder {
    max_concurrency: usize,
    max_outstanding: usize,
    max_queue_memory: Option<u64>,
    strategy: OverflowStrategy,
    name: String,
    event_listeners: EventListeners<BackPressureEvent>,
}

impl BackPressureConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrency: 32,
            max_outstanding: 256,
            max_queue_memory: None,
            strategy: OverflowStrategy::Suspend,
            name: "backpressure".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of concurrently held permits.
    ///
    /// Default: 32
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the maximum of held-plus-queued callers (`H + Q`).
    ///
    /// Default: 256
    pub fn max_outstanding(mut self, max: usize) -> Self {
        self.max_outstanding = max;
        self
    }

    /// Sets a byte budget across held-plus-queued permits. `None` disables
    /// memory accounting.
    ///
    /// Default: `None`
    pub fn max_queue_memory(mut self, bytes: Option<u64>) -> Self {
        self.max_queue_memory = bytes;
        self
    }

    /// Sets the overflow strategy used when a fast-path acquire can't
    /// immediately succeed.
    ///
    /// Default: [`OverflowStrategy::Suspend`]
    pub fn strategy(mut self, strategy: OverflowStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the name of this semaphore instance.
    ///
    /// Default: "backpressure"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a permit is granted, fast-path
    /// or otherwise.
    pub fn on_permit_granted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BackPressureEvent::PermitGranted { held, .. } = event {
                f(*held);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a caller is rejected.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BackPressureEvent::Rejected { reason, .. } = event {
                f(reason);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a queued waiter times out.
    pub fn on_waiter_timed_out<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BackPressureEvent::WaiterTimedOut { timeout, .. } = event {
                f(*timeout);
            }
        }));
        self
    }

    /// Builds the final, immutable configuration.
    pub fn build(self) -> BackPressureConfig {
        BackPressureConfig {
            max_concurrency: self.max_concurrency,
            max_outstanding: self.max_outstanding,
            max_queue_memory: self.max_queue_memory,
            strategy: self.strategy,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for BackPressureConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
