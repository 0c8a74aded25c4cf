//! Configuration for [`crate::Bulkhead`] and [`crate::PartitionedBulkhead`].

use crate::events::BulkheadEvent;
use gatekeeper_core::events::{EventListener, EventListeners, FnListener};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration shared by every partition: its capacity and wait-queue
/// behavior once that capacity is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct PartitionLimits {
    pub(crate) capacity: usize,
    pub(crate) queue_size: usize,
    pub(crate) queue_timeout: Option<Duration>,
}

impl PartitionLimits {
    /// Creates new limits with no wait queue (calls past capacity reject
    /// immediately).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue_size: 0,
            queue_timeout: None,
        }
    }

    /// Sets the bounded wait queue size for calls past capacity.
    ///
    /// Default: 0 (no queueing)
    pub fn queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Sets the maximum time a queued call waits before timing out.
    ///
    /// Default: None (wait indefinitely once queued)
    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = Some(timeout);
        self
    }
}

/// Configuration for a single (non-partitioned) [`crate::Bulkhead`].
pub struct BulkheadConfig {
    pub(crate) limits: PartitionLimits,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Starts building a config with default values.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::default()
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    limits: PartitionLimits,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self {
            limits: PartitionLimits::new(25),
            name: "bulkhead".to_string(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl BulkheadConfigBuilder {
    /// Sets the maximum number of concurrent calls.
    ///
    /// Default: 25
    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.limits.capacity = max;
        self
    }

    /// Sets the bounded wait queue size for calls past capacity.
    ///
    /// Default: 0 (no queueing; calls past capacity reject immediately)
    pub fn queue_size(mut self, size: usize) -> Self {
        self.limits.queue_size = size;
        self
    }

    /// Sets the maximum time a queued call waits before timing out.
    ///
    /// Default: None (wait indefinitely once queued)
    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.limits.queue_timeout = Some(timeout);
        self
    }

    /// Sets the name of this bulkhead instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a listener invoked when a call acquires a permit.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::CallPermitted {
                    concurrent_calls, ..
                } = event
                {
                    f(*concurrent_calls);
                }
            }));
        self
    }

    /// Registers a listener invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::CallRejected { capacity, .. } = event {
                    f(*capacity);
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`BulkheadEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<BulkheadEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> BulkheadConfig {
        BulkheadConfig {
            limits: self.limits,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

/// Configuration for a [`crate::PartitionedBulkhead`].
pub struct PartitionedBulkheadConfig {
    pub(crate) default_limits: PartitionLimits,
    pub(crate) overrides: HashMap<String, PartitionLimits>,
    pub(crate) max_borrow_percentage: Option<f64>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl PartitionedBulkheadConfig {
    /// Starts building a config with default values.
    pub fn builder() -> PartitionedBulkheadConfigBuilder {
        PartitionedBulkheadConfigBuilder::default()
    }

    pub(crate) fn limits_for(&self, partition_key: &str) -> PartitionLimits {
        self.overrides
            .get(partition_key)
            .copied()
            .unwrap_or(self.default_limits)
    }
}

/// Builder for [`PartitionedBulkheadConfig`].
pub struct PartitionedBulkheadConfigBuilder {
    default_limits: PartitionLimits,
    overrides: HashMap<String, PartitionLimits>,
    max_borrow_percentage: Option<f64>,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl Default for PartitionedBulkheadConfigBuilder {
    fn default() -> Self {
        Self {
            default_limits: PartitionLimits::new(25),
            overrides: HashMap::new(),
            max_borrow_percentage: None,
            name: "partitioned_bulkhead".to_string(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl PartitionedBulkheadConfigBuilder {
    /// Sets the limits used by any partition key without its own override,
    /// including the implicit `default` partition unknown keys map to.
    ///
    /// Default: capacity 25, no queue
    pub fn default_limits(mut self, limits: PartitionLimits) -> Self {
        self.default_limits = limits;
        self
    }

    /// Sets distinct limits for a specific partition key.
    pub fn partition(mut self, key: impl Into<String>, limits: PartitionLimits) -> Self {
        self.overrides.insert(key.into(), limits);
        self
    }

    /// Enables cross-partition borrowing: a partition at capacity may draw
    /// a permit from another partition that has at least
    /// `ceil(capacity * percentage)` permits free.
    ///
    /// Default: disabled
    pub fn max_borrow_percentage(mut self, percentage: f64) -> Self {
        self.max_borrow_percentage = Some(percentage);
        self
    }

    /// Sets the name of this bulkhead instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a listener invoked when a permit is borrowed across
    /// partitions.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if let BulkheadEvent::CallPermitted {
                    partition, borrowed, ..
                } = event
                {
                    f(partition, *borrowed);
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`BulkheadEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<BulkheadEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> PartitionedBulkheadConfig {
        PartitionedBulkheadConfig {
            default_limits: self.default_limits,
            overrides: self.overrides,
            max_borrow_percentage: self.max_borrow_percentage,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulkhead_config_defaults() {
        let config = BulkheadConfig::builder().build();
        assert_eq!(config.limits.capacity, 25);
        assert_eq!(config.limits.queue_size, 0);
        assert_eq!(config.name, "bulkhead");
    }

    #[test]
    fn partitioned_config_uses_override_when_present() {
        let config = PartitionedBulkheadConfig::builder()
            .default_limits(PartitionLimits::new(10))
            .partition("premium", PartitionLimits::new(50))
            .build();
        assert_eq!(config.limits_for("premium").capacity, 50);
        assert_eq!(config.limits_for("standard").capacity, 10);
    }
}
