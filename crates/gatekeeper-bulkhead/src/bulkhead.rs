//! A single, non-partitioned bulkhead.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use crate::partition::Partition;
use crate::token::BulkheadToken;
use gatekeeper_core::events::EventListeners;
use std::sync::Arc;
use std::time::Instant;

/// Limits concurrent calls to `max_concurrent_calls`, optionally queueing
/// callers past capacity.
#[derive(Clone)]
pub struct Bulkhead {
    partition: Arc<Partition>,
    name: Arc<str>,
    listeners: Arc<EventListeners<BulkheadEvent>>,
}

impl Bulkhead {
    /// Creates a new bulkhead from the given configuration.
    pub fn new(config: BulkheadConfig) -> Self {
        Self {
            partition: Arc::new(Partition::new("default", config.limits)),
            name: Arc::from(config.name.as_str()),
            listeners: Arc::new(config.event_listeners),
        }
    }

    /// The name this bulkhead was configured with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls currently holding a permit.
    pub fn in_use(&self) -> usize {
        self.partition.in_use()
    }

    /// Calls currently queued waiting for a permit.
    pub fn queued_count(&self) -> usize {
        self.partition.queued_count()
    }

    /// Attempts to acquire a permit, queueing if configured and necessary.
    pub async fn acquire(&self) -> Result<BulkheadToken, BulkheadError> {
        if let Some(permit) = self.partition.try_acquire() {
            self.emit_permitted(false);
            return Ok(self.wrap(permit));
        }

        if self.partition.limits.queue_size == 0 {
            self.listeners.emit(&BulkheadEvent::CallRejected {
                pattern_name: self.name.to_string(),
                timestamp: Instant::now(),
                partition: self.partition.key.clone(),
                capacity: self.partition.limits.capacity,
            });
            return Err(BulkheadError::Full {
                partition: self.partition.key.clone(),
                capacity: self.partition.limits.capacity,
            });
        }

        let permit = self.partition.acquire_queued().await?;
        self.emit_permitted(false);
        Ok(self.wrap(permit))
    }

    fn emit_permitted(&self, borrowed: bool) {
        self.listeners.emit(&BulkheadEvent::CallPermitted {
            pattern_name: self.name.to_string(),
            timestamp: Instant::now(),
            partition: self.partition.key.clone(),
            concurrent_calls: self.partition.in_use(),
            borrowed,
        });
    }

    fn wrap(&self, permit: tokio::sync::OwnedSemaphorePermit) -> BulkheadToken {
        BulkheadToken::new(
            permit,
            self.partition.key.clone(),
            self.name.to_string(),
            Arc::clone(&self.listeners),
        )
    }
}
