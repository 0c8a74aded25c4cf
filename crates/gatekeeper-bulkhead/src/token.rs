//! The RAII permit handle returned by a successful acquisition.

use crate::events::BulkheadEvent;
use gatekeeper_core::events::EventListeners;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;

/// A held bulkhead permit.
///
/// Dropping the token releases the permit back to whichever partition's
/// semaphore it was drawn from (its home partition if borrowed) and emits
/// [`BulkheadEvent::PermitReleased`].
pub struct BulkheadToken {
    permit: Option<OwnedSemaphorePermit>,
    partition: String,
    acquired_at: Instant,
    pattern_name: String,
    listeners: Arc<EventListeners<BulkheadEvent>>,
}

impl BulkheadToken {
    pub(crate) fn new(
        permit: OwnedSemaphorePermit,
        partition: String,
        pattern_name: String,
        listeners: Arc<EventListeners<BulkheadEvent>>,
    ) -> Self {
        Self {
            permit: Some(permit),
            partition,
            acquired_at: Instant::now(),
            pattern_name,
            listeners,
        }
    }

    /// The partition this permit was drawn from.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// When this permit was granted.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

impl Drop for BulkheadToken {
    fn drop(&mut self) {
        if self.permit.take().is_some() {
            self.listeners.emit(&BulkheadEvent::PermitReleased {
                pattern_name: self.pattern_name.clone(),
                timestamp: Instant::now(),
                partition: self.partition.clone(),
                held_for: self.acquired_at.elapsed(),
            });
        }
    }
}

impl std::fmt::Debug for BulkheadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadToken")
            .field("partition", &self.partition)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
