//! A bulkhead split into independently-budgeted partitions, with optional
//! cross-partition borrowing.

use crate::config::PartitionedBulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use crate::partition::{headroom_requirement, Partition};
use crate::token::BulkheadToken;
use dashmap::DashMap;
use gatekeeper_core::events::EventListeners;
use std::sync::Arc;
use std::time::Instant;

/// Maps partition keys to independent concurrency budgets.
///
/// Keys are opaque strings; callers are expected to derive them with a pure
/// function over the request (e.g. a tenant id), matching the per-request
/// `partition_key()` a command can declare. An unknown key is served from a
/// lazily-created partition using `default_limits`.
#[derive(Clone)]
pub struct PartitionedBulkhead {
    partitions: Arc<DashMap<String, Arc<Partition>>>,
    config: Arc<PartitionedBulkheadConfig>,
    listeners: Arc<EventListeners<BulkheadEvent>>,
}

impl PartitionedBulkhead {
    /// Creates a new partitioned bulkhead from the given configuration.
    pub fn new(config: PartitionedBulkheadConfig) -> Self {
        let listeners = Arc::new(config.event_listeners.clone());
        Self {
            partitions: Arc::new(DashMap::new()),
            config: Arc::new(config),
            listeners,
        }
    }

    /// Calls currently holding a permit in the given partition. Zero for a
    /// key that has never been used.
    pub fn in_use(&self, partition_key: &str) -> usize {
        self.partitions
            .get(partition_key)
            .map(|p| p.in_use())
            .unwrap_or(0)
    }

    fn partition_for(&self, partition_key: &str) -> Arc<Partition> {
        if let Some(existing) = self.partitions.get(partition_key) {
            return Arc::clone(&existing);
        }
        let limits = self.config.limits_for(partition_key);
        let created = Arc::new(Partition::new(partition_key, limits));
        Arc::clone(
            &self
                .partitions
                .entry(partition_key.to_string())
                .or_insert(created),
        )
    }

    /// Acquires a permit for `partition_key`, per spec §4.5's four-step
    /// decision: try an immediate permit, then borrowing (if enabled), then
    /// queueing, then reject.
    pub async fn acquire(&self, partition_key: &str) -> Result<BulkheadToken, BulkheadError> {
        let partition = self.partition_for(partition_key);

        if let Some(permit) = partition.try_acquire() {
            self.emit_permitted(&partition, false);
            return Ok(self.wrap(permit, &partition));
        }

        if let Some(percentage) = self.config.max_borrow_percentage {
            let required = headroom_requirement(partition.limits.capacity, percentage);
            if let Some((lender, permit)) = self.find_lender(partition_key, required) {
                self.emit_permitted(&lender, true);
                return Ok(self.wrap(permit, &lender));
            }
        }

        if partition.limits.queue_size == 0 {
            self.listeners.emit(&BulkheadEvent::CallRejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                partition: partition.key.clone(),
                capacity: partition.limits.capacity,
            });
            return Err(BulkheadError::Full {
                partition: partition.key.clone(),
                capacity: partition.limits.capacity,
            });
        }

        let permit = partition.acquire_queued().await?;
        self.emit_permitted(&partition, false);
        Ok(self.wrap(permit, &partition))
    }

    fn find_lender(
        &self,
        borrower_key: &str,
        required: usize,
    ) -> Option<(Arc<Partition>, tokio::sync::OwnedSemaphorePermit)> {
        for entry in self.partitions.iter() {
            if entry.key() == borrower_key {
                continue;
            }
            let candidate = Arc::clone(entry.value());
            if candidate.has_headroom(required) {
                if let Some(permit) = candidate.try_acquire() {
                    return Some((candidate, permit));
                }
            }
        }
        None
    }

    fn emit_permitted(&self, partition: &Arc<Partition>, borrowed: bool) {
        self.listeners.emit(&BulkheadEvent::CallPermitted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            partition: partition.key.clone(),
            concurrent_calls: partition.in_use(),
            borrowed,
        });
    }

    fn wrap(
        &self,
        permit: tokio::sync::OwnedSemaphorePermit,
        partition: &Arc<Partition>,
    ) -> BulkheadToken {
        BulkheadToken::new(
            permit,
            partition.key.clone(),
            self.config.name.clone(),
            Arc::clone(&self.listeners),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionLimits;

    #[tokio::test]
    async fn unknown_key_uses_default_limits() {
        let bulkhead = PartitionedBulkhead::new(
            PartitionedBulkheadConfig::builder()
                .default_limits(PartitionLimits::new(1))
                .build(),
        );
        let _held = bulkhead.acquire("anything").await.unwrap();
        assert_eq!(bulkhead.in_use("anything"), 1);
        assert!(bulkhead.acquire("anything").await.is_err());
    }

    #[tokio::test]
    async fn partitions_have_independent_budgets() {
        let bulkhead = PartitionedBulkhead::new(
            PartitionedBulkheadConfig::builder()
                .default_limits(PartitionLimits::new(1))
                .build(),
        );
        let _a = bulkhead.acquire("tenant-a").await.unwrap();
        let _b = bulkhead.acquire("tenant-b").await.unwrap();
        assert_eq!(bulkhead.in_use("tenant-a"), 1);
        assert_eq!(bulkhead.in_use("tenant-b"), 1);
    }

    #[tokio::test]
    async fn borrows_from_a_partition_with_headroom() {
        let bulkhead = PartitionedBulkhead::new(
            PartitionedBulkheadConfig::builder()
                .default_limits(PartitionLimits::new(10))
                .partition("busy", PartitionLimits::new(1))
                .max_borrow_percentage(0.5)
                .build(),
        );
        // touch the lender partition first so it exists in the map
        let warm = bulkhead.acquire("lender").await.unwrap();
        drop(warm);

        let _busy = bulkhead.acquire("busy").await.unwrap();
        // "busy" is now at capacity; the next acquire should borrow
        let borrowed = bulkhead.acquire("busy").await.unwrap();
        assert_eq!(borrowed.partition(), "lender");
    }

    #[tokio::test]
    async fn rejects_when_no_lender_has_headroom_and_no_queue() {
        let bulkhead = PartitionedBulkhead::new(
            PartitionedBulkheadConfig::builder()
                .default_limits(PartitionLimits::new(1))
                .max_borrow_percentage(0.9)
                .build(),
        );
        let _a = bulkhead.acquire("only").await.unwrap();
        let err = bulkhead.acquire("only").await.unwrap_err();
        assert!(matches!(err, BulkheadError::Full { .. }));
    }
}
