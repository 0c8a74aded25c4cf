//! Event types for the bulkhead pattern.

use gatekeeper_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::Bulkhead`] or [`crate::PartitionedBulkhead`].
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call acquired a permit immediately or after queueing.
    CallPermitted {
        /// Name of the bulkhead instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The partition the permit was drawn from.
        partition: String,
        /// Calls currently in flight against that partition, including
        /// this one.
        concurrent_calls: usize,
        /// Whether the permit was borrowed from a different partition
        /// than the one the call targeted.
        borrowed: bool,
    },
    /// A call was rejected without acquiring a permit.
    CallRejected {
        /// Name of the bulkhead instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The partition that rejected the call.
        partition: String,
        /// The partition's configured capacity.
        capacity: usize,
    },
    /// A call timed out waiting in a partition's queue.
    CallTimedOut {
        /// Name of the bulkhead instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The partition the call was queued against.
        partition: String,
        /// How long the call waited before timing out.
        queued_for: Duration,
    },
    /// A held permit was released.
    PermitReleased {
        /// Name of the bulkhead instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The partition the permit is returned to.
        partition: String,
        /// How long the permit was held.
        held_for: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CallPermitted { .. } => "call_permitted",
            Self::CallRejected { .. } => "call_rejected",
            Self::CallTimedOut { .. } => "call_timed_out",
            Self::PermitReleased { .. } => "permit_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::CallPermitted { timestamp, .. }
            | Self::CallRejected { timestamp, .. }
            | Self::CallTimedOut { timestamp, .. }
            | Self::PermitReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::CallPermitted { pattern_name, .. }
            | Self::CallRejected { pattern_name, .. }
            | Self::CallTimedOut { pattern_name, .. }
            | Self::PermitReleased { pattern_name, .. } => pattern_name,
        }
    }
}
