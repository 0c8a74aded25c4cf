//! Event types for the back-pressure semaphore.

use gatekeeper_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::BackPressureSemaphore`].
#[derive(Debug, Clone)]
pub enum BackPressureEvent {
    /// A permit was granted on the fast path (no queueing).
    PermitGranted {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Permits currently held after this grant.
        held: usize,
        /// Queued waiters at the time of the grant.
        queued: usize,
    },
    /// A caller was enqueued because no permit was immediately available.
    Enqueued {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Queue length after enqueueing.
        queue_len: usize,
    },
    /// A queued waiter was granted a permit after waiting.
    WaiterGranted {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the waiter waited before being granted.
        wait_time: Duration,
    },
    /// A request was rejected outright (queue full, or `DropNewest`).
    Rejected {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The reason for rejection.
        reason: &'static str,
    },
    /// A queued waiter was evicted to make room for a higher-priority caller
    /// (`DropOldest` strategy).
    WaiterEvicted {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the evicted waiter had been queued.
        queued_for: Duration,
    },
    /// A queued waiter timed out before a permit became available.
    WaiterTimedOut {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The configured timeout that elapsed.
        timeout: Duration,
    },
    /// A held permit was released.
    PermitReleased {
        /// Name of the semaphore instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Permits held after the release.
        held: usize,
    },
}

impl ResilienceEvent for BackPressureEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::PermitGranted { .. } => "permit_granted",
            Self::Enqueued { .. } => "enqueued",
            Self::WaiterGranted { .. } => "waiter_granted",
            Self::Rejected { .. } => "rejected",
            Self::WaiterEvicted { .. } => "waiter_evicted",
            Self::WaiterTimedOut { .. } => "waiter_timed_out",
            Self::PermitReleased { .. } => "permit_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::PermitGranted { timestamp, .. }
            | Self::Enqueued { timestamp, .. }
            | Self::WaiterGranted { timestamp, .. }
            | Self::Rejected { timestamp, .. }
            | Self::WaiterEvicted { timestamp, .. }
            | Self::WaiterTimedOut { timestamp, .. }
            | Self::PermitReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::PermitGranted { pattern_name, .. }
            | Self::Enqueued { pattern_name, .. }
            | Self::WaiterGranted { pattern_name, .. }
            | Self::Rejected { pattern_name, .. }
            | Self::WaiterEvicted { pattern_name, .. }
            | Self::WaiterTimedOut { pattern_name, .. }
            | Self::PermitReleased { pattern_name, .. } => pattern_name,
        }
    }
}
