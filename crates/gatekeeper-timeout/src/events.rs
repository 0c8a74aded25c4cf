//! Event types for the timeout enforcer.

use gatekeeper_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::TimeoutEnforcer`].
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The operation completed within its timeout.
    Success {
        /// Name of the enforcer instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the operation actually took.
        duration: Duration,
    },
    /// The operation exceeded its timeout and there was no grace period
    /// (or it was disabled).
    Exceeded {
        /// Name of the enforcer instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The timeout that was exceeded.
        timeout: Duration,
    },
    /// The operation exceeded its timeout but completed during the grace
    /// period, so it is reported as a recovered success.
    Recovered {
        /// Name of the enforcer instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The primary timeout.
        timeout: Duration,
        /// How far into the grace period the operation finished.
        grace_used: Duration,
    },
    /// The operation exceeded both its timeout and its grace period.
    GracePeriodExpired {
        /// Name of the enforcer instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The primary timeout.
        timeout: Duration,
        /// The grace period that also expired.
        grace: Duration,
    },
}

impl ResilienceEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Exceeded { .. } => "exceeded",
            Self::Recovered { .. } => "recovered",
            Self::GracePeriodExpired { .. } => "grace_period_expired",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Success { timestamp, .. }
            | Self::Exceeded { timestamp, .. }
            | Self::Recovered { timestamp, .. }
            | Self::GracePeriodExpired { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::Success { pattern_name, .. }
            | Self::Exceeded { pattern_name, .. }
            | Self::Recovered { pattern_name, .. }
            | Self::GracePeriodExpired { pattern_name, .. } => pattern_name,
        }
    }
}
