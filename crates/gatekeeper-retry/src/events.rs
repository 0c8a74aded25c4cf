//! Event types for the retry engine.

use gatekeeper_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::RetryEngine`].
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and a retry is about to be scheduled.
    Retry {
        /// Name of the retry engine instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt number that just failed (1-indexed).
        attempt: u32,
        /// How long to wait before the next attempt.
        delay: Duration,
    },
    /// The operation succeeded, on the first attempt or after retries.
    Success {
        /// Name of the retry engine instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made, including the initial one.
        attempts: u32,
    },
    /// All attempts were exhausted without success.
    Exhausted {
        /// Name of the retry engine instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made, including the initial one.
        attempts: u32,
    },
    /// An error occurred but the retry policy says not to retry it.
    IgnoredError {
        /// Name of the retry engine instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A retry was skipped because the retry budget was exhausted.
    BudgetExhausted {
        /// Name of the retry engine instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt number that would have retried.
        attempt: u32,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Retry { .. } => "retry",
            Self::Success { .. } => "success",
            Self::Exhausted { .. } => "exhausted",
            Self::IgnoredError { .. } => "ignored_error",
            Self::BudgetExhausted { .. } => "budget_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Retry { timestamp, .. }
            | Self::Success { timestamp, .. }
            | Self::Exhausted { timestamp, .. }
            | Self::IgnoredError { timestamp, .. }
            | Self::BudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::Retry { pattern_name, .. }
            | Self::Success { pattern_name, .. }
            | Self::Exhausted { pattern_name, .. }
            | Self::IgnoredError { pattern_name, .. }
            | Self::BudgetExhausted { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_and_pattern_name() {
        let event = RetryEvent::Exhausted {
            pattern_name: "fetch-order".to_string(),
            timestamp: Instant::now(),
            attempts: 3,
        };
        assert_eq!(event.event_type(), "exhausted");
        assert_eq!(event.pattern_name(), "fetch-order");
    }
}
