//! Event types for the rate limiter.

use gatekeeper_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::RateLimiter`].
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A request was admitted.
    Admitted {
        /// Name of the rate limiter instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The resolved scope key that admitted the request.
        key: String,
        /// Permits remaining after this admission.
        remaining: u64,
    },
    /// A request was denied.
    Denied {
        /// Name of the rate limiter instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The resolved scope key that denied the request.
        key: String,
        /// Permits remaining (usually 0).
        remaining: u64,
        /// How long until the window is expected to admit again.
        reset_at: Duration,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Admitted { .. } => "admitted",
            Self::Denied { .. } => "denied",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Admitted { timestamp, .. } | Self::Denied { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::Admitted { pattern_name, .. } | Self::Denied { pattern_name, .. } => {
                pattern_name
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_and_pattern_name() {
        let event = RateLimiterEvent::Denied {
            pattern_name: "api".to_string(),
            timestamp: Instant::now(),
            key: "user-42".to_string(),
            remaining: 0,
            reset_at: Duration::from_secs(1),
        };
        assert_eq!(event.event_type(), "denied");
        assert_eq!(event.pattern_name(), "api");
    }
}
