//! The circuit breaker's state machine.

use std::time::Instant;

/// The circuit breaker's current state.
///
/// Each variant carries exactly the bookkeeping its transitions need: a
/// closed circuit tracks consecutive failures and when the last one
/// happened; an open circuit tracks when it's eligible to probe again; a
/// half-open circuit tracks probe successes and whether a probe is already
/// in flight (only one probe is admitted at a time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls are allowed; failures accumulate toward `failure_threshold`.
    Closed {
        /// Consecutive failures observed since the last success or reset.
        failures: u32,
        /// When the last failure was recorded, if any.
        last_failure_at: Option<Instant>,
    },
    /// Calls are rejected until `until` elapses.
    Open {
        /// When the circuit becomes eligible to admit a probe.
        until: Instant,
    },
    /// A single probe call is admitted at a time; `successes` counts
    /// consecutive probe successes toward `half_open_success_threshold`.
    HalfOpen {
        /// Consecutive probe successes recorded in this half-open episode.
        successes: u32,
        /// Whether a probe call is currently outstanding.
        probe_in_flight: bool,
    },
}

impl CircuitState {
    /// The initial state of every circuit breaker.
    pub fn initial() -> Self {
        Self::Closed {
            failures: 0,
            last_failure_at: None,
        }
    }

    /// A coarse-grained label, useful for logging/metrics without exposing
    /// the internal counters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen { .. } => "half_open",
        }
    }

    /// Returns `true` if this is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` if this is the `Open` variant.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if this is the `HalfOpen` variant.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_closed_with_zero_failures() {
        let state = CircuitState::initial();
        assert!(state.is_closed());
        assert_eq!(state.label(), "closed");
    }
}
