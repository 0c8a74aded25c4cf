//! Event types for the circuit breaker pattern.

use crate::state::CircuitState;
use gatekeeper_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a [`crate::CircuitBreaker`].
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was permitted through the circuit breaker.
    CallPermitted {
        /// Name of the circuit breaker instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state that admitted the call.
        state: CircuitState,
    },
    /// A call was rejected because the circuit is open.
    CallRejected {
        /// Name of the circuit breaker instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// The circuit breaker transitioned between states.
    StateTransition {
        /// Name of the circuit breaker instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state transitioned from.
        from_state: CircuitState,
        /// The state transitioned to.
        to_state: CircuitState,
    },
    /// A successful call was recorded against an outstanding permission.
    SuccessRecorded {
        /// Name of the circuit breaker instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state at the time the success was recorded.
        state: CircuitState,
    },
    /// A failed call was recorded against an outstanding permission.
    FailureRecorded {
        /// Name of the circuit breaker instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The state at the time the failure was recorded.
        state: CircuitState,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CallPermitted { .. } => "call_permitted",
            Self::CallRejected { .. } => "call_rejected",
            Self::StateTransition { .. } => "state_transition",
            Self::SuccessRecorded { .. } => "success_recorded",
            Self::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::CallPermitted { timestamp, .. }
            | Self::CallRejected { timestamp, .. }
            | Self::StateTransition { timestamp, .. }
            | Self::SuccessRecorded { timestamp, .. }
            | Self::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::CallPermitted { pattern_name, .. }
            | Self::CallRejected { pattern_name, .. }
            | Self::StateTransition { pattern_name, .. }
            | Self::SuccessRecorded { pattern_name, .. }
            | Self::FailureRecorded { pattern_name, .. } => pattern_name,
        }
    }
}
