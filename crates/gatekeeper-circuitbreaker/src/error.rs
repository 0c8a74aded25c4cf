//! Error types for the circuit breaker.

/// Errors that can occur when using the circuit breaker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CircuitBreakerError {
    /// The circuit is open (or half-open with a probe already in flight);
    /// the call was rejected without being attempted.
    #[error("circuit is open; call not permitted")]
    Open,
}

/// Result type for circuit breaker operations.
pub type Result<T> = std::result::Result<T, CircuitBreakerError>;
