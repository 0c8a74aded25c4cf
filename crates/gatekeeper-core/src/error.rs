//! The closed error taxonomy every pipeline stage ultimately produces.
//!
//! Every middleware and resilience component in this crate family converges
//! on [`PipelineError`] the same way the teacher's resilience layers all
//! converge on a single error type: once a component's own error is folded
//! into a `PipelineError`, callers pattern-match one closed set instead of
//! writing a `From` impl per layer.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::command::CommandTypeId;

/// The reason a bulkhead rejected a call outright (no queue slot, no borrow
/// available from another partition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkheadRejectionReason {
    /// The partition (or the default bulkhead) is already at its concurrency limit.
    AtCapacity,
    /// The wait queue for a permit is full.
    QueueFull,
}

impl fmt::Display for BulkheadRejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtCapacity => write!(f, "at capacity"),
            Self::QueueFull => write!(f, "queue full"),
        }
    }
}

/// The reason the back-pressure semaphore rejected or delayed admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackPressureReason {
    /// The waiter queue itself is full; the caller was rejected immediately.
    QueueFull,
    /// The configured memory budget has been exhausted.
    MemoryPressure,
}

impl fmt::Display for BackPressureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "queue full"),
            Self::MemoryPressure => write!(f, "memory pressure"),
        }
    }
}

/// The closed set of errors a pipeline execution can fail with.
///
/// Every variant carries the originating command's [`CommandTypeId`]; see
/// [`ErrorContext`] for the middleware name and free-form diagnostics that
/// accompany (rather than live inside) the error itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Request-shape validation failed before any resilience middleware ran.
    #[error("validation failed for {command_type}: {message}")]
    Validation {
        /// The command that failed validation.
        command_type: CommandTypeId,
        /// A human-readable description of what was invalid.
        message: String,
    },

    /// The caller's identity could not be established.
    #[error("authentication failed for {command_type}")]
    Authentication {
        /// The command being authenticated.
        command_type: CommandTypeId,
    },

    /// The caller was authenticated but is not permitted to run this command.
    #[error("authorization failed for {command_type}")]
    Authorization {
        /// The command being authorized.
        command_type: CommandTypeId,
    },

    /// The rate limiter rejected the call.
    #[error("rate limit exceeded for {command_type}")]
    RateLimit {
        /// The command that was rate limited.
        command_type: CommandTypeId,
        /// Permits remaining in the current window, if known.
        remaining: Option<u64>,
        /// When the window is expected to reset, if known.
        reset_at: Option<Duration>,
    },

    /// The back-pressure semaphore rejected or gave up admitting the call.
    #[error("back-pressure rejection for {command_type}: {reason}")]
    BackPressure {
        /// The command that was rejected.
        command_type: CommandTypeId,
        /// The specific back-pressure reason.
        reason: BackPressureReason,
    },

    /// A bulkhead (or partitioned bulkhead) rejected the call outright.
    #[error("bulkhead rejected {command_type}: {reason}")]
    BulkheadRejected {
        /// The command that was rejected.
        command_type: CommandTypeId,
        /// Why the bulkhead refused admission.
        reason: BulkheadRejectionReason,
    },

    /// A bulkhead admitted the caller to its wait queue but the queue wait
    /// itself exceeded the configured timeout.
    #[error("bulkhead queue timeout for {command_type} after waiting {queue_time:?}")]
    BulkheadTimeout {
        /// The command that timed out waiting for a permit.
        command_type: CommandTypeId,
        /// The configured timeout that was exceeded.
        timeout: Duration,
        /// How long the caller actually waited.
        queue_time: Duration,
    },

    /// The circuit breaker is open (or half-open and out of trial permits)
    /// and rejected the call without attempting it.
    #[error("circuit breaker open for {command_type}")]
    CircuitBreakerOpen {
        /// The command that was rejected.
        command_type: CommandTypeId,
    },

    /// The call was admitted but did not complete within its timeout.
    #[error("{command_type} timed out after {duration:?}")]
    Timeout {
        /// The command that timed out.
        command_type: CommandTypeId,
        /// The timeout that was exceeded.
        duration: Duration,
        /// Additional context (e.g. which grace period stage was active).
        context: String,
    },

    /// A resilience middleware exhausted its own recovery budget.
    #[error("resilience exhausted for {command_type}: {detail}")]
    Resilience {
        /// The command whose resilience budget was exhausted.
        command_type: CommandTypeId,
        /// What was exhausted.
        detail: ResilienceExhaustion,
    },

    /// A named downstream service is unavailable independent of any single
    /// middleware's own bookkeeping (e.g. a health tracker marked it down).
    #[error("service {service} unavailable for {command_type}: {reason}")]
    ServiceUnavailable {
        /// The command whose target service is unavailable.
        command_type: CommandTypeId,
        /// The unavailable service's name.
        service: String,
        /// Why it is considered unavailable.
        reason: String,
    },

    /// The command's own handler returned an application-level failure.
    #[error("{command_type} execution failed: {message}")]
    ExecutionFailed {
        /// The command whose handler failed.
        command_type: CommandTypeId,
        /// The handler-supplied failure message.
        message: String,
    },

    /// The call was cancelled before it completed (e.g. caller dropped the
    /// future, or a grace period elapsed without recovery).
    #[error("{command_type} cancelled")]
    Cancelled {
        /// The command that was cancelled.
        command_type: CommandTypeId,
    },
}

/// What a [`PipelineError::Resilience`] error reports as exhausted.
#[derive(Debug, Clone)]
pub enum ResilienceExhaustion {
    /// The retry engine ran out of attempts.
    RetryExhausted {
        /// Total attempts made, including the initial try.
        attempts: u32,
    },
    /// A bulkhead's full capacity (including queue) was exhausted.
    BulkheadFull,
}

impl fmt::Display for ResilienceExhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryExhausted { attempts } => {
                write!(f, "retries exhausted after {attempts} attempts")
            }
            Self::BulkheadFull => write!(f, "bulkhead full"),
        }
    }
}

impl PipelineError {
    /// The command type this error originated from.
    pub fn command_type(&self) -> CommandTypeId {
        match self {
            Self::Validation { command_type, .. }
            | Self::Authentication { command_type }
            | Self::Authorization { command_type }
            | Self::RateLimit { command_type, .. }
            | Self::BackPressure { command_type, .. }
            | Self::BulkheadRejected { command_type, .. }
            | Self::BulkheadTimeout { command_type, .. }
            | Self::CircuitBreakerOpen { command_type }
            | Self::Timeout { command_type, .. }
            | Self::Resilience { command_type, .. }
            | Self::ServiceUnavailable { command_type, .. }
            | Self::ExecutionFailed { command_type, .. }
            | Self::Cancelled { command_type } => *command_type,
        }
    }

    /// Returns `true` if this error means the caller should back off and
    /// retry later rather than treat the command as permanently failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. }
                | Self::BackPressure { .. }
                | Self::BulkheadRejected { .. }
                | Self::BulkheadTimeout { .. }
                | Self::CircuitBreakerOpen { .. }
                | Self::Timeout { .. }
                | Self::ServiceUnavailable { .. }
        )
    }

    /// Returns `true` if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if this is an authentication or authorization error.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Authorization { .. })
    }

    /// Returns `true` if this is a rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitBreakerOpen { .. })
    }

    /// Returns `true` if this is any flavor of timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::BulkheadTimeout { .. })
    }

    /// Returns `true` if this is the terminal outcome of the retry engine.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(
            self,
            Self::Resilience {
                detail: ResilienceExhaustion::RetryExhausted { .. },
                ..
            }
        )
    }
}

/// Context attached to a [`PipelineError`] identifying where in the chain
/// it originated, plus free-form diagnostics.
///
/// Middlewares build this alongside a [`PipelineError`] and the executor
/// merges it into logs/events; it is kept separate from the error enum so
/// the enum stays cheap to match on.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The middleware that raised the error, if any (`None` for
    /// executor-raised errors such as "no handler registered").
    pub middleware_type: Option<&'static str>,
    /// Free-form diagnostic key/value pairs.
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the originating middleware's name.
    pub fn with_middleware(mut self, middleware_type: &'static str) -> Self {
        self.middleware_type = Some(middleware_type);
        self
    }

    /// Adds a diagnostic key/value pair.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: CommandTypeId = CommandTypeId::new("orders.create");

    #[test]
    fn command_type_is_recoverable_from_every_variant() {
        let errors = vec![
            PipelineError::Validation {
                command_type: ORDERS,
                message: "bad input".into(),
            },
            PipelineError::Authentication { command_type: ORDERS },
            PipelineError::CircuitBreakerOpen { command_type: ORDERS },
            PipelineError::Cancelled { command_type: ORDERS },
        ];
        for err in errors {
            assert_eq!(err.command_type(), ORDERS);
        }
    }

    #[test]
    fn retryable_classification_matches_spec() {
        assert!(PipelineError::CircuitBreakerOpen { command_type: ORDERS }.is_retryable());
        assert!(!PipelineError::Validation {
            command_type: ORDERS,
            message: "x".into()
        }
        .is_retryable());
        assert!(!PipelineError::Authentication { command_type: ORDERS }.is_retryable());
    }

    #[test]
    fn bulkhead_timeout_counts_as_timeout() {
        let err = PipelineError::BulkheadTimeout {
            command_type: ORDERS,
            timeout: Duration::from_millis(50),
            queue_time: Duration::from_millis(75),
        };
        assert!(err.is_timeout());
    }

    #[test]
    fn retry_exhausted_is_detected() {
        let err = PipelineError::Resilience {
            command_type: ORDERS,
            detail: ResilienceExhaustion::RetryExhausted { attempts: 4 },
        };
        assert!(err.is_retry_exhausted());
    }

    #[test]
    fn display_includes_command_type() {
        let err = PipelineError::Timeout {
            command_type: ORDERS,
            duration: Duration::from_secs(1),
            context: "grace period expired".into(),
        };
        assert!(err.to_string().contains("orders.create"));
    }

    #[test]
    fn error_context_builder_accumulates_info() {
        let ctx = ErrorContext::new()
            .with_middleware("circuit-breaker")
            .with_info("state", "open")
            .with_info("failure_rate", "0.62");
        assert_eq!(ctx.middleware_type, Some("circuit-breaker"));
        assert_eq!(ctx.additional_info.get("state").map(String::as_str), Some("open"));
        assert_eq!(ctx.additional_info.len(), 2);
    }
}
