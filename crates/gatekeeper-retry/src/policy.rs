//! Error classification used to decide retryability by default.

/// Lets an error type describe itself well enough for [`crate::RetryEngine`]
/// to apply sensible default retry behavior without a caller-supplied
/// predicate.
///
/// All methods default to `false`; an error type need only override the
/// categories it actually has. [`Self::is_cancelled`] takes priority over
/// every other category: a cancelled operation is never retried, even if a
/// caller-supplied predicate would otherwise say yes.
pub trait RetryClassify {
    /// The operation did not complete within its allotted time.
    fn is_timeout(&self) -> bool {
        false
    }

    /// The failure originated from the network or a downstream dependency
    /// being unreachable.
    fn is_network_error(&self) -> bool {
        false
    }

    /// The failure is expected to be transient (e.g. the callee is
    /// temporarily overloaded or unavailable).
    fn is_temporary_failure(&self) -> bool {
        false
    }

    /// The operation was cancelled rather than failed.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// The default retry decision: retry timeouts, network errors, and
    /// temporary failures, never a cancellation.
    fn should_retry_by_default(&self) -> bool {
        !self.is_cancelled()
            && (self.is_timeout() || self.is_network_error() || self.is_temporary_failure())
    }
}

impl RetryClassify for gatekeeper_core::error::PipelineError {
    fn is_timeout(&self) -> bool {
        self.is_timeout()
    }

    fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::CircuitBreakerOpen { .. } | Self::ServiceUnavailable { .. } | Self::BackPressure { .. }
        )
    }

    fn is_temporary_failure(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::BulkheadRejected { .. } | Self::BulkheadTimeout { .. }
        )
    }

    fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
