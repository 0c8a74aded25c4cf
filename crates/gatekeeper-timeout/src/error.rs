//! Error types for the timeout enforcer.

use std::time::Duration;

/// How a timed operation failed to produce a result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeoutError {
    /// The operation did not finish within the resolved timeout and no
    /// grace period was configured (or none applied).
    #[error("operation exceeded timeout of {duration:?}")]
    Exceeded {
        /// The timeout that was exceeded.
        duration: Duration,
    },
    /// The operation did not finish within the timeout, and a subsequent
    /// grace period also expired before it completed.
    #[error("operation exceeded timeout of {timeout:?} and its grace period of {grace:?} (total {total:?})")]
    GracePeriodExpired {
        /// The primary timeout.
        timeout: Duration,
        /// The grace period granted after the primary timeout fired.
        grace: Duration,
        /// `timeout + grace`.
        total: Duration,
    },
    /// The operation was cancelled for a reason unrelated to the timeout
    /// (e.g. the enclosing task was aborted). Never reported for an
    /// ordinary deadline expiry.
    #[error("operation was cancelled")]
    Cancelled,
}

/// Result type for timeout-enforced operations.
pub type Result<T> = std::result::Result<T, TimeoutError>;
