//! Error types for the back-pressure semaphore.

/// Errors that can occur when acquiring a permit from a [`crate::BackPressureSemaphore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackPressureError {
    /// The waiter queue was full and the request was rejected immediately
    /// (strategy [`crate::OverflowStrategy::Error`] with no timeout, or
    /// [`crate::OverflowStrategy::DropNewest`]).
    #[error("back-pressure queue is full")]
    QueueFull,

    /// The configured memory budget could not accommodate the request even
    /// after waiting.
    #[error("back-pressure memory budget exhausted")]
    MemoryPressure,

    /// The request waited longer than the configured timeout.
    #[error("timed out waiting for a permit after {0:?}")]
    Timeout(std::time::Duration),

    /// The waiter was cancelled before it could be granted a permit (e.g.
    /// evicted by [`crate::OverflowStrategy::DropOldest`]).
    #[error("acquisition was cancelled")]
    Cancelled,
}

/// Result type for back-pressure operations.
pub type Result<T> = std::result::Result<T, BackPressureError>;
