//! Error types for the bulkhead pattern.

/// Errors that can occur when acquiring a bulkhead permit.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BulkheadError {
    /// The partition is at capacity, borrowing (if enabled) found no
    /// lender with spare headroom, and its wait queue is full or disabled.
    #[error("bulkhead '{partition}' is full: {capacity} concurrent calls in use")]
    Full {
        /// The partition that rejected the call.
        partition: String,
        /// The partition's configured capacity.
        capacity: usize,
    },
    /// A queued call did not acquire a permit within its queue timeout.
    #[error("timed out after {queued_for:?} waiting for a bulkhead permit in '{partition}'")]
    Timeout {
        /// The partition the call was queued against.
        partition: String,
        /// How long the call waited before timing out.
        queued_for: std::time::Duration,
    },
}

/// Result type for bulkhead operations.
pub type Result<T> = std::result::Result<T, BulkheadError>;
