//! Error types for the rate limiter pattern.

use std::time::Duration;

/// Errors that can occur when checking a rate limit.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    /// No permit was available for this scope key within the configured
    /// strategy.
    #[error("rate limit exceeded for '{key}': {remaining} remaining, resets in {reset_at:?}")]
    Exceeded {
        /// The resolved scope key that was rate limited.
        key: String,
        /// Permits remaining in the current window (usually 0).
        remaining: u64,
        /// How long until the window is expected to admit again.
        reset_at: Duration,
    },
}

/// Result type for rate limiter operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;
