//! The admission token returned by a permitted call.

use crate::breaker::Inner;
use std::sync::Arc;
use std::time::Instant;

/// A single-use admission granted by [`crate::CircuitBreaker::allow_request`].
///
/// The caller must report the outcome of the call it was granted for by
/// consuming this token with exactly one of [`Permission::record_success`]
/// or [`Permission::record_failure`]. Dropping a `Permission` without
/// recording an outcome is a logic error: in debug builds it trips an
/// assertion, and in release builds the call is silently treated as neither
/// a success nor a failure, leaving the circuit's counters unchanged.
#[must_use = "a granted call must report its outcome via record_success or record_failure"]
pub struct Permission {
    inner: Option<Arc<Inner>>,
    granted_at: Instant,
}

impl Permission {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner: Some(inner),
            granted_at: Instant::now(),
        }
    }

    /// When this permission was granted.
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }

    /// Reports that the permitted call succeeded.
    pub fn record_success(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.record_success(self.granted_at.elapsed());
        }
    }

    /// Reports that the permitted call failed.
    pub fn record_failure(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.record_failure(self.granted_at.elapsed());
        }
    }
}

impl Drop for Permission {
    fn drop(&mut self) {
        debug_assert!(
            self.inner.is_none(),
            "Permission dropped without calling record_success or record_failure"
        );
    }
}

impl std::fmt::Debug for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permission")
            .field("granted_at", &self.granted_at)
            .field("consumed", &self.inner.is_none())
            .finish()
    }
}
