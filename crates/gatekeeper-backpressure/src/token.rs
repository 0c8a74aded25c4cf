//! The RAII permit handle returned by a successful acquisition.

use crate::config::WaiterPriority;
use crate::semaphore::Inner;
use std::sync::Arc;
use std::time::Instant;

/// A linear handle to a held permit.
///
/// Exactly one release happens per token, performed by [`Drop`]. There is
/// no public `release` method: dropping the token (including via an early
/// `return` or a panic unwind) is the only way to give the permit back.
pub struct SemaphoreToken {
    inner: Option<Arc<Inner>>,
    bytes: u64,
    priority: WaiterPriority,
    acquired_at: Instant,
}

impl SemaphoreToken {
    pub(crate) fn new(inner: Arc<Inner>, bytes: u64, priority: WaiterPriority) -> Self {
        Self {
            inner: Some(inner),
            bytes,
            priority,
            acquired_at: Instant::now(),
        }
    }

    /// The number of bytes debited against the memory budget for this token.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The priority this token was acquired at.
    pub fn priority(&self) -> WaiterPriority {
        self.priority
    }

    /// When this token was granted.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

impl Drop for SemaphoreToken {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.release(self.bytes);
        }
    }
}

impl std::fmt::Debug for SemaphoreToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreToken")
            .field("bytes", &self.bytes)
            .field("priority", &self.priority)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
