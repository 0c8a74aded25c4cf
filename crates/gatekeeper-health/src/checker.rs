//! Trait for out-of-band active health checks.
//!
//! Most of a [`crate::HealthTracker`]'s state comes from passively observing
//! the calls already flowing through the pipeline. An active checker lets a
//! caller additionally probe a resource directly (a ping, a `SELECT 1`) and
//! feed the result in via [`crate::HealthTracker::record_active_check`].

use crate::HealthState;
use std::future::Future;

/// Probes the health of a resource out of band.
///
/// # Examples
///
/// ```rust
/// use gatekeeper_health::{HealthChecker, HealthState};
///
/// struct PingChecker;
///
/// impl HealthChecker<String> for PingChecker {
///     async fn check(&self, _resource: &String) -> HealthState {
///         HealthState::Healthy
///     }
/// }
/// ```
pub trait HealthChecker<T>: Send + Sync {
    /// Checks the health of the given resource.
    fn check(&self, resource: &T) -> impl Future<Output = HealthState> + Send;
}

impl<T, F, Fut> HealthChecker<T> for F
where
    F: Fn(&T) -> Fut + Send + Sync,
    Fut: Future<Output = HealthState> + Send,
{
    fn check(&self, resource: &T) -> impl Future<Output = HealthState> + Send {
        self(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_checker() {
        let checker = |_resource: &String| async { HealthState::Healthy };
        let resource = "test".to_string();
        assert_eq!(checker.check(&resource).await, HealthState::Healthy);
    }

    struct AlwaysHealthyChecker;

    impl<T: Sync> HealthChecker<T> for AlwaysHealthyChecker {
        async fn check(&self, _resource: &T) -> HealthState {
            HealthState::Healthy
        }
    }

    #[tokio::test]
    async fn trait_impl_checker() {
        let checker = AlwaysHealthyChecker;
        let resource = "test".to_string();
        assert_eq!(checker.check(&resource).await, HealthState::Healthy);
    }
}
