//! Rolling-window health tracking (C4).
//!
//! Unlike the circuit breaker's reactive trip-on-failure behavior, a
//! [`HealthTracker`] continuously derives a [`HealthState`] per service key
//! from a rolling window of recent outcomes, so other patterns can consult
//! it proactively before a failure streak would otherwise trip them.
//!
//! ## Example
//!
//! ```rust
//! use gatekeeper_health::{HealthTracker, HealthTrackerConfig, HealthState};
//! use std::time::Duration;
//!
//! let tracker = HealthTracker::new(HealthTrackerConfig::builder().build());
//! tracker.record_success("primary-db", Duration::from_millis(12));
//! assert_eq!(tracker.state("unknown-service"), HealthState::Unknown);
//! ```

mod checker;
mod config;
mod tracker;
mod triggers;
mod window;

pub use checker::HealthChecker;
pub use config::{HealthTrackerConfig, HealthTrackerConfigBuilder};
pub use tracker::{HealthSnapshot, HealthTracker};

/// The derived health of a tracked service key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Calls are succeeding within expected latency and rate.
    Healthy,
    /// Calls are succeeding but below the configured success rate or
    /// latency threshold.
    Degraded,
    /// Consecutive failures have crossed the threshold, or the last active
    /// check reported unhealthy.
    Unhealthy,
    /// Not enough samples have accumulated yet, and no active check has run.
    Unknown,
}

impl HealthState {
    /// Whether the state indicates the key is usable (`Healthy` or
    /// `Degraded`).
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthState::Healthy | HealthState::Degraded)
    }

    /// Whether the state is exactly `Healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthState::Healthy)
    }
}
