//! Configuration for [`crate::HealthTracker`].

use std::sync::Arc;
use std::time::Duration;

use crate::HealthState;

/// Callback invoked whenever a tracked key's derived state changes.
type HealthChangeCallback = Arc<dyn Fn(&str, HealthState, HealthState) + Send + Sync>;

/// Configuration for a [`crate::HealthTracker`].
#[derive(Clone)]
pub struct HealthTrackerConfig {
    pub(crate) window_size: usize,
    pub(crate) min_requests: usize,
    pub(crate) failure_threshold: u32,
    pub(crate) success_threshold: u32,
    pub(crate) success_rate_threshold: f64,
    pub(crate) response_time_threshold: Duration,
    pub(crate) name: String,
    pub(crate) on_state_change: Option<HealthChangeCallback>,
}

impl Default for HealthTrackerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            min_requests: 5,
            failure_threshold: 3,
            success_threshold: 2,
            success_rate_threshold: 0.5,
            response_time_threshold: Duration::from_secs(1),
            name: String::from("<unnamed>"),
            on_state_change: None,
        }
    }
}

impl HealthTrackerConfig {
    /// Creates a new builder with default values.
    pub fn builder() -> HealthTrackerConfigBuilder {
        HealthTrackerConfigBuilder::default()
    }

    /// Size of each key's rolling sample window.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Minimum samples required before a key's state leaves `Unknown`.
    pub fn min_requests(&self) -> usize {
        self.min_requests
    }

    /// Consecutive failures that mark a key unhealthy.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Consecutive successes required to recover from unhealthy.
    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    /// Minimum success rate below which a key is degraded.
    pub fn success_rate_threshold(&self) -> f64 {
        self.success_rate_threshold
    }

    /// Average latency above which a key is degraded.
    pub fn response_time_threshold(&self) -> Duration {
        self.response_time_threshold
    }

    /// The name used to label this tracker's triggers and logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`HealthTrackerConfig`].
#[derive(Default)]
pub struct HealthTrackerConfigBuilder {
    window_size: Option<usize>,
    min_requests: Option<usize>,
    failure_threshold: Option<u32>,
    success_threshold: Option<u32>,
    success_rate_threshold: Option<f64>,
    response_time_threshold: Option<Duration>,
    name: Option<String>,
    on_state_change: Option<HealthChangeCallback>,
}

impl HealthTrackerConfigBuilder {
    /// Sets the size of each key's rolling sample window.
    ///
    /// Default: 20
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = Some(size);
        self
    }

    /// Sets the minimum samples required before a key's state leaves
    /// `Unknown` (absent an active check).
    ///
    /// Default: 5
    pub fn min_requests(mut self, n: usize) -> Self {
        self.min_requests = Some(n);
        self
    }

    /// Sets the consecutive failures that mark a key unhealthy.
    ///
    /// Default: 3
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = Some(n);
        self
    }

    /// Sets the consecutive successes required to recover from unhealthy.
    ///
    /// Default: 2
    pub fn success_threshold(mut self, n: u32) -> Self {
        self.success_threshold = Some(n);
        self
    }

    /// Sets the minimum success rate below which a key is degraded.
    ///
    /// Default: 0.5
    pub fn success_rate_threshold(mut self, rate: f64) -> Self {
        self.success_rate_threshold = Some(rate);
        self
    }

    /// Sets the average latency above which a key is degraded.
    ///
    /// Default: 1 second
    pub fn response_time_threshold(mut self, threshold: Duration) -> Self {
        self.response_time_threshold = Some(threshold);
        self
    }

    /// Sets the name used to label this tracker's triggers and logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers a callback invoked whenever a tracked key's derived state
    /// changes.
    ///
    /// The callback receives `(key, old_state, new_state)`.
    pub fn on_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, HealthState, HealthState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(callback));
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> HealthTrackerConfig {
        let default = HealthTrackerConfig::default();
        HealthTrackerConfig {
            window_size: self.window_size.unwrap_or(default.window_size),
            min_requests: self.min_requests.unwrap_or(default.min_requests),
            failure_threshold: self.failure_threshold.unwrap_or(default.failure_threshold),
            success_threshold: self.success_threshold.unwrap_or(default.success_threshold),
            success_rate_threshold: self
                .success_rate_threshold
                .unwrap_or(default.success_rate_threshold),
            response_time_threshold: self
                .response_time_threshold
                .unwrap_or(default.response_time_threshold),
            name: self.name.unwrap_or(default.name),
            on_state_change: self.on_state_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = HealthTrackerConfig::default();
        assert_eq!(config.window_size(), 20);
        assert_eq!(config.min_requests(), 5);
        assert_eq!(config.failure_threshold(), 3);
        assert_eq!(config.success_threshold(), 2);
        assert_eq!(config.success_rate_threshold(), 0.5);
        assert_eq!(config.response_time_threshold(), Duration::from_secs(1));
    }

    #[test]
    fn builder_applies_overrides() {
        let config = HealthTrackerConfig::builder()
            .window_size(50)
            .min_requests(10)
            .failure_threshold(5)
            .success_threshold(3)
            .success_rate_threshold(0.9)
            .response_time_threshold(Duration::from_millis(200))
            .name("orders")
            .build();

        assert_eq!(config.window_size(), 50);
        assert_eq!(config.min_requests(), 10);
        assert_eq!(config.failure_threshold(), 5);
        assert_eq!(config.success_threshold(), 3);
        assert_eq!(config.success_rate_threshold(), 0.9);
        assert_eq!(config.response_time_threshold(), Duration::from_millis(200));
        assert_eq!(config.name(), "orders");
    }
}
