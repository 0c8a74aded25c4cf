//! Configuration for [`crate::CircuitBreaker`].

use crate::events::CircuitBreakerEvent;
use gatekeeper_core::events::{EventListener, EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::CircuitBreaker`].
///
/// Built via [`CircuitBreakerConfig::builder`].
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) reset_timeout: Duration,
    pub(crate) recovery_timeout: Duration,
    pub(crate) half_open_success_threshold: u32,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Starts building a config with default values.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Number of consecutive failures that trips the circuit open.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// How long a closed circuit must sit idle before its failure count
    /// resets to zero.
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// How long an open circuit waits before admitting a probe call.
    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Consecutive probe successes required to close the circuit again.
    pub fn half_open_success_threshold(&self) -> u32 {
        self.half_open_success_threshold
    }

    /// The name used to label events and logs from this instance.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    reset_timeout: Duration,
    recovery_timeout: Duration,
    half_open_success_threshold: u32,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(30),
            half_open_success_threshold: 1,
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of consecutive failures that trips the circuit open.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets how long a closed circuit must sit idle (no failures) before its
    /// failure count resets to zero.
    ///
    /// Default: 60 seconds
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Sets how long an open circuit waits before admitting a probe call.
    ///
    /// Default: 30 seconds
    pub fn recovery_timeout(mut self, duration: Duration) -> Self {
        self.recovery_timeout = duration;
        self
    }

    /// Sets the number of consecutive probe successes required to close the
    /// circuit again.
    ///
    /// Default: 1
    pub fn half_open_success_threshold(mut self, n: u32) -> Self {
        self.half_open_success_threshold = n;
        self
    }

    /// Sets the name used to label events and logs from this instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a listener invoked whenever the circuit transitions between
    /// states.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(from_state.label(), to_state.label());
                }
            }));
        self
    }

    /// Registers a listener invoked whenever a call is rejected because the
    /// circuit is open.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`CircuitBreakerEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> Arc<CircuitBreakerConfig> {
        Arc::new(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            recovery_timeout: self.recovery_timeout,
            half_open_success_threshold: self.half_open_success_threshold,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CircuitBreakerConfig::builder().build();
        assert_eq!(config.failure_threshold(), 5);
        assert_eq!(config.reset_timeout(), Duration::from_secs(60));
        assert_eq!(config.recovery_timeout(), Duration::from_secs(30));
        assert_eq!(config.half_open_success_threshold(), 1);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .reset_timeout(Duration::from_secs(10))
            .recovery_timeout(Duration::from_secs(5))
            .half_open_success_threshold(2)
            .name("orders")
            .build();
        assert_eq!(config.failure_threshold(), 3);
        assert_eq!(config.reset_timeout(), Duration::from_secs(10));
        assert_eq!(config.recovery_timeout(), Duration::from_secs(5));
        assert_eq!(config.half_open_success_threshold(), 2);
        assert_eq!(config.name(), "orders");
    }
}
