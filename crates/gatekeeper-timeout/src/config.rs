//! Configuration for [`crate::TimeoutEnforcer`].

use crate::events::TimeoutEvent;
use gatekeeper_core::events::{EventListener, EventListeners, FnListener};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the timeout enforcer pattern.
pub struct TimeoutConfig {
    pub(crate) default_timeout: Duration,
    pub(crate) per_type: HashMap<String, Duration>,
    pub(crate) grace_period: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
}

impl TimeoutConfig {
    /// Starts building a config with default values.
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfigBuilder::default()
    }

    /// Resolves the timeout to apply for one call, per the precedence:
    /// explicit per-call override, then a command's self-declared timeout,
    /// then this enforcer's type-keyed map, then the configured default.
    pub fn resolve(
        &self,
        type_key: Option<&str>,
        self_declared: Option<Duration>,
        call_override: Option<Duration>,
    ) -> Duration {
        call_override
            .or(self_declared)
            .or_else(|| type_key.and_then(|key| self.per_type.get(key).copied()))
            .unwrap_or(self.default_timeout)
    }
}

/// Builder for [`TimeoutConfig`].
pub struct TimeoutConfigBuilder {
    default_timeout: Duration,
    per_type: HashMap<String, Duration>,
    grace_period: Option<Duration>,
    name: String,
    event_listeners: EventListeners<TimeoutEvent>,
}

impl Default for TimeoutConfigBuilder {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            per_type: HashMap::new(),
            grace_period: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl TimeoutConfigBuilder {
    /// Sets the default timeout used when nothing more specific applies.
    ///
    /// Default: 5 seconds
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the timeout for a specific command type key.
    pub fn timeout_for(mut self, type_key: impl Into<String>, timeout: Duration) -> Self {
        self.per_type.insert(type_key.into(), timeout);
        self
    }

    /// Enables a grace period: an operation that exceeds its timeout gets
    /// this much additional time before it is reported as failed, and is
    /// counted as a recovered success if it finishes during it.
    ///
    /// Default: disabled
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = Some(grace);
        self
    }

    /// Sets the name of this enforcer instance for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a call completes within its
    /// timeout (including one recovered during its grace period).
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if let TimeoutEvent::Success { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call exceeds its timeout and
    /// either has no grace period or fails to recover within it.
    pub fn on_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if let TimeoutEvent::Exceeded { timeout, .. } = event {
                    f(*timeout);
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`TimeoutEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<TimeoutEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> TimeoutConfig {
        TimeoutConfig {
            default_timeout: self.default_timeout,
            per_type: self.per_type,
            grace_period: self.grace_period,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
