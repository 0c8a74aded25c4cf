//! Configuration for [`crate::RateLimiter`].

use crate::events::RateLimiterEvent;
use crate::scope::{RateLimitContext, Scope};
use crate::strategy::StrategyKind;
use gatekeeper_core::events::{EventListener, EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::RateLimiter`].
pub struct RateLimiterConfig {
    pub(crate) strategy: StrategyKind,
    pub(crate) scope: Scope,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterConfig {
    /// Starts building a config with default values.
    ///
    /// Default strategy is a 50-capacity token bucket refilling 50 tokens
    /// per second; default scope is [`Scope::Global`].
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::default()
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    strategy: StrategyKind,
    scope: Scope,
    name: String,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::TokenBucket {
                capacity: 50,
                refill_per_second: 50.0,
            },
            scope: Scope::Global,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl RateLimiterConfigBuilder {
    /// Continuous refill: admits iff at least one token is available,
    /// consuming one on admission.
    pub fn token_bucket(mut self, capacity: u64, refill_per_second: f64) -> Self {
        self.strategy = StrategyKind::TokenBucket {
            capacity,
            refill_per_second,
        };
        self
    }

    /// Admits iff fewer than `max_requests` were recorded in the trailing
    /// `window`.
    pub fn sliding_window(mut self, window: Duration, max_requests: u64) -> Self {
        self.strategy = StrategyKind::SlidingWindow {
            window,
            max_requests,
        };
        self
    }

    /// Discrete tumbling buckets: `rate` permits per `window`.
    pub fn fixed_window(mut self, window: Duration, rate: u64) -> Self {
        self.strategy = StrategyKind::FixedWindow { window, rate };
        self
    }

    /// Effective rate = `base_rate * (1 - load_fn())`, re-evaluated on every
    /// admission.
    pub fn adaptive<F>(mut self, base_rate: f64, load_fn: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.strategy = StrategyKind::Adaptive {
            base_rate,
            load_fn: Arc::new(load_fn),
        };
        self
    }

    /// A single shared bucket for every request.
    ///
    /// Default.
    pub fn scope_global(mut self) -> Self {
        self.scope = Scope::Global;
        self
    }

    /// One bucket per user id.
    pub fn scope_per_user(mut self) -> Self {
        self.scope = Scope::PerUser;
        self
    }

    /// One bucket per command type.
    pub fn scope_per_command(mut self) -> Self {
        self.scope = Scope::PerCommand;
        self
    }

    /// A caller-supplied function resolves the bucket key.
    pub fn scope_custom<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&RateLimitContext) -> String + Send + Sync + 'static,
    {
        self.scope = Scope::Custom(Arc::new(key_fn));
        self
    }

    /// Sets the name of this rate limiter instance for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a request is admitted.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::Admitted { key, remaining, .. } = event {
                    f(key, *remaining);
                }
            }));
        self
    }

    /// Registers a callback invoked when a request is denied.
    pub fn on_denied<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::Denied { key, reset_at, .. } = event {
                    f(key, *reset_at);
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`RateLimiterEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RateLimiterEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> RateLimiterConfig {
        RateLimiterConfig {
            strategy: self.strategy,
            scope: self.scope,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RateLimiterConfig::builder().build();
        assert_eq!(config.name, "<unnamed>");
        assert!(matches!(config.strategy, StrategyKind::TokenBucket { .. }));
        assert!(matches!(config.scope, Scope::Global));
    }

    #[test]
    fn overrides() {
        let config = RateLimiterConfig::builder()
            .sliding_window(Duration::from_secs(1), 10)
            .scope_per_user()
            .name("api")
            .build();
        assert_eq!(config.name, "api");
        assert!(matches!(config.strategy, StrategyKind::SlidingWindow { .. }));
        assert!(matches!(config.scope, Scope::PerUser));
    }
}
