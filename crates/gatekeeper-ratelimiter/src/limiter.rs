//! The rate limiter: routes requests to per-scope-key buckets.

use crate::config::RateLimiterConfig;
use crate::error::{RateLimitError, Result};
use crate::events::RateLimiterEvent;
use crate::scope::RateLimitContext;
use crate::strategy::{Decision, RateLimitStrategy};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

/// Admits or denies requests according to a configured strategy, scoped into
/// independent buckets by [`crate::Scope`].
///
/// Cloning a `RateLimiter` is cheap: all clones share the same buckets.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, Arc<dyn RateLimitStrategy>>>,
    config: Arc<RateLimiterConfig>,
}

impl RateLimiter {
    /// Creates a new rate limiter from the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    /// The name this limiter was configured with.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Checks whether a request in the given context may proceed.
    ///
    /// Returns the permits remaining in the bucket on admission, or
    /// [`RateLimitError::Exceeded`] on denial.
    pub fn check(&self, ctx: &RateLimitContext<'_>) -> Result<u64> {
        let key = self.config.scope.resolve(ctx);
        let bucket = self.bucket_for(&key);

        match bucket.check() {
            Decision::Admit { remaining } => {
                self.emit(RateLimiterEvent::Admitted {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key,
                    remaining,
                });
                Ok(remaining)
            }
            Decision::Deny { remaining, reset_at } => {
                self.emit(RateLimiterEvent::Denied {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                    remaining,
                    reset_at,
                });
                Err(RateLimitError::Exceeded {
                    key,
                    remaining,
                    reset_at,
                })
            }
        }
    }

    fn bucket_for(&self, key: &str) -> Arc<dyn RateLimitStrategy> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(&bucket);
        }
        Arc::clone(
            self.buckets
                .entry(key.to_string())
                .or_insert_with(|| self.config.strategy.instantiate())
                .value(),
        )
    }

    fn emit(&self, event: RateLimiterEvent) {
        self.config.event_listeners.emit(&event);
    }
}
