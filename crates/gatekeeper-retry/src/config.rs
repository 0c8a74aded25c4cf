//! Configuration for [`crate::RetryEngine`].

use crate::backoff::{BackoffStrategy, Custom, Exponential, ExponentialJitter, Fixed, Linear};
use crate::budget::RetryBudget;
use crate::events::RetryEvent;
use gatekeeper_core::events::{EventListener, EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// A caller-supplied override for which errors are retried, replacing the
/// default [`crate::RetryClassify`]-based decision entirely.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for the retry engine.
pub struct RetryConfig<E> {
    pub(crate) max_attempts: u32,
    pub(crate) max_retry_time: Option<Duration>,
    pub(crate) backoff: Arc<dyn BackoffStrategy>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
    pub(crate) budget: Option<Arc<dyn RetryBudget>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl<E> RetryConfig<E> {
    /// Starts building a config with default values.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::default()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: u32,
    max_retry_time: Option<Duration>,
    backoff: Arc<dyn BackoffStrategy>,
    retry_predicate: Option<RetryPredicate<E>>,
    budget: Option<Arc<dyn RetryBudget>>,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_retry_time: None,
            backoff: Arc::new(Exponential::new(Duration::from_millis(100), Duration::from_secs(30))),
            retry_predicate: None,
            budget: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Sets the maximum number of attempts, including the initial one.
    ///
    /// `max_attempts(3)` means 1 initial attempt plus up to 2 retries.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Bounds the total wall-clock time spent retrying. A retry whose delay
    /// would push the elapsed time past this bound is not attempted.
    ///
    /// Default: unbounded
    pub fn max_retry_time(mut self, max: Duration) -> Self {
        self.max_retry_time = Some(max);
        self
    }

    /// Uses a fixed delay between every attempt.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Arc::new(Fixed(delay));
        self
    }

    /// Uses a delay that grows linearly with the attempt number.
    pub fn linear_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff = Arc::new(Linear::new(base, max));
        self
    }

    /// Uses a delay that doubles with each attempt.
    pub fn exponential_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff = Arc::new(Exponential::new(base, max));
        self
    }

    /// Uses exponential backoff scaled by a uniform random factor between
    /// 0.5 and 1.0, spreading out retries from concurrent callers.
    pub fn exponential_jitter_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff = Arc::new(ExponentialJitter::new(base, max));
        self
    }

    /// Uses a caller-supplied function to compute the delay for each
    /// attempt.
    pub fn custom_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.backoff = Arc::new(Custom(Arc::new(f)));
        self
    }

    /// Overrides which errors are retried, replacing the default
    /// timeout/network/temporary-failure classification entirely.
    /// Cancellation is still never retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets a retry budget limiting the total retries across all callers.
    ///
    /// Default: none (unlimited)
    pub fn budget(mut self, budget: Arc<dyn RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Sets the name of this retry engine instance for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked right before sleeping for a retry.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback invoked when an operation succeeds, with the
    /// total number of attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Success { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked when retries are exhausted.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Exhausted { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked when a retry is skipped because the
    /// retry budget was exhausted.
    pub fn on_budget_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::BudgetExhausted { attempt, .. } = event {
                    f(*attempt);
                }
            }));
        self
    }

    /// Adds a raw event listener, receiving every [`RetryEvent`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the immutable config.
    pub fn build(self) -> RetryConfig<E> {
        RetryConfig {
            max_attempts: self.max_attempts,
            max_retry_time: self.max_retry_time,
            backoff: self.backoff,
            retry_predicate: self.retry_predicate,
            budget: self.budget,
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
        let config = RetryConfig::<std::io::Error>::builder().build();
        assert_eq!(config.max_attempts, 3);
        assert!(config.max_retry_time.is_none());
        assert_eq!(config.name, "<unnamed>");
    }

    #[test]
    fn overrides() {
        let config = RetryConfig::<std::io::Error>::builder()
            .max_attempts(5)
            .max_retry_time(Duration::from_secs(10))
            .fixed_backoff(Duration::from_millis(50))
            .name("fetch-order")
            .build();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.max_retry_time, Some(Duration::from_secs(10)));
        assert_eq!(config.name, "fetch-order");
    }
}
