//! Attempt/backoff loop driving retries.

use crate::config::RetryConfig;
use crate::events::RetryEvent;
use crate::policy::RetryClassify;
use std::future::Future;
use std::time::{Duration, Instant};

/// Runs an operation with up to `max_attempts` tries, backing off between
/// failures per the configured strategy.
pub struct RetryEngine<E> {
    config: RetryConfig<E>,
}

impl<E> RetryEngine<E> {
    /// Creates a new retry engine from the given configuration.
    pub fn new(config: RetryConfig<E>) -> Self {
        Self { config }
    }

    /// The name this engine was configured with.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl<E> RetryEngine<E>
where
    E: RetryClassify,
{
    /// Runs `operation`, retrying on failure per the configured policy,
    /// backoff strategy, and bounds.
    ///
    /// `operation` is called once per attempt since a future can only be
    /// polled to completion once; pass a closure that builds a fresh future
    /// each time.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if let Some(budget) = &self.config.budget {
                        budget.deposit();
                    }
                    self.emit(RetryEvent::Success {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(error) => {
                    if error.is_cancelled() || !self.should_retry(&error) {
                        self.emit(RetryEvent::IgnoredError {
                            pattern_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                        });
                        return Err(error);
                    }

                    if attempt >= self.config.max_attempts {
                        self.emit(RetryEvent::Exhausted {
                            pattern_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(error);
                    }

                    let delay = self.config.backoff.delay(attempt);

                    if let Some(max_retry_time) = self.config.max_retry_time {
                        if start.elapsed() + delay > max_retry_time {
                            self.emit(RetryEvent::Exhausted {
                                pattern_name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                attempts: attempt,
                            });
                            return Err(error);
                        }
                    }

                    if let Some(budget) = &self.config.budget {
                        if !budget.try_withdraw() {
                            self.emit(RetryEvent::BudgetExhausted {
                                pattern_name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                            });
                            return Err(error);
                        }
                    }

                    self.emit(RetryEvent::Retry {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn should_retry(&self, error: &E) -> bool {
        match &self.config.retry_predicate {
            Some(predicate) => predicate(error),
            None => error.should_retry_by_default(),
        }
    }

    fn emit(&self, event: RetryEvent) {
        self.config.event_listeners.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct TestError {
        timeout: bool,
        cancelled: bool,
    }

    impl RetryClassify for TestError {
        fn is_timeout(&self) -> bool {
            self.timeout
        }
        fn is_cancelled(&self) -> bool {
            self.cancelled
        }
    }

    fn timeout_error() -> TestError {
        TestError {
            timeout: true,
            cancelled: false,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let engine = RetryEngine::new(RetryConfig::<TestError>::builder().build());
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<&str, TestError> = engine
            .run(|| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok("ok") }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let engine = RetryEngine::new(
            RetryConfig::<TestError>::builder()
                .max_attempts(5)
                .fixed_backoff(Duration::from_millis(1))
                .build(),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = engine
            .run(|| {
                let count = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(timeout_error())
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_max_attempts() {
        let engine = RetryEngine::new(
            RetryConfig::<TestError>::builder()
                .max_attempts(3)
                .fixed_backoff(Duration::from_millis(1))
                .build(),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<&str, TestError> = engine
            .run(|| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout_error()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_is_never_retried() {
        let engine = RetryEngine::new(
            RetryConfig::<TestError>::builder()
                .max_attempts(5)
                .retry_on(|_: &TestError| true)
                .build(),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<&str, TestError> = engine
            .run(|| {
                c.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(TestError {
                        timeout: false,
                        cancelled: true,
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let engine = RetryEngine::new(RetryConfig::<TestError>::builder().max_attempts(5).build());
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<&str, TestError> = engine
            .run(|| {
                c.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(TestError {
                        timeout: false,
                        cancelled: false,
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn max_retry_time_bounds_total_wait() {
        let engine = RetryEngine::new(
            RetryConfig::<TestError>::builder()
                .max_attempts(100)
                .fixed_backoff(Duration::from_millis(50))
                .max_retry_time(Duration::from_millis(60))
                .build(),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<&str, TestError> = engine
            .run(|| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout_error()) }
            })
            .await;
        assert!(result.is_err());
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }
}
