//! Deadline-racing against an operation, with an optional grace period.

use crate::config::TimeoutConfig;
use crate::error::TimeoutError;
use crate::events::TimeoutEvent;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Races an operation against a timeout timer, reporting a strict failure
/// taxonomy for the loser.
pub struct TimeoutEnforcer {
    config: TimeoutConfig,
}

impl TimeoutEnforcer {
    /// Creates a new enforcer from the given configuration.
    pub fn new(config: TimeoutConfig) -> Self {
        Self { config }
    }

    /// The name this enforcer was configured with.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs `operation` under the resolved timeout, with no external
    /// cancellation signal.
    pub async fn run<F, T>(
        &self,
        type_key: Option<&str>,
        self_declared: Option<Duration>,
        call_override: Option<Duration>,
        operation: F,
    ) -> Result<T, TimeoutError>
    where
        F: Future<Output = T>,
    {
        self.run_cancellable(type_key, self_declared, call_override, operation, std::future::pending())
            .await
    }

    /// Runs `operation` under the resolved timeout, racing it additionally
    /// against `cancel`: if `cancel` resolves first, the result is
    /// [`TimeoutError::Cancelled`] rather than a timeout, regardless of how
    /// much of the deadline remained.
    pub async fn run_cancellable<F, T, C>(
        &self,
        type_key: Option<&str>,
        self_declared: Option<Duration>,
        call_override: Option<Duration>,
        operation: F,
        cancel: C,
    ) -> Result<T, TimeoutError>
    where
        F: Future<Output = T>,
        C: Future<Output = ()>,
    {
        let timeout = self.config.resolve(type_key, self_declared, call_override);
        let start = Instant::now();

        tokio::pin!(operation);
        tokio::pin!(cancel);
        let primary = sleep(timeout);
        tokio::pin!(primary);

        tokio::select! {
            biased;
            _ = &mut cancel => {
                return Err(TimeoutError::Cancelled);
            }
            value = &mut operation => {
                self.emit_success(start.elapsed());
                return Ok(value);
            }
            _ = &mut primary => {}
        }

        let Some(grace) = self.config.grace_period else {
            self.emit_exceeded(timeout);
            return Err(TimeoutError::Exceeded { duration: timeout });
        };

        let grace_timer = sleep(grace);
        tokio::pin!(grace_timer);

        tokio::select! {
            biased;
            _ = &mut cancel => Err(TimeoutError::Cancelled),
            value = &mut operation => {
                let grace_used = start.elapsed().saturating_sub(timeout);
                self.emit_recovered(timeout, grace_used);
                Ok(value)
            }
            _ = &mut grace_timer => {
                self.emit_grace_expired(timeout, grace);
                Err(TimeoutError::GracePeriodExpired {
                    timeout,
                    grace,
                    total: timeout + grace,
                })
            }
        }
    }

    fn emit_success(&self, duration: Duration) {
        self.config.event_listeners.emit(&TimeoutEvent::Success {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        });
    }

    fn emit_exceeded(&self, timeout: Duration) {
        self.config.event_listeners.emit(&TimeoutEvent::Exceeded {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            timeout,
        });
    }

    fn emit_recovered(&self, timeout: Duration, grace_used: Duration) {
        self.config.event_listeners.emit(&TimeoutEvent::Recovered {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            timeout,
            grace_used,
        });
    }

    fn emit_grace_expired(&self, timeout: Duration, grace: Duration) {
        self.config
            .event_listeners
            .emit(&TimeoutEvent::GracePeriodExpired {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                timeout,
                grace,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep as tsleep;

    #[tokio::test]
    async fn succeeds_within_timeout() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(100))
                .build(),
        );
        let result = enforcer
            .run(None, None, None, async {
                tsleep(Duration::from_millis(10)).await;
                "done"
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn exceeds_timeout_without_grace() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(10))
                .build(),
        );
        let result = enforcer
            .run(None, None, None, async {
                tsleep(Duration::from_millis(50)).await;
                "done"
            })
            .await;
        assert!(matches!(result, Err(TimeoutError::Exceeded { .. })));
    }

    #[tokio::test]
    async fn recovers_during_grace_period() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(10))
                .grace_period(Duration::from_millis(100))
                .build(),
        );
        let result = enforcer
            .run(None, None, None, async {
                tsleep(Duration::from_millis(30)).await;
                "recovered"
            })
            .await;
        assert_eq!(result.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn grace_period_also_expires() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(10))
                .grace_period(Duration::from_millis(10))
                .build(),
        );
        let result = enforcer
            .run(None, None, None, async {
                tsleep(Duration::from_millis(200)).await;
                "too late"
            })
            .await;
        match result {
            Err(TimeoutError::GracePeriodExpired {
                timeout,
                grace,
                total,
            }) => {
                assert_eq!(timeout, Duration::from_millis(10));
                assert_eq!(grace, Duration::from_millis(10));
                assert_eq!(total, Duration::from_millis(20));
            }
            other => panic!("expected GracePeriodExpired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn external_cancellation_is_not_reported_as_timeout() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_secs(5))
                .build(),
        );
        let result = enforcer
            .run_cancellable(
                None,
                None,
                None,
                async {
                    tsleep(Duration::from_secs(5)).await;
                    "done"
                },
                tsleep(Duration::from_millis(10)),
            )
            .await;
        assert!(matches!(result, Err(TimeoutError::Cancelled)));
    }

    #[tokio::test]
    async fn type_key_resolution_is_honored() {
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(10))
                .timeout_for("slow-op", Duration::from_millis(100))
                .build(),
        );
        let result = enforcer
            .run(Some("slow-op"), None, None, async {
                tsleep(Duration::from_millis(30)).await;
                "done"
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn listeners_are_invoked() {
        let exceeded = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&exceeded);
        let enforcer = TimeoutEnforcer::new(
            TimeoutConfig::builder()
                .default_timeout(Duration::from_millis(10))
                .on_exceeded(move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        );
        let _ = enforcer
            .run(None, None, None, async {
                tsleep(Duration::from_millis(50)).await;
            })
            .await;
        assert_eq!(exceeded.load(Ordering::SeqCst), 1);
    }
}
