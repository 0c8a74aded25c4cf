//! Backoff strategies between retry attempts.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Computes the delay before a given retry attempt.
///
/// `attempt` is 1-indexed: the delay before the *first* retry (i.e. after
/// the initial call fails) is `delay(1)`.
pub trait BackoffStrategy: Send + Sync {
    /// Returns the delay to wait before making `attempt`.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Always waits the same fixed duration.
pub struct Fixed(pub Duration);

impl BackoffStrategy for Fixed {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Grows linearly with the attempt number, capped at `max`.
pub struct Linear {
    base: Duration,
    max: Duration,
}

impl Linear {
    /// Creates a linear backoff: `min(attempt * base, max)`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffStrategy for Linear {
    fn delay(&self, attempt: u32) -> Duration {
        (self.base * attempt).min(self.max)
    }
}

/// Doubles on every attempt, capped at `max`.
pub struct Exponential {
    base: Duration,
    max: Duration,
}

impl Exponential {
    /// Creates an exponential backoff: `min(base * 2^(attempt-1), max)`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffStrategy for Exponential {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Exponential backoff with full jitter: `min(base * 2^(attempt-1), max)`
/// scaled by a uniform random factor in `[0.5, 1.0)`, spreading out
/// simultaneous retries from many callers.
pub struct ExponentialJitter {
    inner: Exponential,
}

impl ExponentialJitter {
    /// Creates a jittered exponential backoff with the same growth as
    /// [`Exponential`].
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            inner: Exponential::new(base, max),
        }
    }
}

impl BackoffStrategy for ExponentialJitter {
    fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.inner.delay(attempt);
        let factor = rand::rng().random_range(0.5..1.0);
        ceiling.mul_f64(factor)
    }
}

/// A caller-supplied backoff function.
pub struct Custom(pub Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl BackoffStrategy for Custom {
    fn delay(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_never_changes() {
        let backoff = Fixed(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(5), Duration::from_millis(100));
    }

    #[test]
    fn linear_grows_and_caps() {
        let backoff = Linear::new(Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(250));
    }

    #[test]
    fn exponential_doubles_and_caps() {
        let backoff = Exponential::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let backoff = ExponentialJitter::new(Duration::from_millis(100), Duration::from_secs(1));
        for attempt in 1..5 {
            let delay = backoff.delay(attempt);
            let ceiling = Exponential::new(Duration::from_millis(100), Duration::from_secs(1))
                .delay(attempt);
            assert!(delay <= ceiling);
            assert!(delay >= ceiling.mul_f64(0.5));
        }
    }

    #[test]
    fn custom_calls_the_function() {
        let backoff = Custom(Arc::new(|attempt| Duration::from_millis(attempt as u64 * 10)));
        assert_eq!(backoff.delay(3), Duration::from_millis(30));
    }
}
