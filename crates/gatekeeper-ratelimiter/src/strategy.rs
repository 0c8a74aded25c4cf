//! Admission strategies: the per-bucket algorithm deciding admit/deny.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// The outcome of checking one bucket for a permit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The request is admitted.
    Admit {
        /// Permits remaining in this bucket after the admission.
        remaining: u64,
    },
    /// The request is denied.
    Deny {
        /// Permits remaining (usually 0).
        remaining: u64,
        /// How long until the bucket is expected to admit again.
        reset_at: Duration,
    },
}

/// One bucket's admission state. Implementations own their interior
/// mutability; `check` takes `&self` so many callers can share one bucket
/// through an `Arc`.
pub(crate) trait RateLimitStrategy: Send + Sync {
    fn check(&self) -> Decision;
}

/// Continuous refill: admit iff at least one token is available, consuming
/// one on admission.
pub(crate) struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<(f64, Instant)>,
}

impl TokenBucket {
    pub(crate) fn new(capacity: u64, refill_per_second: f64) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_second,
            state: Mutex::new((capacity as f64, Instant::now())),
        }
    }
}

impl RateLimitStrategy for TokenBucket {
    fn check(&self) -> Decision {
        let mut guard = self.state.lock().unwrap();
        let (tokens, last) = *guard;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(last).as_secs_f64();
        let refilled = (tokens + elapsed * self.refill_per_second).min(self.capacity);

        if refilled >= 1.0 {
            let remaining = refilled - 1.0;
            *guard = (remaining, now);
            Decision::Admit {
                remaining: remaining as u64,
            }
        } else {
            *guard = (refilled, now);
            let deficit = 1.0 - refilled;
            let wait = if self.refill_per_second > 0.0 {
                Duration::from_secs_f64(deficit / self.refill_per_second)
            } else {
                Duration::MAX
            };
            Decision::Deny {
                remaining: 0,
                reset_at: wait,
            }
        }
    }
}

/// Admits iff the count of requests recorded in `[now-window, now]` is below
/// `max_requests`; records the request's timestamp on admission.
pub(crate) struct SlidingWindow {
    window: Duration,
    max_requests: u64,
    log: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub(crate) fn new(window: Duration, max_requests: u64) -> Self {
        Self {
            window,
            max_requests,
            log: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
        }
    }
}

impl RateLimitStrategy for SlidingWindow {
    fn check(&self) -> Decision {
        let now = Instant::now();
        let mut log = self.log.lock().unwrap();

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if (log.len() as u64) < self.max_requests {
            log.push_back(now);
            return Decision::Admit {
                remaining: self.max_requests - log.len() as u64,
            };
        }

        let reset_at = log
            .front()
            .and_then(|oldest| oldest.checked_add(self.window))
            .map(|expiry| expiry.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        Decision::Deny {
            remaining: 0,
            reset_at,
        }
    }
}

/// Discrete tumbling buckets: `rate` permits per `window`, reset wholesale
/// at each window boundary.
pub(crate) struct FixedWindow {
    window: Duration,
    rate: u64,
    state: Mutex<(u64, Instant)>,
}

impl FixedWindow {
    pub(crate) fn new(window: Duration, rate: u64) -> Self {
        Self {
            window,
            rate,
            state: Mutex::new((rate, Instant::now())),
        }
    }
}

impl RateLimitStrategy for FixedWindow {
    fn check(&self) -> Decision {
        let now = Instant::now();
        let mut guard = self.state.lock().unwrap();
        let (mut available, mut period_start) = *guard;

        if now.saturating_duration_since(period_start) >= self.window {
            available = self.rate;
            period_start = now;
        }

        if available > 0 {
            available -= 1;
            *guard = (available, period_start);
            Decision::Admit { remaining: available }
        } else {
            *guard = (available, period_start);
            let reset_at = self.window.saturating_sub(now.saturating_duration_since(period_start));
            Decision::Deny {
                remaining: 0,
                reset_at,
            }
        }
    }
}

/// Effective rate = `base_rate * (1 - load_fn())`, re-evaluated on every
/// admission, tracked against a rolling one-second window.
pub(crate) struct Adaptive {
    base_rate: f64,
    load_fn: Arc<dyn Fn() -> f64 + Send + Sync>,
    state: Mutex<(f64, Instant)>,
}

impl Adaptive {
    pub(crate) fn new(base_rate: f64, load_fn: Arc<dyn Fn() -> f64 + Send + Sync>) -> Self {
        Self {
            base_rate,
            load_fn,
            state: Mutex::new((0.0, Instant::now())),
        }
    }
}

impl RateLimitStrategy for Adaptive {
    fn check(&self) -> Decision {
        const WINDOW: Duration = Duration::from_secs(1);
        let now = Instant::now();
        let mut guard = self.state.lock().unwrap();
        let (mut used, mut window_start) = *guard;

        if now.saturating_duration_since(window_start) >= WINDOW {
            used = 0.0;
            window_start = now;
        }

        let load = (self.load_fn)().clamp(0.0, 1.0);
        let effective_rate = (self.base_rate * (1.0 - load)).max(0.0);

        if used < effective_rate {
            used += 1.0;
            *guard = (used, window_start);
            Decision::Admit {
                remaining: (effective_rate - used).max(0.0) as u64,
            }
        } else {
            *guard = (used, window_start);
            let reset_at = WINDOW.saturating_sub(now.saturating_duration_since(window_start));
            Decision::Deny {
                remaining: 0,
                reset_at,
            }
        }
    }
}

/// Describes which strategy to instantiate for a newly seen bucket key.
#[derive(Clone)]
pub(crate) enum StrategyKind {
    TokenBucket {
        capacity: u64,
        refill_per_second: f64,
    },
    SlidingWindow {
        window: Duration,
        max_requests: u64,
    },
    FixedWindow {
        window: Duration,
        rate: u64,
    },
    Adaptive {
        base_rate: f64,
        load_fn: Arc<dyn Fn() -> f64 + Send + Sync>,
    },
}

impl StrategyKind {
    pub(crate) fn instantiate(&self) -> Arc<dyn RateLimitStrategy> {
        match self {
            Self::TokenBucket {
                capacity,
                refill_per_second,
            } => Arc::new(TokenBucket::new(*capacity, *refill_per_second)),
            Self::SlidingWindow {
                window,
                max_requests,
            } => Arc::new(SlidingWindow::new(*window, *max_requests)),
            Self::FixedWindow { window, rate } => Arc::new(FixedWindow::new(*window, *rate)),
            Self::Adaptive { base_rate, load_fn } => {
                Arc::new(Adaptive::new(*base_rate, Arc::clone(load_fn)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_bucket_admits_up_to_capacity_then_denies() {
        let bucket = TokenBucket::new(2, 0.0);
        assert!(matches!(bucket.check(), Decision::Admit { remaining: 1 }));
        assert!(matches!(bucket.check(), Decision::Admit { remaining: 0 }));
        assert!(matches!(bucket.check(), Decision::Deny { .. }));
    }

    #[test]
    fn token_bucket_refills_over_time() {
        let bucket = TokenBucket::new(1, 1000.0);
        assert!(matches!(bucket.check(), Decision::Admit { .. }));
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(bucket.check(), Decision::Admit { .. }));
    }

    #[test]
    fn sliding_window_denies_once_full() {
        let window = SlidingWindow::new(Duration::from_secs(1), 2);
        assert!(matches!(window.check(), Decision::Admit { .. }));
        assert!(matches!(window.check(), Decision::Admit { .. }));
        assert!(matches!(window.check(), Decision::Deny { .. }));
    }

    #[test]
    fn sliding_window_expires_old_entries() {
        let window = SlidingWindow::new(Duration::from_millis(20), 1);
        assert!(matches!(window.check(), Decision::Admit { .. }));
        assert!(matches!(window.check(), Decision::Deny { .. }));
        std::thread::sleep(Duration::from_millis(25));
        assert!(matches!(window.check(), Decision::Admit { .. }));
    }

    #[test]
    fn fixed_window_resets_at_boundary() {
        let window = FixedWindow::new(Duration::from_millis(20), 1);
        assert!(matches!(window.check(), Decision::Admit { .. }));
        assert!(matches!(window.check(), Decision::Deny { .. }));
        std::thread::sleep(Duration::from_millis(25));
        assert!(matches!(window.check(), Decision::Admit { .. }));
    }

    #[test]
    fn adaptive_shrinks_with_load() {
        let high_load = Adaptive::new(10.0, Arc::new(|| 0.95));
        assert!(matches!(high_load.check(), Decision::Deny { .. }));

        let no_load = Adaptive::new(10.0, Arc::new(|| 0.0));
        assert!(matches!(no_load.check(), Decision::Admit { .. }));
    }
}
