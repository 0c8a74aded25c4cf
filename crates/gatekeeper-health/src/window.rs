//! The rolling window of recent outcomes behind a single service key.

use crate::HealthState;
use std::collections::VecDeque;
use std::time::Duration;

/// One recorded outcome: whether the call succeeded and how long it took.
#[derive(Debug, Clone, Copy)]
struct Sample {
    success: bool,
    duration: Duration,
}

/// A time-bounded rolling sequence of outcomes for one service key.
///
/// Tracks the last `window_size` samples plus consecutive failure/success
/// streaks, and derives a [`HealthState`] from them against configured
/// thresholds.
pub struct HealthWindow {
    window_size: usize,
    samples: VecDeque<Sample>,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_active_check: Option<HealthState>,
}

impl HealthWindow {
    pub(crate) fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            samples: VecDeque::with_capacity(window_size.max(1)),
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_active_check: None,
        }
    }

    pub(crate) fn record_success(&mut self, duration: Duration) {
        self.push(Sample {
            success: true,
            duration,
        });
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
    }

    pub(crate) fn record_failure(&mut self, duration: Duration) {
        self.push(Sample {
            success: false,
            duration,
        });
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
    }

    pub(crate) fn record_active_check(&mut self, status: HealthState) {
        self.last_active_check = Some(status);
    }

    fn push(&mut self, sample: Sample) {
        if self.samples.len() >= self.window_size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of samples currently held in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Fraction of samples in the window that succeeded, `1.0` if empty.
    pub fn success_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 1.0;
        }
        let successes = self.samples.iter().filter(|s| s.success).count();
        successes as f64 / self.samples.len() as f64
    }

    /// Average sample duration, zero if the window is empty.
    pub fn avg_duration(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().map(|s| s.duration).sum();
        total / self.samples.len() as u32
    }

    /// Consecutive failures observed since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Consecutive successes observed since the last failure.
    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// The most recently reported result of an out-of-band active check.
    pub fn last_active_check(&self) -> Option<HealthState> {
        self.last_active_check
    }

    /// Derives a [`HealthState`] from the window's current counters against
    /// the given thresholds.
    ///
    /// Evaluated in order: unhealthy, then degraded, then unknown (not
    /// enough samples and no active check has run), then healthy.
    pub(crate) fn derive_state(
        &self,
        min_requests: usize,
        failure_threshold: u32,
        success_threshold: u32,
        success_rate_threshold: f64,
        response_time_threshold: Duration,
    ) -> HealthState {
        if self.consecutive_failures >= failure_threshold
            || self.last_active_check == Some(HealthState::Unhealthy)
        {
            return HealthState::Unhealthy;
        }

        if self.samples.len() < min_requests && self.last_active_check.is_none() {
            return HealthState::Unknown;
        }

        if self.success_rate() < success_rate_threshold
            || self.avg_duration() > response_time_threshold
        {
            return HealthState::Degraded;
        }

        if self.consecutive_successes >= success_threshold || self.consecutive_failures == 0 {
            return HealthState::Healthy;
        }

        HealthState::Degraded
    }
}
