//! Per-key health tracking backed by rolling windows.

use crate::config::HealthTrackerConfig;
use crate::triggers::notify_triggers;
use crate::window::HealthWindow;
use crate::HealthState;
use dashmap::DashMap;
use gatekeeper_core::SharedHealthTrigger;
use parking_lot::Mutex;
use std::time::Duration;

/// Tracks health per service key using a rolling window of outcomes.
///
/// Each key gets its own [`HealthWindow`] in an internal `DashMap`, created
/// lazily on first use so callers never have to pre-register keys.
pub struct HealthTracker {
    config: HealthTrackerConfig,
    windows: DashMap<String, Mutex<HealthWindow>>,
    triggers: Mutex<Vec<SharedHealthTrigger>>,
}

impl HealthTracker {
    /// Creates a new tracker from the given configuration.
    pub fn new(config: HealthTrackerConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            triggers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a trigger to be notified when a key's effective health
    /// (collapsing `Degraded` into `Unhealthy`, mirroring
    /// [`gatekeeper_core::TriggerHealth`]) changes.
    pub fn add_trigger(&self, trigger: SharedHealthTrigger) {
        self.triggers.lock().push(trigger);
    }

    /// Records a successful call against `key`.
    pub fn record_success(&self, key: &str, duration: Duration) {
        self.update(key, |window| window.record_success(duration));
    }

    /// Records a failed call against `key`.
    pub fn record_failure(&self, key: &str, duration: Duration) {
        self.update(key, |window| window.record_failure(duration));
    }

    /// Records the result of an out-of-band active check against `key`.
    pub fn record_active_check(&self, key: &str, status: HealthState) {
        self.update(key, |window| window.record_active_check(status));
    }

    /// Returns the current derived state for `key`.
    ///
    /// A key that has never been recorded reports `Unknown`.
    pub fn state(&self, key: &str) -> HealthState {
        match self.windows.get(key) {
            Some(entry) => self.derive(&entry.lock()),
            None => HealthState::Unknown,
        }
    }

    /// Returns a snapshot of window statistics for `key`, if it exists.
    pub fn snapshot(&self, key: &str) -> Option<HealthSnapshot> {
        let entry = self.windows.get(key)?;
        let window = entry.lock();
        Some(HealthSnapshot {
            state: self.derive(&window),
            sample_count: window.sample_count(),
            success_rate: window.success_rate(),
            avg_duration: window.avg_duration(),
            consecutive_failures: window.consecutive_failures(),
            consecutive_successes: window.consecutive_successes(),
        })
    }

    fn derive(&self, window: &HealthWindow) -> HealthState {
        window.derive_state(
            self.config.min_requests,
            self.config.failure_threshold,
            self.config.success_threshold,
            self.config.success_rate_threshold,
            self.config.response_time_threshold,
        )
    }

    fn update(&self, key: &str, f: impl FnOnce(&mut HealthWindow)) {
        let entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(HealthWindow::new(self.config.window_size)));
        let mut window = entry.lock();
        let before = self.derive(&window);
        f(&mut window);
        let after = self.derive(&window);
        drop(window);

        if before != after {
            if let Some(callback) = &self.config.on_state_change {
                callback(key, before, after);
            }
            let triggers = self.triggers.lock();
            notify_triggers(&triggers, before, after);
        }
    }
}

/// A point-in-time snapshot of one key's rolling-window statistics.
#[derive(Debug, Clone, Copy)]
pub struct HealthSnapshot {
    /// The derived health state at the time of the snapshot.
    pub state: HealthState,
    /// Number of samples currently in the window.
    pub sample_count: usize,
    /// Fraction of windowed samples that succeeded.
    pub success_rate: f64,
    /// Average sample duration across the window.
    pub avg_duration: Duration,
    /// Consecutive failures observed since the last success.
    pub consecutive_failures: u32,
    /// Consecutive successes observed since the last failure.
    pub consecutive_successes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> HealthTracker {
        HealthTracker::new(
            HealthTrackerConfig::builder()
                .window_size(10)
                .min_requests(2)
                .failure_threshold(3)
                .success_threshold(2)
                .success_rate_threshold(0.5)
                .response_time_threshold(Duration::from_secs(1))
                .build(),
        )
    }

    #[test]
    fn unknown_key_reports_unknown() {
        let tracker = tracker();
        assert_eq!(tracker.state("unseen"), HealthState::Unknown);
    }

    #[test]
    fn keys_are_tracked_independently() {
        let tracker = tracker();
        tracker.record_success("a", Duration::from_millis(1));
        tracker.record_success("a", Duration::from_millis(1));
        for _ in 0..3 {
            tracker.record_failure("b", Duration::from_millis(1));
        }
        assert_eq!(tracker.state("a"), HealthState::Healthy);
        assert_eq!(tracker.state("b"), HealthState::Unhealthy);
    }

    #[test]
    fn snapshot_reports_counters() {
        let tracker = tracker();
        tracker.record_success("svc", Duration::from_millis(10));
        tracker.record_failure("svc", Duration::from_millis(20));
        let snapshot = tracker.snapshot("svc").expect("key exists");
        assert_eq!(snapshot.sample_count, 2);
        assert_eq!(snapshot.consecutive_failures, 1);
    }

    #[test]
    fn state_change_invokes_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let transitions = Arc::new(AtomicUsize::new(0));
        let transitions_clone = Arc::clone(&transitions);
        let config = HealthTrackerConfig::builder()
            .min_requests(1)
            .failure_threshold(2)
            .on_state_change(move |_key, _from, _to| {
                transitions_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let tracker = HealthTracker::new(config);
        tracker.record_failure("svc", Duration::from_millis(1));
        tracker.record_failure("svc", Duration::from_millis(1));
        assert!(transitions.load(Ordering::SeqCst) >= 1);
    }
}
