//! Universally-quantified invariants, checked with `proptest` the way the
//! teacher's `tests/property_tests.rs` checks its own resilience
//! components against random inputs rather than a handful of fixed cases.

use gatekeeper_health::{HealthTracker, HealthTrackerConfig};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Health tracker: `successRate` stays in `[0, 1]` no matter how many
    /// successes/failures are recorded, and is a pure function of the
    /// window contents (recomputing a snapshot from the same window yields
    /// the same rate).
    #[test]
    fn health_tracker_success_rate_is_always_in_unit_interval(
        outcomes in proptest::collection::vec(any::<bool>(), 0..200),
    ) {
        let tracker = HealthTracker::new(HealthTrackerConfig::builder().window_size(50).build());
        for success in &outcomes {
            if *success {
                tracker.record_success("svc", Duration::from_millis(1));
            } else {
                tracker.record_failure("svc", Duration::from_millis(1));
            }
        }

        if let Some(snapshot) = tracker.snapshot("svc") {
            prop_assert!(snapshot.success_rate >= 0.0);
            prop_assert!(snapshot.success_rate <= 1.0);

            let second = tracker.snapshot("svc").unwrap();
            prop_assert_eq!(snapshot.success_rate, second.success_rate);
        }
    }
}

use gatekeeper_backpressure::{BackPressureConfig, BackPressureSemaphore, OverflowStrategy};

proptest! {
    /// For every observable state of a `BackPressureSemaphore`: held permits
    /// never exceed `max_concurrency`, and held-plus-queued never exceeds
    /// `max_outstanding`.
    #[test]
    fn backpressure_semaphore_never_exceeds_its_configured_budgets(
        max_concurrency in 1usize..8,
        acquire_attempts in 1usize..16,
    ) {
        let semaphore = BackPressureSemaphore::new(
            BackPressureConfig::builder()
                .max_concurrency(max_concurrency)
                .max_outstanding(max_concurrency * 2)
                .strategy(OverflowStrategy::DropNewest)
                .build(),
        );

        let mut tokens = Vec::new();
        for _ in 0..acquire_attempts {
            if let Some(token) = semaphore.try_acquire(0) {
                tokens.push(token);
            }
        }

        let stats = semaphore.stats();
        prop_assert!(stats.held_permits <= max_concurrency);
        prop_assert!(stats.held_permits + stats.queued_waiters <= max_concurrency * 2);

        let held_before_drop = stats.held_permits;
        drop(tokens);
        let stats_after = semaphore.stats();
        prop_assert_eq!(stats_after.held_permits, 0);
        prop_assert!(held_before_drop <= max_concurrency);
    }
}
