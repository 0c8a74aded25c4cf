//! The circuit breaker itself.

use crate::config::CircuitBreakerConfig;
use crate::error::{CircuitBreakerError, Result};
use crate::events::CircuitBreakerEvent;
use crate::permission::Permission;
use crate::state::CircuitState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A closed/open/half-open circuit breaker.
///
/// Calls are admitted by calling [`CircuitBreaker::allow_request`], which
/// returns a [`Permission`] the caller must resolve with
/// [`Permission::record_success`] or [`Permission::record_failure`] once the
/// guarded call completes. The breaker never wraps or calls the guarded work
/// itself; it only decides whether to admit it and tracks the outcome.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    config: Arc<CircuitBreakerConfig>,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker from the given configuration.
    pub fn new(config: Arc<CircuitBreakerConfig>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(CircuitState::initial()),
            }),
        }
    }

    /// The name this breaker was configured with.
    pub fn name(&self) -> &str {
        self.inner.config.name()
    }

    /// The breaker's current state.
    ///
    /// This is a snapshot: a closed circuit's idle failure-reset and an
    /// open circuit's recovery-timeout elapse are only applied lazily, at
    /// the next [`CircuitBreaker::allow_request`] call, so this may briefly
    /// report a circuit as open past its `recovery_timeout`.
    pub fn state(&self) -> CircuitState {
        *self.inner.state.lock()
    }

    /// Attempts to admit a call.
    ///
    /// Returns a [`Permission`] the caller must resolve, or
    /// [`CircuitBreakerError::Open`] if the circuit is open (or half-open
    /// with a probe already in flight).
    pub fn allow_request(&self) -> Result<Permission> {
        self.inner.allow_request()
    }
}

impl Inner {
    fn emit(&self, event: CircuitBreakerEvent) {
        self.config.event_listeners.emit(&event);
    }

    fn allow_request(self: &Arc<Self>) -> Result<Permission> {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed {
                failures,
                last_failure_at,
            } => {
                if failures > 0 {
                    if let Some(last) = last_failure_at {
                        if last.elapsed() >= self.config.reset_timeout() {
                            *state = CircuitState::Closed {
                                failures: 0,
                                last_failure_at: None,
                            };
                        }
                    }
                }
                let permitted_state = *state;
                drop(state);
                self.emit(CircuitBreakerEvent::CallPermitted {
                    pattern_name: self.config.name().to_string(),
                    timestamp: Instant::now(),
                    state: permitted_state,
                });
                Ok(Permission::new(Arc::clone(self)))
            }
            CircuitState::Open { until } => {
                if Instant::now() >= until {
                    let from = *state;
                    *state = CircuitState::HalfOpen {
                        successes: 0,
                        probe_in_flight: true,
                    };
                    let to = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::StateTransition {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        from_state: from,
                        to_state: to,
                    });
                    self.emit(CircuitBreakerEvent::CallPermitted {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        state: to,
                    });
                    Ok(Permission::new(Arc::clone(self)))
                } else {
                    drop(state);
                    self.emit(CircuitBreakerEvent::CallRejected {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                    });
                    Err(CircuitBreakerError::Open)
                }
            }
            CircuitState::HalfOpen {
                successes,
                probe_in_flight,
            } => {
                if probe_in_flight {
                    drop(state);
                    self.emit(CircuitBreakerEvent::CallRejected {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                    });
                    Err(CircuitBreakerError::Open)
                } else {
                    *state = CircuitState::HalfOpen {
                        successes,
                        probe_in_flight: true,
                    };
                    let permitted_state = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::CallPermitted {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        state: permitted_state,
                    });
                    Ok(Permission::new(Arc::clone(self)))
                }
            }
        }
    }

    pub(crate) fn record_success(&self, _duration: Duration) {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { .. } => {
                *state = CircuitState::Closed {
                    failures: 0,
                    last_failure_at: None,
                };
                let snapshot = *state;
                drop(state);
                self.emit(CircuitBreakerEvent::SuccessRecorded {
                    pattern_name: self.config.name().to_string(),
                    timestamp: Instant::now(),
                    state: snapshot,
                });
            }
            CircuitState::HalfOpen { successes, .. } => {
                let successes = successes + 1;
                if successes >= self.config.half_open_success_threshold() {
                    let from = *state;
                    *state = CircuitState::initial();
                    let to = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::SuccessRecorded {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        state: from,
                    });
                    self.emit(CircuitBreakerEvent::StateTransition {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        from_state: from,
                        to_state: to,
                    });
                } else {
                    *state = CircuitState::HalfOpen {
                        successes,
                        probe_in_flight: false,
                    };
                    let snapshot = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::SuccessRecorded {
                        pattern_name: self.config.name().to_string(),
                        timestamp: Instant::now(),
                        state: snapshot,
                    });
                }
            }
            CircuitState::Open { .. } => {
                // A success reported after the breaker reopened from under
                // the caller (e.g. a slow probe racing a timer). Nothing to
                // update; the open window already governs admission.
            }
        }
    }

    pub(crate) fn record_failure(&self, _duration: Duration) {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { failures, .. } => {
                let failures = failures + 1;
                let now = Instant::now();
                if failures >= self.config.failure_threshold() {
                    let from = *state;
                    *state = CircuitState::Open {
                        until: now + self.config.recovery_timeout(),
                    };
                    let to = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::FailureRecorded {
                        pattern_name: self.config.name().to_string(),
                        timestamp: now,
                        state: from,
                    });
                    self.emit(CircuitBreakerEvent::StateTransition {
                        pattern_name: self.config.name().to_string(),
                        timestamp: now,
                        from_state: from,
                        to_state: to,
                    });
                } else {
                    *state = CircuitState::Closed {
                        failures,
                        last_failure_at: Some(now),
                    };
                    let snapshot = *state;
                    drop(state);
                    self.emit(CircuitBreakerEvent::FailureRecorded {
                        pattern_name: self.config.name().to_string(),
                        timestamp: now,
                        state: snapshot,
                    });
                }
            }
            CircuitState::HalfOpen { .. } => {
                let from = *state;
                let now = Instant::now();
                *state = CircuitState::Open {
                    until: now + self.config.recovery_timeout(),
                };
                let to = *state;
                drop(state);
                self.emit(CircuitBreakerEvent::FailureRecorded {
                    pattern_name: self.config.name().to_string(),
                    timestamp: now,
                    state: from,
                });
                self.emit(CircuitBreakerEvent::StateTransition {
                    pattern_name: self.config.name().to_string(),
                    timestamp: now,
                    from_state: from,
                    to_state: to,
                });
            }
            CircuitState::Open { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn breaker(failure_threshold: u32, recovery_timeout: Duration) -> CircuitBreaker {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(failure_threshold)
            .recovery_timeout(recovery_timeout)
            .half_open_success_threshold(1)
            .build();
        CircuitBreaker::new(config)
    }

    #[test]
    fn starts_closed_and_admits_calls() {
        let cb = breaker(3, Duration::from_millis(50));
        assert!(cb.state().is_closed());
        let permission = cb.allow_request().expect("should admit");
        permission.record_success();
        assert!(cb.state().is_closed());
    }

    #[test]
    fn opens_after_failure_threshold_is_reached() {
        let cb = breaker(2, Duration::from_secs(60));
        cb.allow_request().unwrap().record_failure();
        assert!(cb.state().is_closed());
        cb.allow_request().unwrap().record_failure();
        assert!(cb.state().is_open());
    }

    #[test]
    fn open_circuit_rejects_calls_until_recovery_timeout() {
        let cb = breaker(1, Duration::from_millis(30));
        cb.allow_request().unwrap().record_failure();
        assert!(cb.state().is_open());
        assert!(matches!(cb.allow_request(), Err(CircuitBreakerError::Open)));

        sleep(Duration::from_millis(40));
        let permission = cb.allow_request().expect("should admit a probe");
        assert!(cb.state().is_half_open());
        permission.record_success();
        assert!(cb.state().is_closed());
    }

    #[test]
    fn half_open_admits_only_one_probe_at_a_time() {
        let cb = breaker(1, Duration::from_millis(10));
        cb.allow_request().unwrap().record_failure();
        sleep(Duration::from_millis(15));
        let probe = cb.allow_request().expect("first probe admitted");
        assert!(cb.state().is_half_open());
        assert!(matches!(cb.allow_request(), Err(CircuitBreakerError::Open)));
        probe.record_success();
    }

    #[test]
    fn half_open_failure_reopens_the_circuit() {
        let cb = breaker(1, Duration::from_millis(10));
        cb.allow_request().unwrap().record_failure();
        sleep(Duration::from_millis(15));
        let probe = cb.allow_request().unwrap();
        probe.record_failure();
        assert!(cb.state().is_open());
    }

    #[test]
    fn half_open_requires_consecutive_successes_before_closing() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .recovery_timeout(Duration::from_millis(10))
            .half_open_success_threshold(2)
            .build();
        let cb = CircuitBreaker::new(config);
        cb.allow_request().unwrap().record_failure();
        sleep(Duration::from_millis(15));
        cb.allow_request().unwrap().record_success();
        assert!(cb.state().is_half_open());
        cb.allow_request().unwrap().record_success();
        assert!(cb.state().is_closed());
    }

    #[test]
    fn idle_closed_circuit_resets_failure_count_after_reset_timeout() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .reset_timeout(Duration::from_millis(10))
            .build();
        let cb = CircuitBreaker::new(config);
        cb.allow_request().unwrap().record_failure();
        cb.allow_request().unwrap().record_failure();
        assert!(matches!(cb.state(), CircuitState::Closed { failures: 2, .. }));

        sleep(Duration::from_millis(15));
        cb.allow_request().unwrap().record_success();
        assert!(matches!(
            cb.state(),
            CircuitState::Closed {
                failures: 0,
                last_failure_at: None
            }
        ));
    }
}
