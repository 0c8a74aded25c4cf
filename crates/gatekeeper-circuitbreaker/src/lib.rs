//! Closed/Open/HalfOpen circuit breaker (C3).
//!
//! [`CircuitBreaker`] tracks consecutive failures and trips open once they
//! reach `failure_threshold`, rejecting calls until `recovery_timeout`
//! elapses. It then admits a single probe call in the half-open state;
//! enough consecutive probe successes close the circuit, a single probe
//! failure reopens it.
//!
//! Unlike a `tower::Service` wrapper, this breaker never calls the guarded
//! work itself. [`CircuitBreaker::allow_request`] returns a [`Permission`]
//! token the caller must resolve with [`Permission::record_success`] or
//! [`Permission::record_failure`] once the call completes.
//!
//! ## Example
//!
//! ```rust
//! use gatekeeper_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::builder()
//!     .failure_threshold(5)
//!     .recovery_timeout(Duration::from_secs(30))
//!     .build();
//! let breaker = CircuitBreaker::new(config);
//!
//! match breaker.allow_request() {
//!     Ok(permission) => {
//!         // ... perform the guarded call ...
//!         permission.record_success();
//!     }
//!     Err(_) => {
//!         // circuit is open; fail fast
//!     }
//! }
//! ```

mod breaker;
mod config;
mod error;
mod events;
mod permission;
mod state;

pub use breaker::CircuitBreaker;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::{CircuitBreakerError, Result};
pub use events::CircuitBreakerEvent;
pub use permission::Permission;
pub use state::CircuitState;
