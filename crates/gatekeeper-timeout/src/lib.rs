//! Deadline enforcement: race an operation against a timeout, with an
//! optional grace period and cooperative cancellation.
//!
//! # Basic Example
//!
//! ```rust
//! use gatekeeper_timeout::{TimeoutConfig, TimeoutEnforcer};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let enforcer = TimeoutEnforcer::new(
//!     TimeoutConfig::builder()
//!         .default_timeout(Duration::from_secs(5))
//!         .build(),
//! );
//!
//! let result = enforcer
//!     .run(None, None, None, async { "done" })
//!     .await;
//! assert_eq!(result.unwrap(), "done");
//! # }
//! ```
//!
//! # Grace Period
//!
//! An operation that exceeds its timeout is given a second, shorter window
//! to finish before it is reported as failed:
//!
//! ```rust
//! use gatekeeper_timeout::{TimeoutConfig, TimeoutEnforcer};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let enforcer = TimeoutEnforcer::new(
//!     TimeoutConfig::builder()
//!         .default_timeout(Duration::from_millis(50))
//!         .grace_period(Duration::from_millis(200))
//!         .build(),
//! );
//! # }
//! ```

mod config;
mod enforcer;
mod error;
mod events;

pub use config::{TimeoutConfig, TimeoutConfigBuilder};
pub use enforcer::TimeoutEnforcer;
pub use error::{Result, TimeoutError};
pub use events::TimeoutEvent;
