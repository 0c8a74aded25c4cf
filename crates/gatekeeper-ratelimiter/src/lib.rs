//! Rate limiter with pluggable admission strategies and request scoping.
//!
//! Four strategies are available: [`TokenBucket`](crate::strategy) (continuous
//! refill), sliding window, fixed window, and an adaptive strategy that
//! shrinks its effective rate under caller-reported load. Requests are routed
//! into independent buckets by [`Scope`]: a single global bucket, one per
//! user, one per command type, or a caller-supplied key function.
//!
//! # Examples
//!
//! ## Token Bucket, Scoped Per User
//!
//! ```
//! use gatekeeper_ratelimiter::{RateLimiter, RateLimiterConfig, RateLimitContext};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::builder()
//!         .token_bucket(100, 10.0)
//!         .scope_per_user()
//!         .on_denied(|key, reset_at| {
//!             println!("{key} rate limited, resets in {reset_at:?}");
//!         })
//!         .build(),
//! );
//!
//! let ctx = RateLimitContext {
//!     user_id: Some("alice"),
//!     command_type: None,
//! };
//! match limiter.check(&ctx) {
//!     Ok(remaining) => println!("admitted, {remaining} left"),
//!     Err(err) => println!("denied: {err}"),
//! }
//! ```
//!
//! ## Adaptive Rate Limiting
//!
//! ```
//! use gatekeeper_ratelimiter::{RateLimiter, RateLimiterConfig};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let cpu_load = Arc::new(AtomicU64::new(0)); // basis points, 0..=10000
//! let load = Arc::clone(&cpu_load);
//!
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::builder()
//!         .adaptive(1000.0, move || load.load(Ordering::Relaxed) as f64 / 10000.0)
//!         .build(),
//! );
//! # let _ = limiter;
//! ```

mod config;
mod error;
mod events;
mod limiter;
mod scope;
mod strategy;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::{RateLimitError, Result};
pub use events::RateLimiterEvent;
pub use limiter::RateLimiter;
pub use scope::{RateLimitContext, Scope};
pub use strategy::Decision;
