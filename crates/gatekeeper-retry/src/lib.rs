//! Retry engine with pluggable backoff strategies and a global retry budget.
//!
//! This crate drives a fallible async operation through up to a configured
//! number of attempts, backing off between failures according to a
//! [`BackoffStrategy`], and consulting a [`RetryClassify`] implementation (or
//! a caller-supplied predicate) to decide whether a given error is worth
//! retrying at all. Cancellation is never retried.
//!
//! # Examples
//!
//! ## Basic Retry with Exponential Backoff
//!
//! ```
//! use gatekeeper_retry::{RetryConfig, RetryEngine, RetryClassify};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)]
//! struct MyError(bool); // carries "is this a timeout?"
//!
//! impl RetryClassify for MyError {
//!     fn is_timeout(&self) -> bool {
//!         self.0
//!     }
//! }
//!
//! # async fn example() {
//! let engine = RetryEngine::new(
//!     RetryConfig::<MyError>::builder()
//!         .max_attempts(5)
//!         .exponential_backoff(Duration::from_millis(100), Duration::from_secs(10))
//!         .on_retry(|attempt, delay| {
//!             println!("retry attempt {attempt} after {delay:?}");
//!         })
//!         .build(),
//! );
//!
//! let result = engine.run(|| async { Ok::<_, MyError>("response") }).await;
//! # let _ = result;
//! # }
//! ```
//!
//! ## Bounding Total Retry Time with a Budget
//!
//! ```
//! use gatekeeper_retry::{RetryConfig, RetryEngine, RetryBudgetBuilder, RetryClassify};
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct MyError;
//! # impl RetryClassify for MyError {
//! #     fn is_timeout(&self) -> bool { true }
//! # }
//! # async fn example() {
//! let budget = RetryBudgetBuilder::new()
//!     .token_bucket()
//!     .max_tokens(50)
//!     .build();
//!
//! let engine = RetryEngine::new(
//!     RetryConfig::<MyError>::builder()
//!         .max_attempts(3)
//!         .max_retry_time(Duration::from_secs(5))
//!         .budget(budget)
//!         .build(),
//! );
//! # let _ = engine;
//! # }
//! ```

mod backoff;
mod budget;
mod config;
mod engine;
mod events;
mod policy;

pub use backoff::{BackoffStrategy, Custom, Exponential, ExponentialJitter, Fixed, Linear};
pub use budget::{AimdBudget, RetryBudget, RetryBudgetBuilder, TokenBucketBudget};
pub use config::{RetryConfig, RetryConfigBuilder, RetryPredicate};
pub use engine::RetryEngine;
pub use events::RetryEvent;
pub use policy::RetryClassify;
