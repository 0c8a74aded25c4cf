//! A command-execution pipeline with resilience middleware wired in the
//! recommended admission order.
//!
//! Applications define [`Command`](gatekeeper_core::Command) types and
//! register each one against a [`MiddlewareChain`](gatekeeper_middleware::MiddlewareChain)
//! via [`PipelineRegistry`](gatekeeper_executor::PipelineRegistry). This
//! crate's own contribution is [`pipeline::PipelineBuilder`]: it wraps the
//! standalone resilience components (circuit breaker, bulkhead, rate
//! limiter, timeout, retry) as middleware adapters and composes them in the
//! order most deployments want, so wiring a pipeline by hand never means
//! re-deriving that ordering.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! gatekeeper = { version = "0.1" }
//! ```
//!
//! # Resilience Patterns
//!
//! - **Circuit Breaker** ([`gatekeeper_circuitbreaker`]) - Stops calling a failing service
//! - **Bulkhead** ([`gatekeeper_bulkhead`]) - Isolates concurrency budgets per partition
//! - **Back-pressure** ([`gatekeeper_backpressure`]) - Bounds outstanding work process-wide
//! - **Timeout** ([`gatekeeper_timeout`]) - Deadline-races an operation, with a grace period
//! - **Retry** ([`gatekeeper_retry`]) - Backs off and retries transient failures
//! - **Rate Limiter** ([`gatekeeper_ratelimiter`]) - Controls request rate per scope key
//! - **Health Tracker** ([`gatekeeper_health`]) - Tracks a service's health from call outcomes
//! - **Object Pool** ([`gatekeeper_pool`]) - Bounded reuse with a process-wide shrink hook
//!
//! # Pattern Guides
//!
//! ## Circuit Breaker
//!
//! Stops admitting calls to a dependency once it has failed enough times in
//! a row, and lets a single probe call through after a recovery timeout to
//! decide whether to close again.
//!
//! ### When to Use
//!
//! - A downstream dependency is failing and retries alone would just pile
//!   more load onto it
//! - Cascading failures need a circuit breaker between services, not just
//!   at the edge
//! - A degraded fallback exists and failing fast matters more than trying
//!
//! ### Trade-offs
//!
//! - Fails fast rather than retrying; combine with retry for recoverable
//!   errors once the circuit is closed again
//! - Requires a sensible `failure_threshold` and `recovery_timeout`; too
//!   aggressive and legitimate traffic spikes trip it
//!
//! ## Bulkhead
//!
//! Caps concurrent calls per partition so one overloaded dependency can't
//! starve every other caller sharing the process.
//!
//! ### When to Use
//!
//! - Multiple downstream dependencies share a thread or connection pool
//! - One noisy tenant or command type shouldn't be able to exhaust capacity
//!   another tenant needs
//!
//! ## Retry
//!
//! Retries a failed call with backoff, consulting
//! [`gatekeeper_retry::RetryClassify`] (or a caller-supplied predicate) to
//! decide whether an error is worth retrying at all.
//!
//! ### When to Use
//!
//! - Failures are transient (network blips, brief overload) rather than
//!   permanent (validation, authorization)
//! - The retried call is idempotent, or the caller accepts the risk
//!
//! ### Trade-offs
//!
//! - A cancelled operation is never retried regardless of a caller-supplied
//!   predicate, by design
//! - Retrying re-enters the whole pipeline from the top (see
//!   [`pipeline::ResilientPipeline`]), so it passes back through the rate
//!   limiter and circuit breaker exactly as a fresh call would rather than
//!   bypassing them
//!
//! ## Rate Limiter
//!
//! Admits or denies calls per scope key (global, per-user, per-command, or a
//! custom key function), using a token bucket, fixed window, sliding
//! window, or adaptive strategy.
//!
//! ## Timeout
//!
//! Races an operation against a resolved deadline, with an optional grace
//! period raced separately once the primary deadline fires.
//!
//! # Composition
//!
//! ```text
//! Typical service pipeline
//! ├─ Rate limiter   (cheapest check, scoped per caller)
//! ├─ Circuit breaker (stop calling a known-failing dependency)
//! ├─ Bulkhead / back-pressure (bound concurrency)
//! ├─ Timeout         (bound latency)
//! └─ Retry           (wraps the whole chain; re-enters from the top)
//! ```
//!
//! See [`pipeline::PipelineBuilder`] for building this composition, and
//! [`gatekeeper_executor::PipelineRegistry`] for routing multiple command
//! types to their own pipelines. The registry stores a bare
//! [`middleware::MiddlewareChain`], so a pipeline built with
//! [`pipeline::PipelineBuilder::retry`] is dispatched directly through
//! [`pipeline::ResilientPipeline::execute`] rather than registered.

pub mod pipeline;

pub use gatekeeper_core as core;
pub use gatekeeper_middleware as middleware;
pub use gatekeeper_executor as executor;

pub use gatekeeper_backpressure as backpressure;
pub use gatekeeper_bulkhead as bulkhead;
pub use gatekeeper_circuitbreaker as circuitbreaker;
pub use gatekeeper_health as health;
pub use gatekeeper_pool as pool;
pub use gatekeeper_ratelimiter as ratelimiter;
pub use gatekeeper_retry as retry;
pub use gatekeeper_timeout as timeout;

pub use pipeline::{PipelineBuilder, PipelineCommand, ResilientPipeline};
