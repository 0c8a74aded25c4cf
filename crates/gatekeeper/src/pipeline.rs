//! Wires the standalone resilience components into [`gatekeeper_middleware`]
//! adapters, and a [`PipelineBuilder`] that composes them in the order most
//! deployments want: rate limit, then circuit breaker, then bulkhead, then
//! timeout, then retry.
//!
//! None of [`gatekeeper_circuitbreaker::CircuitBreaker`],
//! [`gatekeeper_bulkhead::Bulkhead`], [`gatekeeper_ratelimiter::RateLimiter`],
//! [`gatekeeper_timeout::TimeoutEnforcer`] or [`gatekeeper_retry::RetryEngine`]
//! know anything about [`gatekeeper_middleware::Middleware`] themselves; each
//! adapter here just translates one component's admit/record-outcome or
//! run-an-operation API into the chain-of-responsibility shape the pipeline
//! expects.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::BoxFuture;

use gatekeeper_core::command::Command;
use gatekeeper_core::context::Context;
use gatekeeper_core::error::{BackPressureReason, BulkheadRejectionReason, PipelineError, ResilienceExhaustion};
use gatekeeper_core::priority::Priority;
use gatekeeper_middleware::{Middleware, MiddlewareChainBuilder, Next};

use gatekeeper_backpressure::{BackPressureSemaphore, WaiterPriority};
use gatekeeper_bulkhead::Bulkhead;
use gatekeeper_circuitbreaker::CircuitBreaker;
use gatekeeper_ratelimiter::{RateLimitContext, RateLimiter};
use gatekeeper_retry::RetryEngine;
use gatekeeper_timeout::TimeoutEnforcer;

/// A command whose result is a [`Result`] carrying the closed
/// [`PipelineError`] taxonomy. The resilience middleware adapters in this
/// module require this bound so they can report their own rejections
/// without forcing every caller to hand-write a `From` impl.
pub trait PipelineCommand: Command<Result = Result<<Self as PipelineCommand>::Ok, PipelineError>> {
    /// The value produced by a successful execution.
    type Ok: Send + 'static;
}

impl<C, T> PipelineCommand for C
where
    C: Command<Result = Result<T, PipelineError>>,
    T: Send + 'static,
{
    type Ok = T;
}

/// Admits calls through a [`gatekeeper_circuitbreaker::CircuitBreaker`],
/// recording the downstream outcome back into the breaker once `next`
/// resolves.
pub struct CircuitBreakerMiddleware {
    breaker: CircuitBreaker,
}

impl CircuitBreakerMiddleware {
    /// Wraps an already-configured breaker.
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self { breaker }
    }
}

impl<C: PipelineCommand> Middleware<C> for CircuitBreakerMiddleware {
    fn priority(&self) -> Priority {
        Priority::Resilience
    }

    fn name(&self) -> &str {
        "circuit_breaker"
    }

    fn execute<'a>(&'a self, command: C, context: &'a Context, next: Next<'a, C>) -> BoxFuture<'a, C::Result> {
        Box::pin(async move {
            let permission = match self.breaker.allow_request() {
                Ok(permission) => permission,
                Err(_) => {
                    return Err(PipelineError::CircuitBreakerOpen {
                        command_type: command.type_id(),
                    })
                }
            };

            let result = next.call(command, context).await;
            match &result {
                Ok(_) => permission.record_success(),
                Err(_) => permission.record_failure(),
            }
            result
        })
    }
}

/// Admits calls through a [`gatekeeper_bulkhead::Bulkhead`], holding the
/// returned token for the duration of the downstream call.
pub struct BulkheadMiddleware {
    bulkhead: Bulkhead,
}

impl BulkheadMiddleware {
    /// Wraps an already-configured bulkhead.
    pub fn new(bulkhead: Bulkhead) -> Self {
        Self { bulkhead }
    }
}

impl<C: PipelineCommand> Middleware<C> for BulkheadMiddleware {
    fn priority(&self) -> Priority {
        Priority::Resilience
    }

    fn name(&self) -> &str {
        "bulkhead"
    }

    fn execute<'a>(&'a self, command: C, context: &'a Context, next: Next<'a, C>) -> BoxFuture<'a, C::Result> {
        Box::pin(async move {
            let command_type = command.type_id();
            let token = self.bulkhead.acquire().await.map_err(|error| match error {
                gatekeeper_bulkhead::BulkheadError::Full { .. } => PipelineError::BulkheadRejected {
                    command_type,
                    reason: BulkheadRejectionReason::AtCapacity,
                },
                gatekeeper_bulkhead::BulkheadError::Timeout { queued_for, .. } => PipelineError::BulkheadTimeout {
                    command_type,
                    timeout: queued_for,
                    queue_time: queued_for,
                },
            })?;

            let result = next.call(command, context).await;
            drop(token);
            result
        })
    }
}

/// Admits calls through a [`gatekeeper_backpressure::BackPressureSemaphore`]
/// shared, process-wide concurrency budget.
pub struct BackPressureMiddleware {
    semaphore: BackPressureSemaphore,
    estimated_bytes: usize,
}

impl BackPressureMiddleware {
    /// Wraps an already-configured semaphore. `estimated_bytes` is the
    /// memory weight charged against the semaphore's memory budget for each
    /// admitted call; pass `0` if the pipeline doesn't track memory.
    pub fn new(semaphore: BackPressureSemaphore, estimated_bytes: usize) -> Self {
        Self { semaphore, estimated_bytes }
    }
}

impl<C: PipelineCommand> Middleware<C> for BackPressureMiddleware {
    fn priority(&self) -> Priority {
        Priority::Resilience
    }

    fn name(&self) -> &str {
        "back_pressure"
    }

    fn execute<'a>(&'a self, command: C, context: &'a Context, next: Next<'a, C>) -> BoxFuture<'a, C::Result> {
        Box::pin(async move {
            let command_type = command.type_id();
            let _token = self
                .semaphore
                .acquire(self.estimated_bytes, WaiterPriority::default())
                .await
                .map_err(|error| match error {
                    gatekeeper_backpressure::BackPressureError::QueueFull => PipelineError::BackPressure {
                        command_type,
                        reason: BackPressureReason::QueueFull,
                    },
                    gatekeeper_backpressure::BackPressureError::MemoryPressure => PipelineError::BackPressure {
                        command_type,
                        reason: BackPressureReason::MemoryPressure,
                    },
                    gatekeeper_backpressure::BackPressureError::Timeout(_)
                    | gatekeeper_backpressure::BackPressureError::Cancelled => {
                        PipelineError::Cancelled { command_type }
                    }
                })?;

            next.call(command, context).await
        })
    }
}

/// A function that resolves a [`RateLimitContext`] from a command and its
/// execution [`Context`]. Supplied by the caller since only they know how to
/// derive a user id or command label from their own command types.
pub type RateLimitContextFn<C> = Arc<dyn for<'a> Fn(&'a C, &'a Context) -> RateLimitContext<'a> + Send + Sync>;

/// Admits calls through a [`gatekeeper_ratelimiter::RateLimiter`].
pub struct RateLimitMiddleware<C: PipelineCommand> {
    limiter: RateLimiter,
    context_fn: RateLimitContextFn<C>,
}

impl<C: PipelineCommand> RateLimitMiddleware<C> {
    /// Wraps an already-configured rate limiter. `context_fn` derives the
    /// scoping context (user id, command label) from the command itself.
    pub fn new(limiter: RateLimiter, context_fn: RateLimitContextFn<C>) -> Self {
        Self { limiter, context_fn }
    }
}

impl<C: PipelineCommand> Middleware<C> for RateLimitMiddleware<C> {
    fn priority(&self) -> Priority {
        Priority::RateLimit
    }

    fn name(&self) -> &str {
        "rate_limit"
    }

    fn execute<'a>(&'a self, command: C, context: &'a Context, next: Next<'a, C>) -> BoxFuture<'a, C::Result> {
        Box::pin(async move {
            let command_type = command.type_id();
            let rate_limit_context = (self.context_fn)(&command, context);
            match self.limiter.check(&rate_limit_context) {
                Ok(_remaining) => next.call(command, context).await,
                Err(gatekeeper_ratelimiter::RateLimitError::Exceeded { remaining, reset_at, .. }) => {
                    Err(PipelineError::RateLimit {
                        command_type,
                        remaining: Some(remaining),
                        reset_at: Some(reset_at),
                    })
                }
            }
        })
    }
}

/// Races the downstream call against a
/// [`gatekeeper_timeout::TimeoutEnforcer`]'s resolved deadline.
pub struct TimeoutMiddleware {
    enforcer: TimeoutEnforcer,
    type_key: Option<String>,
}

impl TimeoutMiddleware {
    /// Wraps an already-configured enforcer. `type_key` selects a
    /// per-command-type override registered on the enforcer's config, if any.
    pub fn new(enforcer: TimeoutEnforcer, type_key: Option<String>) -> Self {
        Self { enforcer, type_key }
    }
}

impl<C: PipelineCommand> Middleware<C> for TimeoutMiddleware {
    fn priority(&self) -> Priority {
        Priority::Resilience
    }

    fn name(&self) -> &str {
        "timeout"
    }

    fn execute<'a>(&'a self, command: C, context: &'a Context, next: Next<'a, C>) -> BoxFuture<'a, C::Result> {
        Box::pin(async move {
            let command_type = command.type_id();
            let declared = command.declared_timeout();
            let type_key = self.type_key.as_deref();

            self.enforcer
                .run(type_key, declared, None, next.call(command, context))
                .await
                .unwrap_or_else(|error| {
                    Err(match error {
                        gatekeeper_timeout::TimeoutError::Exceeded { duration } => PipelineError::Timeout {
                            command_type,
                            duration,
                            context: "no grace period configured".to_string(),
                        },
                        gatekeeper_timeout::TimeoutError::GracePeriodExpired { total, .. } => PipelineError::Timeout {
                            command_type,
                            duration: total,
                            context: "grace period also expired".to_string(),
                        },
                        gatekeeper_timeout::TimeoutError::Cancelled => PipelineError::Cancelled { command_type },
                    })
                })
        })
    }
}

/// A built middleware chain, optionally wrapped in a retry loop.
///
/// [`gatekeeper_middleware::Next`] enforces that a single middleware calls
/// `next` at most once per dispatch, so retrying can't live inside the
/// chain as an ordinary middleware the way the circuit breaker or bulkhead
/// do: a middleware that called `next.call` twice would trip that guard.
/// Instead `ResilientPipeline` wraps the *entire* chain dispatch in
/// [`gatekeeper_retry::RetryEngine::run`], which is built exactly for this
/// ("pass a closure that builds a fresh future each time"): each retried
/// attempt re-enters the chain from the top, so it passes back through the
/// rate limiter, circuit breaker and bulkhead exactly as a fresh call would.
pub struct ResilientPipeline<C: Command> {
    chain: gatekeeper_middleware::MiddlewareChain<C>,
    retry: Option<RetryEngine<PipelineError>>,
}

impl<C: PipelineCommand + Clone> ResilientPipeline<C> {
    /// Dispatches `command` through the chain, retrying the whole dispatch
    /// per the configured retry policy if one was set.
    pub async fn execute<'a>(&'a self, command: C, context: &'a Context) -> C::Result {
        match &self.retry {
            Some(engine) => {
                engine
                    .run(|| {
                        let command = command.clone();
                        let fut: Pin<Box<dyn Future<Output = C::Result> + Send + 'a>> =
                            Box::pin(self.chain.dispatch(command, context));
                        fut
                    })
                    .await
            }
            None => self.chain.dispatch(command, context).await,
        }
    }
}

/// Composes the standard resilience middleware in the order most
/// deployments want them: rate limit admits first (cheapest check), then the
/// circuit breaker, then the bulkhead/back-pressure budget, then the
/// timeout. Retry, if configured, wraps the whole chain rather than sitting
/// inside it (see [`ResilientPipeline`]).
///
/// Every component is optional; omitted stages are simply absent from the
/// built chain.
pub struct PipelineBuilder<C: PipelineCommand> {
    rate_limit: Option<RateLimitMiddleware<C>>,
    circuit_breaker: Option<CircuitBreakerMiddleware>,
    bulkhead: Option<BulkheadMiddleware>,
    back_pressure: Option<BackPressureMiddleware>,
    timeout: Option<TimeoutMiddleware>,
    retry: Option<RetryEngine<PipelineError>>,
}

impl<C: PipelineCommand> Default for PipelineBuilder<C> {
    fn default() -> Self {
        Self {
            rate_limit: None,
            circuit_breaker: None,
            bulkhead: None,
            back_pressure: None,
            timeout: None,
            retry: None,
        }
    }
}

impl<C: PipelineCommand> PipelineBuilder<C> {
    /// Starts with no middleware configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits calls through `limiter` before anything else in the chain.
    pub fn rate_limit(mut self, limiter: RateLimiter, context_fn: RateLimitContextFn<C>) -> Self {
        self.rate_limit = Some(RateLimitMiddleware::new(limiter, context_fn));
        self
    }

    /// Admits calls through `breaker`.
    pub fn circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(CircuitBreakerMiddleware::new(breaker));
        self
    }

    /// Admits calls through `bulkhead`.
    pub fn bulkhead(mut self, bulkhead: Bulkhead) -> Self {
        self.bulkhead = Some(BulkheadMiddleware::new(bulkhead));
        self
    }

    /// Admits calls through `semaphore`, a shared back-pressure budget.
    pub fn back_pressure(mut self, semaphore: BackPressureSemaphore, estimated_bytes: usize) -> Self {
        self.back_pressure = Some(BackPressureMiddleware::new(semaphore, estimated_bytes));
        self
    }

    /// Races calls against `enforcer`'s resolved deadline.
    pub fn timeout(mut self, enforcer: TimeoutEnforcer, type_key: Option<String>) -> Self {
        self.timeout = Some(TimeoutMiddleware::new(enforcer, type_key));
        self
    }

    /// Retries a failed dispatch of the whole chain per `engine`'s
    /// configured policy.
    pub fn retry(mut self, engine: RetryEngine<PipelineError>) -> Self {
        self.retry = Some(engine);
        self
    }

    /// Builds the chain around `handler`, registering every configured
    /// admission stage in the recommended order, and wraps it in a retry
    /// loop if one was configured.
    pub fn build<F>(self, handler: F) -> ResilientPipeline<C>
    where
        C: Clone,
        F: for<'ctx> Fn(C, &'ctx Context) -> BoxFuture<'ctx, C::Result> + Send + Sync + 'static,
    {
        let mut builder: MiddlewareChainBuilder<C> = gatekeeper_middleware::MiddlewareChain::builder(handler);
        if let Some(rate_limit) = self.rate_limit {
            builder = builder.middleware(rate_limit);
        }
        if let Some(circuit_breaker) = self.circuit_breaker {
            builder = builder.middleware(circuit_breaker);
        }
        if let Some(bulkhead) = self.bulkhead {
            builder = builder.middleware(bulkhead);
        }
        if let Some(back_pressure) = self.back_pressure {
            builder = builder.middleware(back_pressure);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.middleware(timeout);
        }
        ResilientPipeline {
            chain: builder.build(),
            retry: self.retry,
        }
    }
}

/// Reports a retry budget's exhaustion (distinct from the engine's own
/// attempt-count exhaustion) as a [`PipelineError::Resilience`].
pub fn resilience_exhausted(command_type: gatekeeper_core::command::CommandTypeId, attempts: u32) -> PipelineError {
    PipelineError::Resilience {
        command_type,
        detail: ResilienceExhaustion::RetryExhausted { attempts },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::command::CommandTypeId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    struct Ping {
        attempt_counter: Arc<AtomicU32>,
        fail_first_n: u32,
    }

    impl Command for Ping {
        type Result = Result<&'static str, PipelineError>;

        fn type_id(&self) -> CommandTypeId {
            CommandTypeId::new("Ping")
        }
    }

    fn handler(command: Ping, _context: &Context) -> BoxFuture<'static, Result<&'static str, PipelineError>> {
        Box::pin(async move {
            let attempt = command.attempt_counter.fetch_add(1, Ordering::SeqCst);
            if attempt < command.fail_first_n {
                Err(PipelineError::ServiceUnavailable {
                    command_type: command.type_id(),
                    service: "downstream".to_string(),
                    reason: "not yet".to_string(),
                })
            } else {
                Ok("pong")
            }
        })
    }

    #[tokio::test]
    async fn circuit_breaker_rejects_without_calling_next_once_open() {
        let config = gatekeeper_circuitbreaker::CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(60))
            .build();
        let breaker = CircuitBreaker::new(config);

        let pipeline: ResilientPipeline<Ping> = PipelineBuilder::new()
            .circuit_breaker(breaker)
            .build(handler);

        let context = Context::new();
        let command = Ping {
            attempt_counter: Arc::new(AtomicU32::new(0)),
            fail_first_n: u32::MAX,
        };

        let first = pipeline.execute(command.clone(), &context).await;
        assert!(first.is_err());

        let second = pipeline.execute(command, &context).await;
        assert!(matches!(second, Err(PipelineError::CircuitBreakerOpen { .. })));
    }

    #[tokio::test]
    async fn retry_middleware_recovers_after_transient_failures() {
        let engine = RetryEngine::new(
            gatekeeper_retry::RetryConfig::builder()
                .max_attempts(5)
                .fixed_backoff(Duration::from_millis(1))
                .build(),
        );

        let pipeline: ResilientPipeline<Ping> = PipelineBuilder::new().retry(engine).build(handler);

        let context = Context::new();
        let command = Ping {
            attempt_counter: Arc::new(AtomicU32::new(0)),
            fail_first_n: 2,
        };

        let result = pipeline.execute(command, &context).await;
        assert_eq!(result.unwrap(), "pong");
    }
}
