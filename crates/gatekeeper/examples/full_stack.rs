//! Composes a rate limiter, circuit breaker, bulkhead and retry loop around
//! a flaky downstream call.
//!
//! This pipeline is built with `PipelineBuilder::retry`, so the result is a
//! `ResilientPipeline` rather than a bare `MiddlewareChain`.
//! `gatekeeper_executor::PipelineRegistry` routes plain chains by command
//! type and is the right tool once a service has more than one command to
//! dispatch, but it has no notion of the retry wrapper, so a single
//! resilient pipeline like this one is just called directly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gatekeeper::core::command::{Command, CommandTypeId};
use gatekeeper::core::context::Context;
use gatekeeper::core::error::PipelineError;
use gatekeeper::pipeline::PipelineBuilder;
use gatekeeper_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use gatekeeper_bulkhead::{Bulkhead, BulkheadConfig};
use gatekeeper_ratelimiter::{RateLimitContext, RateLimiterConfig, RateLimiter};
use gatekeeper_retry::{RetryConfig, RetryEngine};

#[derive(Clone)]
struct FetchQuote {
    attempts: Arc<AtomicU32>,
}

impl Command for FetchQuote {
    type Result = Result<&'static str, PipelineError>;

    fn type_id(&self) -> CommandTypeId {
        CommandTypeId::new("FetchQuote")
    }
}

async fn flaky_handler(
    command: FetchQuote,
    _context: &Context,
) -> Result<&'static str, PipelineError> {
    let attempt = command.attempts.fetch_add(1, Ordering::SeqCst);
    if attempt < 2 {
        Err(PipelineError::ServiceUnavailable {
            command_type: command.type_id(),
            service: "pricing-api".to_string(),
            reason: "connection reset".to_string(),
        })
    } else {
        Ok("$42.00")
    }
}

fn quote_rate_limit_context<'a>(_command: &'a FetchQuote, _context: &'a Context) -> RateLimitContext<'a> {
    RateLimitContext::default()
}

#[tokio::main]
async fn main() {
    let circuit_breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(5)
            .recovery_timeout(Duration::from_secs(30))
            .name("pricing-api")
            .build(),
    );

    let bulkhead = Bulkhead::new(
        BulkheadConfig::builder()
            .max_concurrent_calls(10)
            .name("pricing-api")
            .build(),
    );

    let rate_limiter = RateLimiter::new(
        RateLimiterConfig::builder()
            .token_bucket(100, 20.0)
            .name("pricing-api")
            .build(),
    );

    let retry_engine = RetryEngine::new(
        RetryConfig::builder()
            .max_attempts(3)
            .exponential_backoff(Duration::from_millis(50), Duration::from_secs(2))
            .name("pricing-api")
            .build(),
    );

    let pipeline = PipelineBuilder::new()
        .rate_limit(rate_limiter, Arc::new(quote_rate_limit_context))
        .circuit_breaker(circuit_breaker)
        .bulkhead(bulkhead)
        .retry(retry_engine)
        .build(|command, context| Box::pin(flaky_handler(command, context)));

    let context = Context::new();
    let command = FetchQuote {
        attempts: Arc::new(AtomicU32::new(0)),
    };

    match pipeline.execute(command, &context).await {
        Ok(price) => println!("quote: {price}"),
        Err(error) => println!("pipeline rejected the call: {error}"),
    }
}
