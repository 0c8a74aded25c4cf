//! Measures the per-call overhead a fully-composed pipeline adds over a
//! bare handler, the same comparison the teacher's
//! `benches/happy_path_overhead.rs` makes for its own `ServiceBuilder`
//! stack.

use criterion::{criterion_group, criterion_main, Criterion};
use gatekeeper::core::command::{Command, CommandTypeId};
use gatekeeper::core::context::Context;
use gatekeeper::core::error::PipelineError;
use gatekeeper::pipeline::PipelineBuilder;
use gatekeeper_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use gatekeeper_bulkhead::{Bulkhead, BulkheadConfig};
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Clone)]
struct Ping;

impl Command for Ping {
    type Result = Result<u64, PipelineError>;

    fn type_id(&self) -> CommandTypeId {
        CommandTypeId::new("Ping")
    }
}

async fn handler(_command: Ping, _context: &Context) -> Result<u64, PipelineError> {
    Ok(1)
}

fn bench_bare_handler(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let context = Context::new();

    c.bench_function("bare_handler", |b| {
        b.to_async(&runtime)
            .iter(|| async { handler(Ping, &context).await.unwrap() });
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let context = Context::new();

    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(100)
            .build(),
    );
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().max_concurrent_calls(64).build());

    let pipeline = PipelineBuilder::new()
        .circuit_breaker(breaker)
        .bulkhead(bulkhead)
        .build(|command, ctx| Box::pin(handler(command, ctx)));

    c.bench_function("circuit_breaker_and_bulkhead_pipeline", |b| {
        b.to_async(&runtime)
            .iter(|| async { pipeline.execute(Ping, &context).await.unwrap() });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(3));
    targets = bench_bare_handler, bench_full_pipeline
}
criterion_main!(benches);
