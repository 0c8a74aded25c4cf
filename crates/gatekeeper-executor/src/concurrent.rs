//! Wraps a whole [`PipelineRegistry`] in a single shared concurrency budget.

use gatekeeper_backpressure::{BackPressureConfig, BackPressureSemaphore, WaiterPriority};
use gatekeeper_core::command::Command;
use gatekeeper_core::context::Context;

use crate::error::Result;
use crate::registry::PipelineRegistry;

/// Enforces one `maxConcurrency`/`maxOutstanding` budget across *every*
/// pipeline registered in the wrapped [`PipelineRegistry`], rather than each
/// pipeline's own middlewares enforcing independent budgets.
///
/// A call that cannot be admitted fails with
/// [`crate::ExecutorError::BackPressure`] before it ever reaches a
/// pipeline's middleware chain.
pub struct ConcurrentPipeline {
    registry: PipelineRegistry,
    semaphore: BackPressureSemaphore,
}

impl ConcurrentPipeline {
    /// Wraps `registry` with a semaphore built from `config`.
    pub fn new(registry: PipelineRegistry, config: BackPressureConfig) -> Self {
        Self {
            registry,
            semaphore: BackPressureSemaphore::new(config),
        }
    }

    /// The wrapped registry, for registering and deregistering pipelines.
    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Acquires a shared permit, then dispatches `command` through the
    /// registry exactly as [`PipelineRegistry::execute`] would.
    pub async fn execute<C: Command>(
        &self,
        command: C,
        context: &Context,
        name: Option<&str>,
    ) -> Result<C::Result> {
        self.execute_with_priority(command, context, name, WaiterPriority::Normal)
            .await
    }

    /// As [`Self::execute`], but with an explicit wait-queue priority for
    /// the shared permit.
    pub async fn execute_with_priority<C: Command>(
        &self,
        command: C,
        context: &Context,
        name: Option<&str>,
        priority: WaiterPriority,
    ) -> Result<C::Result> {
        let token = self.semaphore.acquire(0, priority).await?;
        let result = self.registry.execute(command, context, name).await;
        drop(token);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use futures::future::BoxFuture;
    use gatekeeper_core::command::CommandTypeId;
    use gatekeeper_middleware::MiddlewareChain;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Echo(i32);

    impl Command for Echo {
        type Result = i32;
        fn type_id(&self) -> CommandTypeId {
            CommandTypeId::new("echo")
        }
    }

    #[tokio::test]
    async fn admits_within_budget_and_dispatches() {
        let registry = PipelineRegistry::new();
        registry.register_default(
            CommandTypeId::new("echo"),
            MiddlewareChain::builder(|command: Echo, _: &Context| -> BoxFuture<'_, i32> {
                Box::pin(async move { command.0 })
            })
            .build(),
        );

        let pipeline = ConcurrentPipeline::new(
            registry,
            BackPressureConfig::builder().max_concurrency(4).build(),
        );

        let context = Context::new();
        assert_eq!(pipeline.execute(Echo(3), &context, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn rejects_before_reaching_the_registry_when_over_budget() {
        let registry = PipelineRegistry::new();
        let entered = Arc::new(AtomicUsize::new(0));
        let entered_clone = Arc::clone(&entered);
        registry.register_default(
            CommandTypeId::new("echo"),
            MiddlewareChain::builder(move |command: Echo, _: &Context| -> BoxFuture<'_, i32> {
                entered_clone.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { command.0 })
            })
            .build(),
        );

        let pipeline = ConcurrentPipeline::new(
            registry,
            BackPressureConfig::builder()
                .max_concurrency(1)
                .max_outstanding(1)
                .strategy(gatekeeper_backpressure::OverflowStrategy::DropNewest)
                .build(),
        );

        let context = Context::new();
        let token = pipeline
            .semaphore
            .try_acquire(0)
            .expect("first permit should be free");

        let err = pipeline.execute(Echo(1), &context, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::BackPressure(_)));
        assert_eq!(entered.load(Ordering::SeqCst), 0);

        drop(token);
        assert_eq!(pipeline.execute(Echo(1), &context, None).await.unwrap(), 1);
    }
}
