//! Maps `(CommandTypeId, pipeline name)` to a compiled, type-erased
//! middleware chain.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use gatekeeper_core::command::{Command, CommandTypeId};
use gatekeeper_core::context::Context;
use gatekeeper_middleware::MiddlewareChain;

use crate::error::{ExecutorError, Result};

const DEFAULT_PIPELINE_NAME: &str = "default";

trait ErasedPipeline: Send + Sync {
    fn dispatch_erased<'a>(
        &'a self,
        command: Box<dyn Any + Send>,
        context: &'a Context,
    ) -> BoxFuture<'a, Box<dyn Any + Send>>;
}

struct TypedPipeline<C: Command> {
    chain: MiddlewareChain<C>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Command> ErasedPipeline for TypedPipeline<C> {
    fn dispatch_erased<'a>(
        &'a self,
        command: Box<dyn Any + Send>,
        context: &'a Context,
    ) -> BoxFuture<'a, Box<dyn Any + Send>> {
        let command = *command
            .downcast::<C>()
            .expect("command type does not match the pipeline it was routed to");
        Box::pin(async move {
            let result = self.chain.dispatch(command, context).await;
            Box::new(result) as Box<dyn Any + Send>
        })
    }
}

/// A registry of compiled pipelines, one per `(command type, name)` pair.
///
/// Registration is last-writer-wins: registering a second pipeline under a
/// key already in use replaces the first. Cloning a `PipelineRegistry` is
/// cheap; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct PipelineRegistry {
    pipelines: Arc<DashMap<(CommandTypeId, String), Arc<dyn ErasedPipeline>>>,
}

impl PipelineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiled chain under `command_type` and `name`, replacing
    /// whatever was previously registered for that pair.
    pub fn register<C: Command>(
        &self,
        command_type: CommandTypeId,
        name: impl Into<String>,
        chain: MiddlewareChain<C>,
    ) {
        let pipeline: Arc<dyn ErasedPipeline> = Arc::new(TypedPipeline {
            chain,
            _marker: PhantomData,
        });
        self.pipelines
            .insert((command_type, name.into()), pipeline);
    }

    /// Registers a compiled chain under the default pipeline name for this
    /// command type.
    pub fn register_default<C: Command>(&self, command_type: CommandTypeId, chain: MiddlewareChain<C>) {
        self.register(command_type, DEFAULT_PIPELINE_NAME, chain);
    }

    /// Removes the pipeline registered under `command_type`/`name`, if any.
    pub fn deregister(&self, command_type: CommandTypeId, name: &str) {
        self.pipelines.remove(&(command_type, name.to_string()));
    }

    /// Looks up and runs the pipeline registered for `command`'s type under
    /// `name` (or `"default"` if `None`).
    ///
    /// # Panics
    ///
    /// Panics if a pipeline is registered under this `(type, name)` key but
    /// was compiled for a different `Command` type than `C` — this can only
    /// happen if callers reuse the same [`CommandTypeId`] for two distinct
    /// Rust types, which violates the identifier's contract.
    pub async fn execute<C: Command>(&self, command: C, context: &Context, name: Option<&str>) -> Result<C::Result> {
        let command_type = command.type_id();
        let name = name.unwrap_or(DEFAULT_PIPELINE_NAME);
        let pipeline = {
            let entry = self
                .pipelines
                .get(&(command_type, name.to_string()))
                .ok_or_else(|| ExecutorError::PipelineNotFound {
                    command_type,
                    name: name.to_string(),
                })?;
            Arc::clone(entry.value())
        };

        let erased_command: Box<dyn Any + Send> = Box::new(command);
        let erased_result = pipeline.dispatch_erased(erased_command, context).await;
        let result = *erased_result
            .downcast::<C::Result>()
            .expect("pipeline result type does not match the command it was routed from");
        Ok(result)
    }

    /// `true` if a pipeline is registered under `command_type`/`name`.
    pub fn contains(&self, command_type: CommandTypeId, name: &str) -> bool {
        self.pipelines.contains_key(&(command_type, name.to_string()))
    }

    /// The number of registered `(command type, name)` pairs.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// `true` if no pipelines are registered.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use gatekeeper_core::command::CommandTypeId;

    #[derive(Debug)]
    struct Echo(i32);

    impl Command for Echo {
        type Result = i32;
        fn type_id(&self) -> CommandTypeId {
            CommandTypeId::new("echo")
        }
    }

    fn identity_chain() -> MiddlewareChain<Echo> {
        MiddlewareChain::builder(|command: Echo, _: &Context| -> BoxFuture<'_, i32> {
            Box::pin(async move { command.0 })
        })
        .build()
    }

    #[tokio::test]
    async fn dispatches_to_the_registered_pipeline() {
        let registry = PipelineRegistry::new();
        registry.register_default(CommandTypeId::new("echo"), identity_chain());

        let context = Context::new();
        let result = registry.execute(Echo(9), &context, None).await.unwrap();
        assert_eq!(result, 9);
    }

    #[tokio::test]
    async fn unregistered_command_type_is_not_found() {
        let registry = PipelineRegistry::new();
        let context = Context::new();
        let err = registry.execute(Echo(1), &context, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::PipelineNotFound { .. }));
    }

    #[tokio::test]
    async fn registration_is_last_writer_wins() {
        let registry = PipelineRegistry::new();
        let command_type = CommandTypeId::new("echo");
        registry.register_default(command_type, identity_chain());
        registry.register_default(
            command_type,
            MiddlewareChain::builder(|_: Echo, _: &Context| -> BoxFuture<'_, i32> {
                Box::pin(async { 1000 })
            })
            .build(),
        );

        let context = Context::new();
        let result = registry.execute(Echo(9), &context, None).await.unwrap();
        assert_eq!(result, 1000);
    }

    #[tokio::test]
    async fn named_pipelines_are_independent() {
        let registry = PipelineRegistry::new();
        let command_type = CommandTypeId::new("echo");
        registry.register(command_type, "default", identity_chain());
        registry.register(
            command_type,
            "doubling",
            MiddlewareChain::builder(|command: Echo, _: &Context| -> BoxFuture<'_, i32> {
                Box::pin(async move { command.0 * 2 })
            })
            .build(),
        );

        let context = Context::new();
        assert_eq!(registry.execute(Echo(5), &context, None).await.unwrap(), 5);
        assert_eq!(
            registry
                .execute(Echo(5), &context, Some("doubling"))
                .await
                .unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn deregistering_removes_the_pipeline() {
        let registry = PipelineRegistry::new();
        let command_type = CommandTypeId::new("echo");
        registry.register_default(command_type, identity_chain());
        assert!(registry.contains(command_type, "default"));

        registry.deregister(command_type, "default");
        assert!(!registry.contains(command_type, "default"));

        let context = Context::new();
        assert!(registry.execute(Echo(1), &context, None).await.is_err());
    }
}
