//! Errors the registry and executor can raise around dispatch itself
//! (as opposed to errors raised by a pipeline's own middlewares).

use gatekeeper_backpressure::BackPressureError;
use gatekeeper_core::command::CommandTypeId;

/// Raised by [`crate::PipelineRegistry::execute`] / [`crate::ConcurrentPipeline::execute`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// No pipeline is registered for this `(command type, name)` pair.
    #[error("no pipeline registered for command type '{command_type}' under name '{name}'")]
    PipelineNotFound {
        /// The command type that was looked up.
        command_type: CommandTypeId,
        /// The pipeline name that was looked up.
        name: String,
    },

    /// The shared concurrency budget rejected this call before it reached a
    /// pipeline.
    #[error("rejected by the shared concurrency budget: {0}")]
    BackPressure(#[from] BackPressureError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ExecutorError>;
