//! Routes commands to compiled middleware chains keyed by command type and
//! pipeline name, optionally bounded by one concurrency budget shared across
//! every registered pipeline.
//!
//! [`PipelineRegistry`] holds the `(CommandTypeId, name)` → compiled
//! [`gatekeeper_middleware::MiddlewareChain`] map; registering a second chain
//! under a key in use replaces the first. [`ConcurrentPipeline`] wraps a
//! registry with a [`gatekeeper_backpressure::BackPressureSemaphore`] so a
//! single `maxConcurrency`/`maxOutstanding` budget applies across all
//! registered pipelines, not per pipeline.
//!
//! # Example
//!
//! ```
//! use gatekeeper_core::{Command, CommandTypeId, Context};
//! use gatekeeper_executor::PipelineRegistry;
//! use gatekeeper_middleware::MiddlewareChain;
//! use futures::future::BoxFuture;
//!
//! struct CreateOrder { quantity: u32 }
//! impl Command for CreateOrder {
//!     type Result = u32;
//!     fn type_id(&self) -> CommandTypeId {
//!         CommandTypeId::new("orders.create")
//!     }
//! }
//!
//! # async fn run() {
//! let registry = PipelineRegistry::new();
//! registry.register_default(
//!     CommandTypeId::new("orders.create"),
//!     MiddlewareChain::builder(|cmd: CreateOrder, _: &Context| -> BoxFuture<'_, u32> {
//!         Box::pin(async move { cmd.quantity * 2 })
//!     })
//!     .build(),
//! );
//!
//! let context = Context::new();
//! let result = registry
//!     .execute(CreateOrder { quantity: 5 }, &context, None)
//!     .await
//!     .unwrap();
//! assert_eq!(result, 10);
//! # }
//! ```

mod concurrent;
mod error;
mod registry;

pub use concurrent::ConcurrentPipeline;
pub use error::{ExecutorError, Result};
pub use registry::PipelineRegistry;
