//! Priority-ordered middleware composition for the command pipeline.
//!
//! A [`Middleware`] wraps the rest of the chain: it receives the command, the
//! shared [`gatekeeper_core::Context`], and a [`Next`] continuation. Calling
//! `next` is optional — a middleware can short-circuit — but calling it twice
//! in one invocation is a logic error caught by a debug assertion.
//!
//! [`MiddlewareChain`] sorts its middlewares by [`gatekeeper_core::Priority`]
//! once, at build time; dispatch itself never allocates for chains of four
//! middlewares or fewer, since those are stored in a fixed-size array instead
//! of a `Vec`.
//!
//! # Example
//!
//! ```
//! use gatekeeper_core::{Command, CommandTypeId, Context, Priority};
//! use gatekeeper_middleware::{Middleware, MiddlewareChain, Next};
//! use futures::future::BoxFuture;
//!
//! struct Ping;
//! impl Command for Ping {
//!     type Result = &'static str;
//!     fn type_id(&self) -> CommandTypeId {
//!         CommandTypeId::new("ping")
//!     }
//! }
//!
//! struct Logger;
//! impl Middleware<Ping> for Logger {
//!     fn priority(&self) -> Priority {
//!         Priority::PostProcessing
//!     }
//!
//!     fn execute<'a>(
//!         &'a self,
//!         command: Ping,
//!         context: &'a Context,
//!         next: Next<'a, Ping>,
//!     ) -> BoxFuture<'a, &'static str> {
//!         Box::pin(async move { next.call(command, context).await })
//!     }
//! }
//!
//! # async fn run() {
//! let chain = MiddlewareChain::builder(|_: Ping, _: &Context| -> BoxFuture<'_, &'static str> {
//!     Box::pin(async { "pong" })
//! })
//! .middleware(Logger)
//! .build();
//!
//! let context = Context::new();
//! assert_eq!(chain.dispatch(Ping, &context).await, "pong");
//! # }
//! ```

mod chain;
mod middleware;

pub use chain::{MiddlewareChain, MiddlewareChainBuilder};
pub use middleware::{Handler, Middleware, Next};
