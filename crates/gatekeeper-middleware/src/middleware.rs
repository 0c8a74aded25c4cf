//! The `Middleware` trait and the `next` continuation it is handed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use gatekeeper_core::command::Command;
use gatekeeper_core::context::Context;
use gatekeeper_core::priority::Priority;

/// The terminal handler a chain was built around: the actual command
/// execution, below every registered middleware.
pub type Handler<C> =
    dyn for<'ctx> Fn(C, &'ctx Context) -> BoxFuture<'ctx, <C as Command>::Result> + Send + Sync;

/// One link in the pipeline's middleware chain.
///
/// `execute` receives the command, the shared [`Context`], and a `next`
/// continuation representing the rest of the chain. Calling `next` is
/// optional: a middleware may short-circuit and never call it (e.g. a cache
/// hit, a rejected request), but if it does call it, it must do so at most
/// once — a debug assertion catches a second call.
pub trait Middleware<C: Command>: Send + Sync {
    /// Fixed execution order. Lower runs first; its post-`next` code runs
    /// last (the chain nests, so unwinding is LIFO).
    fn priority(&self) -> Priority;

    /// A short name for observability. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs this middleware's logic around the rest of the chain.
    fn execute<'a>(
        &'a self,
        command: C,
        context: &'a Context,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, C::Result>;
}

/// The continuation a [`Middleware`] invokes to run the rest of the chain.
///
/// Borrowed from the owning [`crate::MiddlewareChain`] for the lifetime of a
/// single dispatch; it cannot outlive that call.
pub struct Next<'a, C: Command> {
    pub(crate) chain: &'a [Arc<dyn Middleware<C>>],
    pub(crate) handler: &'a Handler<C>,
    pub(crate) index: usize,
    pub(crate) called: AtomicBool,
}

impl<'a, C: Command> Next<'a, C> {
    /// Invokes the rest of the chain (or the terminal handler, if this was
    /// the last middleware) with `command`.
    ///
    /// Calling this more than once per [`Middleware::execute`] invocation is
    /// a logic error: in debug builds it panics, in release builds the
    /// second call proceeds (re-running the remaining chain) since the
    /// counter exists purely as a development-time guard rail.
    pub fn call(&self, command: C, context: &'a Context) -> BoxFuture<'a, C::Result> {
        let already_called = self.called.swap(true, Ordering::SeqCst);
        debug_assert!(
            !already_called,
            "middleware called `next` more than once in a single invocation"
        );
        crate::chain::invoke_at(self.chain, self.handler, self.index, command, context)
    }
}
