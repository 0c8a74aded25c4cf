//! Chain construction: sorts registered middlewares by priority once, then
//! composes them into a nested continuation per dispatch.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures::future::BoxFuture;
use gatekeeper_core::command::Command;
use gatekeeper_core::context::Context;

use crate::middleware::{Handler, Middleware, Next};

/// Storage for a priority-sorted middleware chain.
///
/// Chains of four or fewer middlewares are stored in a fixed-size array
/// instead of a `Vec`, so dispatch never pays for a heap-allocated backing
/// store on the common case of a handful of cross-cutting concerns (rate
/// limit, circuit breaker, retry, ...). Longer chains fall back to `Vec`.
enum ChainRepr<C: Command> {
    Empty,
    Len1([Arc<dyn Middleware<C>>; 1]),
    Len2([Arc<dyn Middleware<C>>; 2]),
    Len3([Arc<dyn Middleware<C>>; 3]),
    Len4([Arc<dyn Middleware<C>>; 4]),
    Many(Vec<Arc<dyn Middleware<C>>>),
}

impl<C: Command> ChainRepr<C> {
    fn as_slice(&self) -> &[Arc<dyn Middleware<C>>] {
        match self {
            ChainRepr::Empty => &[],
            ChainRepr::Len1(a) => a.as_slice(),
            ChainRepr::Len2(a) => a.as_slice(),
            ChainRepr::Len3(a) => a.as_slice(),
            ChainRepr::Len4(a) => a.as_slice(),
            ChainRepr::Many(v) => v.as_slice(),
        }
    }

    fn from_sorted(mut sorted: Vec<Arc<dyn Middleware<C>>>) -> Self {
        match sorted.len() {
            0 => ChainRepr::Empty,
            1 => ChainRepr::Len1([sorted.pop().unwrap()]),
            2 => {
                let b = sorted.pop().unwrap();
                let a = sorted.pop().unwrap();
                ChainRepr::Len2([a, b])
            }
            3 => {
                let c = sorted.pop().unwrap();
                let b = sorted.pop().unwrap();
                let a = sorted.pop().unwrap();
                ChainRepr::Len3([a, b, c])
            }
            4 => {
                let d = sorted.pop().unwrap();
                let c = sorted.pop().unwrap();
                let b = sorted.pop().unwrap();
                let a = sorted.pop().unwrap();
                ChainRepr::Len4([a, b, c, d])
            }
            _ => ChainRepr::Many(sorted),
        }
    }
}

/// A built, ready-to-dispatch middleware chain around a terminal handler.
pub struct MiddlewareChain<C: Command> {
    repr: ChainRepr<C>,
    handler: Arc<Handler<C>>,
}

impl<C: Command> MiddlewareChain<C> {
    /// Starts building a chain around the given terminal handler, which runs
    /// once every registered middleware has called `next` (or immediately,
    /// if the chain is empty).
    pub fn builder<F>(handler: F) -> MiddlewareChainBuilder<C>
    where
        F: for<'ctx> Fn(C, &'ctx Context) -> BoxFuture<'ctx, C::Result> + Send + Sync + 'static,
    {
        MiddlewareChainBuilder {
            middlewares: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// The number of registered middlewares (excluding the terminal handler).
    pub fn len(&self) -> usize {
        self.repr.as_slice().len()
    }

    /// `true` if no middlewares are registered; dispatch calls the terminal
    /// handler directly.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the chain: each middleware executes in priority order, then the
    /// terminal handler, then each middleware's post-`next` code unwinds in
    /// reverse priority order.
    pub fn dispatch<'a>(&'a self, command: C, context: &'a Context) -> BoxFuture<'a, C::Result> {
        invoke_at(self.repr.as_slice(), &self.handler, 0, command, context)
    }
}

/// Collects middlewares for a [`MiddlewareChain`], sorting by priority
/// (stably, so registration order breaks ties) when built.
pub struct MiddlewareChainBuilder<C: Command> {
    middlewares: Vec<Arc<dyn Middleware<C>>>,
    handler: Arc<Handler<C>>,
}

impl<C: Command> MiddlewareChainBuilder<C> {
    /// Registers a middleware. Order among middlewares of equal priority is
    /// registration order.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<C> + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Registers an already-shared middleware.
    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware<C>>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sorts the registered middlewares by priority and builds the chain.
    pub fn build(mut self) -> MiddlewareChain<C> {
        self.middlewares.sort_by_key(|m| m.priority());
        MiddlewareChain {
            repr: ChainRepr::from_sorted(self.middlewares),
            handler: self.handler,
        }
    }
}

pub(crate) fn invoke_at<'a, C: Command>(
    chain: &'a [Arc<dyn Middleware<C>>],
    handler: &'a Handler<C>,
    index: usize,
    command: C,
    context: &'a Context,
) -> BoxFuture<'a, C::Result> {
    match chain.get(index) {
        Some(middleware) => {
            let next = Next {
                chain,
                handler,
                index: index + 1,
                called: AtomicBool::new(false),
            };
            middleware.execute(command, context, next)
        }
        None => handler(command, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Middleware;
    use gatekeeper_core::command::CommandTypeId;
    use gatekeeper_core::priority::Priority;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Ping(i32);

    impl Command for Ping {
        type Result = i32;
        fn type_id(&self) -> CommandTypeId {
            CommandTypeId::new("ping")
        }
    }

    struct Recorder {
        priority: Priority,
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware<Ping> for Recorder {
        fn priority(&self) -> Priority {
            self.priority
        }

        fn name(&self) -> &str {
            self.name
        }

        fn execute<'a>(
            &'a self,
            command: Ping,
            context: &'a Context,
            next: Next<'a, Ping>,
        ) -> BoxFuture<'a, i32> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                let result = next.call(command, context).await;
                self.log.lock().unwrap().push(self.name);
                result
            })
        }
    }

    struct ShortCircuit(i32);

    impl Middleware<Ping> for ShortCircuit {
        fn priority(&self) -> Priority {
            Priority::Authentication
        }

        fn execute<'a>(
            &'a self,
            _command: Ping,
            _context: &'a Context,
            _next: Next<'a, Ping>,
        ) -> BoxFuture<'a, i32> {
            let value = self.0;
            Box::pin(async move { value })
        }
    }

    fn handler(command: Ping, _context: &Context) -> BoxFuture<'_, i32> {
        Box::pin(async move { command.0 })
    }

    #[tokio::test]
    async fn empty_chain_calls_handler_directly() {
        let chain = MiddlewareChain::builder(handler).build();
        let context = Context::new();
        assert_eq!(chain.dispatch(Ping(7), &context).await, 7);
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn executes_in_priority_order_and_unwinds_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::builder(handler)
            .middleware(Recorder {
                priority: Priority::PostProcessing,
                name: "post",
                log: Arc::clone(&log),
            })
            .middleware(Recorder {
                priority: Priority::Authentication,
                name: "auth",
                log: Arc::clone(&log),
            })
            .middleware(Recorder {
                priority: Priority::Resilience,
                name: "resilience",
                log: Arc::clone(&log),
            })
            .build();

        let context = Context::new();
        let result = chain.dispatch(Ping(1), &context).await;
        assert_eq!(result, 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["auth", "resilience", "post", "post", "resilience", "auth"]
        );
    }

    #[tokio::test]
    async fn equal_priority_breaks_ties_by_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::builder(handler)
            .middleware(Recorder {
                priority: Priority::Custom,
                name: "first",
                log: Arc::clone(&log),
            })
            .middleware(Recorder {
                priority: Priority::Custom,
                name: "second",
                log: Arc::clone(&log),
            })
            .build();

        let context = Context::new();
        chain.dispatch(Ping(1), &context).await;
        assert_eq!(log.lock().unwrap()[0], "first");
        assert_eq!(log.lock().unwrap()[1], "second");
    }

    #[tokio::test]
    async fn short_circuit_never_reaches_handler() {
        let chain = MiddlewareChain::builder(|_: Ping, _: &Context| -> BoxFuture<'_, i32> {
            Box::pin(async { panic!("handler should not run") })
        })
        .middleware(ShortCircuit(42))
        .build();

        let context = Context::new();
        assert_eq!(chain.dispatch(Ping(1), &context).await, 42);
    }

    #[tokio::test]
    async fn five_middlewares_use_the_vec_fallback_and_still_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = MiddlewareChain::builder(handler);
        for (i, priority) in [
            Priority::Authentication,
            Priority::Validation,
            Priority::RateLimit,
            Priority::Resilience,
            Priority::PreProcessing,
        ]
        .into_iter()
        .enumerate()
        {
            let name: &'static str = Box::leak(i.to_string().into_boxed_str());
            builder = builder.middleware(Recorder {
                priority,
                name,
                log: Arc::clone(&log),
            });
        }
        let chain = builder.build();
        assert_eq!(chain.len(), 5);

        let context = Context::new();
        chain.dispatch(Ping(1), &context).await;
        assert_eq!(log.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    #[should_panic(expected = "more than once")]
    async fn calling_next_twice_panics_in_debug() {
        struct DoubleCall;
        impl Middleware<Ping> for DoubleCall {
            fn priority(&self) -> Priority {
                Priority::Authentication
            }
            fn execute<'a>(
                &'a self,
                command: Ping,
                context: &'a Context,
                next: Next<'a, Ping>,
            ) -> BoxFuture<'a, i32> {
                Box::pin(async move {
                    let _ = next.call(Ping(command.0), context).await;
                    next.call(Ping(command.0), context).await
                })
            }
        }

        let chain = MiddlewareChain::builder(handler)
            .middleware(DoubleCall)
            .build();
        let context = Context::new();
        chain.dispatch(Ping(1), &context).await;
    }
}
