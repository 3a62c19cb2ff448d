use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::context::RequestContext;

/// One link in a middleware chain (§4.3): `handle(request, response,
/// container, next)` where calling `next.proceed(ctx)` advances the chain;
/// not calling it short-circuits. The container argument from spec.md is
/// folded into construction time (each built-in middleware already owns
/// what it needs), matching the rest of this crate's compile-time DI.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response;
}

/// The handler invoked once every middleware in a chain has called `next`
/// (§4.3: "invoking `final_handler` after all middlewares have called
/// `next`"). Implemented by the router-resolution step for the global
/// chain, and by the dispatcher for the route-scoped chain.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Response;
}

/// The remaining portion of a middleware chain, handed to each middleware
/// so it can call `next.proceed(ctx)` to advance (§4.3).
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a (dyn Terminal + 'a),
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], terminal: &'a (dyn Terminal + 'a)) -> Self {
        Self { chain, terminal }
    }

    pub async fn proceed(self, ctx: &mut RequestContext) -> Response {
        match self.chain.split_first() {
            Some((mw, rest)) => {
                let next = Next {
                    chain: rest,
                    terminal: self.terminal,
                };
                mw.handle(ctx, next).await
            }
            None => self.terminal.call(ctx).await,
        }
    }
}

/// An ordered sequence of middleware (§4.3). Built fresh per request: once
/// for the global chain, once more for the route-scoped chain.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middleware }
    }

    pub async fn run(&self, ctx: &mut RequestContext, terminal: &dyn Terminal) -> Response {
        Next::new(&self.middleware, terminal).proceed(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderMap, Method};
    use std::collections::HashMap as Map;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTerminal(Arc<AtomicU32>);

    #[async_trait]
    impl Terminal for CountingTerminal {
        async fn call(&self, _ctx: &mut RequestContext) -> Response {
            self.0.fetch_add(1, Ordering::SeqCst);
            Response::new(Body::empty())
        }
    }

    struct PassThrough;

    #[async_trait]
    impl Middleware for PassThrough {
        async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
            next.proceed(ctx).await
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn handle(&self, _ctx: &mut RequestContext, _next: Next<'_>) -> Response {
            Response::builder()
                .status(204)
                .body(Body::empty())
                .expect("valid response")
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, "/x".to_string(), Map::new(), HeaderMap::new(), Default::default())
    }

    #[tokio::test]
    async fn pipeline_calls_terminal_when_every_middleware_calls_next() {
        let counter = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::new(vec![Arc::new(PassThrough), Arc::new(PassThrough)]);
        let terminal = CountingTerminal(Arc::clone(&counter));

        pipeline.run(&mut ctx(), &terminal).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn middleware_not_calling_next_short_circuits() {
        let counter = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::new(vec![Arc::new(ShortCircuit), Arc::new(PassThrough)]);
        let terminal = CountingTerminal(Arc::clone(&counter));

        let response = pipeline.run(&mut ctx(), &terminal).await;
        assert_eq!(response.status(), 204);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
