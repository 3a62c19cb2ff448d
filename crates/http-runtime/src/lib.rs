//! The request pipeline (§4.2–§4.4): a regex-compiled router, a composable
//! middleware chain, a typed DI container, and the dispatcher wiring them
//! together (§2 dataflow: "global middleware chain → router.match → route
//! middleware chain → dispatcher → controller").

mod builtins;
mod container;
mod context;
mod controller;
mod dispatch;
mod error;
mod middleware;
mod router;

pub use builtins::{
    global_chain, CompressionMiddleware, CorsMiddleware, LoggingMiddleware, RateLimitMiddleware,
    SecurityHeadersMiddleware, ServerHeaderMiddleware,
};
pub use container::Container;
pub use context::RequestContext;
pub use controller::Controller;
pub use dispatch::{context_from_request, error_response, handle};
pub use error::{ContainerError, RouterError};
pub use middleware::{Middleware, Next, Pipeline, Terminal};
pub use router::{Matched, RouteDescriptor, Router};
