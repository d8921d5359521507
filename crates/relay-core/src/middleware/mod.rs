//! Middleware for Relay
//!
//! Middleware wraps route actions (and, at the kernel, the whole dispatch).
//! It is given either directly or by a container identifier:
//!
//! ```rust,ignore
//! container.middleware("auth", AuthMiddleware::new());
//!
//! router.get("/admin", "AdminController@index").middleware("auth");
//! router.middleware(MiddlewareRef::layer(RequestIdMiddleware::new()));
//! ```

mod pipeline;
mod request_id;
mod tracing_layer;

pub use pipeline::{
    middleware_fn, ChainFuture, FnMiddleware, Middleware, MiddlewareRef, Next, Passable, Pipeline, Reply,
    SharedMiddleware,
};
pub use request_id::{RequestId, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use tracing_layer::TracingMiddleware;
