//! # Relay
//!
//! A lightweight request-dispatch framework: a service container with
//! autowiring, a route table with named, constrained and grouped routes, an
//! ordered middleware pipeline and a kernel turning a request into a
//! response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay_rs::prelude::*;
//!
//! let kernel = App::new()
//!     .routes(|r| {
//!         r.get(
//!             "/hello/{name}",
//!             Action::handler(Signature::new().value("name"), |args: Arguments| async move {
//!                 Ok::<_, DispatchError>(format!("Hello, {}!", args.string("name")?))
//!             }),
//!         )
//!         .name("hello");
//!     })
//!     .build()?;
//!
//! let response = kernel.handle(Request::new(Method::GET, "/hello/relay".parse()?)).await;
//! ```
//!
//! Relay is not a transport: requests are handed to [`Kernel::handle`] by
//! whatever HTTP adapter hosts the application.

// Re-export core functionality
pub use relay_core::*;

/// Prelude module - import everything you need with `use relay_rs::prelude::*`
pub mod prelude {
    pub use relay_core::{
        action,
        middleware_fn,
        Action,
        // App builder
        App,
        Argument,
        Arguments,
        Callable,
        Concrete,
        Config,
        // Container
        Container,
        Controller,
        // Errors
        DispatchError,
        Group,
        Html,
        HttpError,
        Injectable,
        IntoResponse,
        Json,
        Kernel,
        // Middleware
        Middleware,
        MiddlewareRef,
        Next,
        Params,
        Pipeline,
        Redirect,
        Reply,
        // Request context
        Request,
        RequestIdMiddleware,
        ResolutionError,
        Response,
        Result,
        RouteAction,
        // Routing
        Router,
        ServiceProvider,
        Signature,
        TracingMiddleware,
    };

    #[cfg(feature = "test-utils")]
    pub use relay_core::{TestClient, TestRequest, TestResponse};

    // Commonly used external types
    pub use http::{Method, StatusCode, Uri};
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}
