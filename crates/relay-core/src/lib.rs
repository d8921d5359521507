//! # Relay Core
//!
//! The request-dispatch core of Relay: a service container with autowiring,
//! a route table with pattern matching and named routes, an ordered
//! middleware pipeline and a kernel tying them into one
//! `handle(request) -> response` call.
//!
//! This crate is not meant to be used directly. Use `relay-rs` instead.

mod app;
pub mod config;
pub mod container;
mod error;
mod kernel;
pub mod logging;
pub mod middleware;
mod path_params;
mod request;
mod response;
pub mod router;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::{App, ServiceProvider};
pub use config::{Config, ConfigError, Environment};
pub use container::{
    service_id, Argument, Arguments, Callable, Concrete, Container, Injectable, Params, ResolutionError, Signature,
};
pub use error::{DispatchError, HttpError, PanicSite, Result};
pub use kernel::{Kernel, REDACTED_MESSAGE};
pub use middleware::{
    middleware_fn, Middleware, MiddlewareRef, Next, Passable, Pipeline, Reply, RequestId, RequestIdMiddleware,
    TracingMiddleware,
};
pub use path_params::PathParams;
pub use request::{Principal, Request};
pub use response::{Html, IntoResponse, Json, Redirect, Response};
pub use router::{action, Action, Controller, Group, MethodFilter, Route, RouteAction, RouteError, RouteTable, Router};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
