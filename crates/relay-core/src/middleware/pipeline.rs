//! Middleware pipeline
//!
//! A [`Pipeline`] sends a passable value through an ordered list of
//! middleware. Every middleware receives the value and a [`Next`] handle. It
//! may call `next.run(value)` to continue, answer with [`Reply::Respond`] to
//! stop the chain, or fail.
//!
//! Failures are routed through [`Passable::recover`]. For a [`Request`] they
//! become an error response at the link where they happened; other passables
//! propagate the failure to the caller.

use crate::container::{Container, Params};
use crate::error::DispatchError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Outcome of a middleware or of a whole chain
pub enum Reply<T> {
    /// A final response; nothing after this runs
    Respond(Response),
    /// Continue with this (possibly modified) value
    Pass(T),
}

impl<T> Reply<T> {
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Respond(_))
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Pass(_) => None,
        }
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Respond(response) => f.debug_tuple("Respond").field(&response.status()).finish(),
            Self::Pass(_) => f.write_str("Pass(..)"),
        }
    }
}

/// Future returned by every link of a chain
pub type ChainFuture<T> = BoxFuture<'static, Result<Reply<T>, DispatchError>>;

/// The rest of the chain
pub struct Next<T> {
    inner: Arc<dyn Fn(T) -> ChainFuture<T> + Send + Sync>,
}

impl<T: Send + 'static> Next<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T) -> ChainFuture<T> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A next that hands the value straight back
    pub fn identity() -> Self {
        Self::new(|passable: T| Box::pin(async move { Ok(Reply::Pass(passable)) }))
    }

    /// Continue the chain with `passable`
    pub fn run(&self, passable: T) -> ChainFuture<T> {
        (self.inner)(passable)
    }
}

impl<T> Clone for Next<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A middleware
pub trait Middleware<T>: Send + Sync + 'static {
    fn handle(&self, passable: T, next: Next<T>) -> ChainFuture<T>;
}

/// Type-erased middleware, as stored in the container
pub type SharedMiddleware<T> = Arc<dyn Middleware<T>>;

/// Middleware built from an async closure
pub struct FnMiddleware<F>(F);

impl<T, F, Fut> Middleware<T> for FnMiddleware<F>
where
    T: Send + 'static,
    F: Fn(T, Next<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply<T>, DispatchError>> + Send + 'static,
{
    fn handle(&self, passable: T, next: Next<T>) -> ChainFuture<T> {
        Box::pin((self.0)(passable, next))
    }
}

/// Wrap an async closure as middleware
pub fn middleware_fn<T, F, Fut>(f: F) -> MiddlewareRef<T>
where
    T: Send + 'static,
    F: Fn(T, Next<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply<T>, DispatchError>> + Send + 'static,
{
    MiddlewareRef::Layer(Arc::new(FnMiddleware(f)))
}

/// A middleware given either directly or by container identifier
pub enum MiddlewareRef<T> {
    /// Resolved through the container on every run
    Named(String),
    Layer(SharedMiddleware<T>),
}

impl<T: Send + 'static> MiddlewareRef<T> {
    pub fn layer<M: Middleware<T>>(middleware: M) -> Self {
        Self::Layer(Arc::new(middleware))
    }

    /// Identifier or a placeholder for direct middleware
    pub fn describe(&self) -> &str {
        match self {
            Self::Named(id) => id,
            Self::Layer(_) => "Closure",
        }
    }

    /// Get the middleware instance, resolving it through the container if named
    #[track_caller]
    pub fn resolve(&self, container: &Container) -> Result<SharedMiddleware<T>, DispatchError> {
        match self {
            Self::Layer(middleware) => Ok(middleware.clone()),
            Self::Named(id) => container
                .make_as::<SharedMiddleware<T>>(id, &Params::new())
                .map(|middleware| (*middleware).clone())
                .map_err(|e| {
                    DispatchError::middleware(format!(
                        "Middleware [{}] could not be resolved: {}",
                        id, e
                    ))
                }),
        }
    }
}

impl<T> Clone for MiddlewareRef<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(id) => Self::Named(id.clone()),
            Self::Layer(middleware) => Self::Layer(middleware.clone()),
        }
    }
}

impl<T> fmt::Debug for MiddlewareRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(id) => f.debug_tuple("Named").field(id).finish(),
            Self::Layer(_) => f.write_str("Layer(..)"),
        }
    }
}

impl<T> From<&str> for MiddlewareRef<T> {
    fn from(id: &str) -> Self {
        Self::Named(id.to_string())
    }
}

impl<T> From<String> for MiddlewareRef<T> {
    fn from(id: String) -> Self {
        Self::Named(id)
    }
}

impl<T> From<SharedMiddleware<T>> for MiddlewareRef<T> {
    fn from(middleware: SharedMiddleware<T>) -> Self {
        Self::Layer(middleware)
    }
}

/// Something that can travel through a pipeline
pub trait Passable: Send + 'static {
    /// Turn a failure raised inside the chain into a response, or give it
    /// back to propagate it. The default propagates.
    fn recover(error: DispatchError, debug: bool) -> Result<Response, DispatchError> {
        let _ = debug;
        Err(error)
    }
}

impl Passable for Request {
    fn recover(error: DispatchError, debug: bool) -> Result<Response, DispatchError> {
        Ok(error
            .into_middleware()
            .into_http_error(debug)
            .into_response())
    }
}

/// Ordered middleware chain around a destination
pub struct Pipeline<T> {
    container: Container,
    middleware: Vec<MiddlewareRef<T>>,
    passable: Option<T>,
    debug: bool,
}

impl<T: Passable> Pipeline<T> {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            middleware: Vec::new(),
            passable: None,
            debug: false,
        }
    }

    /// Set the value to send through
    pub fn send(mut self, passable: T) -> Self {
        self.passable = Some(passable);
        self
    }

    /// Replace the middleware list
    pub fn through<I, M>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef<T>>,
    {
        self.middleware = middleware.into_iter().map(Into::into).collect();
        self
    }

    /// Append one middleware
    pub fn pipe(mut self, middleware: impl Into<MiddlewareRef<T>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Include diagnostics in recovered error responses
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run the chain with `destination` at its end.
    ///
    /// The first middleware runs first; the last one wraps the destination.
    /// A middleware that hands back [`Reply::Pass`] without calling `next`
    /// continues the chain with that value, so every later middleware still
    /// runs before the destination is reached.
    pub async fn then<F, Fut>(self, destination: F) -> Result<Response, DispatchError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, DispatchError>> + Send + 'static,
    {
        let Pipeline {
            container,
            middleware,
            passable,
            debug,
        } = self;
        let passable =
            passable.ok_or_else(|| DispatchError::internal("Pipeline has nothing to send"))?;

        let terminal = Next::new(move |passable: T| {
            let fut = destination(passable);
            Box::pin(async move { fut.await.map(Reply::Respond) }) as ChainFuture<T>
        });

        // Build the chain from the inside out
        let chain = middleware.into_iter().rev().fold(terminal, |next, entry| {
            let container = container.clone();
            Next::new(move |passable: T| {
                let entry = entry.clone();
                let container = container.clone();
                let next = next.clone();
                Box::pin(async move {
                    trace!(middleware = entry.describe(), "Entering middleware");
                    let outcome = match entry.resolve(&container) {
                        Ok(layer) => {
                            let called = Arc::new(AtomicBool::new(false));
                            let tracked = {
                                let called = called.clone();
                                let next = next.clone();
                                Next::new(move |passable: T| {
                                    called.store(true, Ordering::SeqCst);
                                    next.run(passable)
                                })
                            };
                            match layer.handle(passable, tracked).await {
                                Ok(Reply::Pass(passable)) if !called.load(Ordering::SeqCst) => {
                                    trace!(middleware = entry.describe(), "Continuing after pass");
                                    next.run(passable).await
                                }
                                Ok(Reply::Pass(_)) => Err(DispatchError::middleware(format!(
                                    "Middleware [{}] passed after the chain had already run",
                                    entry.describe()
                                ))),
                                other => other,
                            }
                        }
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(reply) => Ok(reply),
                        Err(e) => T::recover(e, debug).map(Reply::Respond),
                    }
                }) as ChainFuture<T>
            })
        });

        match chain.run(passable).await {
            Ok(Reply::Respond(response)) => Ok(response),
            Ok(Reply::Pass(_)) => T::recover(
                DispatchError::internal("Pipeline finished without a response"),
                debug,
            ),
            Err(e) => T::recover(e, debug),
        }
    }

    /// Run every middleware in order without nesting.
    ///
    /// Each middleware gets a `next` that hands the value straight back. The
    /// first response stops the run; otherwise the value returned by each
    /// middleware is passed to the following one.
    pub async fn run(self, passable: T) -> Result<Reply<T>, DispatchError> {
        let mut current = passable;
        for entry in &self.middleware {
            let outcome = match entry.resolve(&self.container) {
                Ok(layer) => layer.handle(current, Next::identity()).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Reply::Pass(next)) => current = next,
                Ok(Reply::Respond(response)) => return Ok(Reply::Respond(response)),
                Err(e) => return T::recover(e, self.debug).map(Reply::Respond),
            }
        }
        Ok(Reply::Pass(current))
    }
}

impl Container {
    /// Register a middleware instance under `id` so routes can name it
    pub fn middleware<M: Middleware<Request>>(&self, id: impl Into<String>, middleware: M) {
        let shared: SharedMiddleware<Request> = Arc::new(middleware);
        self.instance(id, shared);
    }
}
