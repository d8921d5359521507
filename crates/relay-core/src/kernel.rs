//! The request kernel
//!
//! [`Kernel::handle`] is the single `Request -> Response` entry point: it runs
//! the kernel middleware around [`Router::dispatch`] and renders anything
//! that still escapes, including panics, as a JSON error.

use crate::config::Config;
use crate::container::Container;
use crate::error::{DispatchError, PanicSite};
use crate::middleware::{MiddlewareRef, Pipeline};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use futures_util::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Message shown instead of the details of a 5xx failure that escaped to
/// the kernel when debug is off. Responses already rendered by the router,
/// including action errors, are passed through unchanged.
pub const REDACTED_MESSAGE: &str = "Something went wrong";

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Chain a hook in front of the current panic hook that records where the
/// latest panic on this thread was raised. Installed once per process.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let site = PanicSite {
                    file: location.file().to_string(),
                    line: location.line(),
                };
                LAST_PANIC.with(|last| *last.borrow_mut() = Some(site));
            }
            previous(info);
        }));
    });
}

/// Composes kernel middleware and the router
pub struct Kernel {
    container: Container,
    router: Arc<Router>,
    middleware: Vec<MiddlewareRef<Request>>,
    config: Config,
}

impl Kernel {
    /// The router's debug flag follows `config`
    pub fn new(container: Container, mut router: Router, config: Config) -> Self {
        install_panic_hook();
        router.set_debug(config.debug);
        Self {
            container,
            router: Arc::new(router),
            middleware: Vec::new(),
            config,
        }
    }

    /// Add middleware run once per request, before routing
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one request. Never fails and never panics.
    pub async fn handle(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_string();
        let span = info_span!("http_request", method = %method, path = %path);

        let outcome = AssertUnwindSafe(self.try_handle(request))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => self.render(e),
            Err(payload) => {
                // The hook ran on this thread during the poll that unwound
                let site = LAST_PANIC.with(|last| last.borrow_mut().take());
                let message = panic_message(payload.as_ref());
                span.in_scope(|| error!(panic = %message, "Request handler panicked"));
                self.render(DispatchError::panic(message, site))
            }
        };

        span.in_scope(|| log_request(&method, &path, response.status(), start));
        response
    }

    async fn try_handle(&self, request: Request) -> Result<Response, DispatchError> {
        if self.middleware.is_empty() {
            return Ok(self.router.dispatch(request).await);
        }

        let router = self.router.clone();
        Pipeline::new(self.container.clone())
            .send(request)
            .through(self.middleware.iter().cloned())
            .debug(self.config.debug)
            .then(move |request: Request| {
                let router = router.clone();
                async move { Ok::<_, DispatchError>(router.dispatch(request).await) }
            })
            .await
    }

    fn render(&self, e: DispatchError) -> Response {
        let mut rendered = e.into_http_error(self.config.debug);
        if !self.config.debug && rendered.status.is_server_error() {
            rendered.message = REDACTED_MESSAGE.to_string();
        }
        rendered.into_response()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("router", &self.router)
            .field("middleware", &self.middleware)
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn log_request(method: &http::Method, path: &str, status: StatusCode, start: Instant) {
    let elapsed = start.elapsed();

    if status.is_success() || status.is_redirection() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
