//! Tracing middleware
//!
//! Opens an `http_request` span per request carrying method, path, request
//! id, response status and duration, and logs one completion event.

use super::pipeline::{ChainFuture, Middleware, Next, Reply};
use super::request_id::RequestId;
use crate::request::Request;
use std::time::Instant;
use tracing::{field, info_span, Instrument, Level};

/// Middleware creating a tracing span for every request
///
/// ```rust,ignore
/// app.middleware(MiddlewareRef::layer(
///     TracingMiddleware::new().with_field("service", "billing"),
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    level: Level,
    custom_fields: Vec<(String, String)>,
}

impl TracingMiddleware {
    /// Log completions at INFO
    pub fn new() -> Self {
        Self::with_level(Level::INFO)
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            custom_fields: Vec::new(),
        }
    }

    /// Add a field to every request span
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.push((key.into(), value.into()));
        self
    }

    fn rendered_fields(&self) -> String {
        self.custom_fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware<Request> for TracingMiddleware {
    fn handle(&self, req: Request, next: Next<Request>) -> ChainFuture<Request> {
        let level = self.level;
        let method = req.method().to_string();
        let path = req.path().to_string();
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let span = info_span!(
            "http_request",
            method = %method,
            path = %path,
            request_id = %request_id,
            fields = %self.rendered_fields(),
            status = field::Empty,
            duration_ms = field::Empty,
            error = field::Empty,
        );

        Box::pin(async move {
            let start = Instant::now();
            let result = next.run(req).instrument(span.clone()).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            span.record("duration_ms", duration_ms);

            let entered = span.enter();
            match &result {
                Ok(Reply::Respond(response)) => {
                    let status = response.status();
                    span.record("status", status.as_u16());
                    if status.is_client_error() || status.is_server_error() {
                        span.record("error", true);
                        tracing::warn!(
                            method = %method,
                            path = %path,
                            request_id = %request_id,
                            status = status.as_u16(),
                            duration_ms,
                            "Request failed"
                        );
                    } else {
                        completed(level, &method, &path, &request_id, status.as_u16(), duration_ms);
                    }
                }
                Ok(Reply::Pass(_)) => {
                    tracing::debug!(method = %method, path = %path, duration_ms, "Request passed through");
                }
                Err(e) => {
                    span.record("error", true);
                    tracing::error!(
                        method = %method,
                        path = %path,
                        request_id = %request_id,
                        error = %e,
                        duration_ms,
                        "Request failed"
                    );
                }
            }
            drop(entered);

            result
        })
    }
}

fn completed(level: Level, method: &str, path: &str, request_id: &str, status: u16, duration_ms: u64) {
    macro_rules! emit {
        ($mac:ident) => {
            tracing::$mac!(
                method = %method,
                path = %path,
                request_id = %request_id,
                status,
                duration_ms,
                "Request completed"
            )
        };
    }

    match level {
        Level::TRACE => emit!(trace),
        Level::DEBUG => emit!(debug),
        Level::INFO => emit!(info),
        Level::WARN => emit!(warn),
        Level::ERROR => emit!(error),
    }
}
