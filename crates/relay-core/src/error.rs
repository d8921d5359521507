//! Error types for Relay
//!
//! Two layers live here:
//!
//! - [`DispatchError`] is what flows through pipelines, middleware and route
//!   actions as the `Err` side of every `Result`.
//! - [`HttpError`] is the renderable form. Every failure that reaches a
//!   dispatch boundary is turned into one and serialised as
//!   `{ "error": <category>, "message": <message>, ... }`.

use crate::container::ResolutionError;
use crate::router::RouteError;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::Location;
use thiserror::Error;

/// Result type alias for dispatch operations
pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

/// Failure raised while a request travels through the dispatch core.
///
/// Constructors are `#[track_caller]`, so the variant remembers where it was
/// created. Debug-mode error bodies report that location as `file` / `line`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The container could not build or resolve something
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Route lookup or url generation failed
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A middleware failed
    #[error("{message}")]
    Middleware {
        message: String,
        location: &'static Location<'static>,
    },

    /// The route action failed
    #[error("{message}")]
    Handler {
        message: String,
        location: &'static Location<'static>,
    },

    /// A failure that carries its own HTTP status
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        headers: HeaderMap,
        location: &'static Location<'static>,
    },

    /// Anything else, including panics caught at the kernel boundary
    #[error("{message}")]
    Internal {
        message: String,
        location: Option<&'static Location<'static>>,
        panicked_at: Option<PanicSite>,
    },
}

/// Source position a caught panic was raised at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicSite {
    pub file: String,
    pub line: u32,
}

impl DispatchError {
    /// Create a middleware failure
    #[track_caller]
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::Middleware {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Create a route action failure
    #[track_caller]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Create a failure with a custom status code
    #[track_caller]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            headers: HeaderMap::new(),
            location: Location::caller(),
        }
    }

    /// Create a 400 Bad Request failure
    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized failure
    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::http(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 403 Forbidden failure
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::http(StatusCode::FORBIDDEN, message)
    }

    /// Create a 404 Not Found failure
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    /// Create an internal failure
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            location: Some(Location::caller()),
            panicked_at: None,
        }
    }

    /// Create an internal failure from a caught panic payload and, when it
    /// was recorded, the position the panic was raised at
    pub fn panic(message: impl Into<String>, panicked_at: Option<PanicSite>) -> Self {
        Self::Internal {
            message: message.into(),
            location: None,
            panicked_at,
        }
    }

    /// Attach a response header. Only `Http` failures carry headers; other
    /// variants are returned unchanged.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if let Self::Http { headers, .. } = &mut self {
            headers.insert(name, value);
        }
        self
    }

    /// Relabel as a middleware failure. Failures with their own status and
    /// failures that already are middleware failures are kept as they are.
    #[track_caller]
    pub fn into_middleware(self) -> Self {
        match self {
            Self::Http { .. } | Self::Middleware { .. } => self,
            other => Self::Middleware {
                location: other.location().unwrap_or_else(|| Location::caller()),
                message: other.to_string(),
            },
        }
    }

    /// HTTP status this failure maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Route(RouteError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Http { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category string rendered into the `error` field
    pub fn category(&self) -> String {
        match self {
            Self::Resolution(_) => "Resolution Error".to_string(),
            Self::Route(RouteError::NotFound { .. }) => "Not Found".to_string(),
            Self::Route(_) => "Route Error".to_string(),
            Self::Middleware { .. } => "Middleware Error".to_string(),
            Self::Handler { .. } => "Action Error".to_string(),
            Self::Http { status, .. } => status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            Self::Internal { .. } => "Internal Server Error".to_string(),
        }
    }

    /// Source location the failure was raised at, if known
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Middleware { location, .. }
            | Self::Handler { location, .. }
            | Self::Http { location, .. } => Some(location),
            Self::Internal { location, .. } => *location,
            Self::Resolution(_) | Self::Route(_) => None,
        }
    }

    /// Messages of every error in the `source()` chain, outermost first
    pub fn trace(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }

    /// Convert into a renderable error. With `debug` set the body also carries
    /// `file`, `line` and `trace`.
    pub fn into_http_error(self, debug: bool) -> HttpError {
        let mut error = HttpError::new(self.status(), self.category(), self.to_string());
        if debug {
            if let Some(location) = self.location() {
                error = error
                    .with_detail("file", location.file())
                    .with_detail("line", location.line());
            } else if let Self::Internal {
                panicked_at: Some(site),
                ..
            } = &self
            {
                error = error
                    .with_detail("file", site.file.clone())
                    .with_detail("line", site.line);
            }
            error = error.with_detail("trace", self.trace());
        }
        if let Self::Http { headers, .. } = self {
            error.headers.extend(headers);
        }
        error
    }
}

impl From<serde_json::Error> for DispatchError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        DispatchError::bad_request(format!("Invalid JSON: {}", err))
    }
}

/// Renderable HTTP error
///
/// Serialises as a flat JSON object: `error` and `message` first, followed by
/// any details added with [`HttpError::with_detail`].
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error category (e.g. "Not Found", "Action Error")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Extra response headers
    pub headers: HeaderMap,
    /// Additional body fields (diagnostics, request echo)
    pub details: Map<String, Value>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            headers: HeaderMap::new(),
            details: Map::new(),
        }
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", message)
    }

    /// Create a 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", message)
    }

    /// Add a body field
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Add a response header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub(crate) fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            error: &self.error,
            message: &self.message,
            details: &self.details,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HttpError {}

/// JSON representation of an error response
#[derive(Serialize)]
pub(crate) struct ErrorBody<'a> {
    pub error: &'a str,
    pub message: &'a str,
    #[serde(flatten)]
    pub details: &'a Map<String, Value>,
}
