use thiserror::Error;

/// Route lookup, compilation and url generation failures
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    #[error("No route found for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Route [{0}] not defined")]
    NameNotFound(String),

    #[error("Missing parameter [{parameter}] for route [{route}]")]
    MissingParameter { route: String, parameter: String },

    #[error("Invalid route pattern '{uri}': {reason}")]
    InvalidPattern { uri: String, reason: String },
}
