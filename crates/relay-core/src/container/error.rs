use thiserror::Error;

/// Failure to build or resolve something out of the container.
///
/// The container never swallows these; they go back to whoever asked for the
/// resolution, which decides how to render them.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// Nothing is bound or registered under the identifier
    #[error("Class or interface '{0}' does not exist")]
    TypeNotFound(String),

    /// The identifier is registered as abstract and has no binding
    #[error("Class {0} is not instantiable")]
    NotInstantiable(String),

    /// A parameter could not be satisfied by name, type, default or variadic
    #[error("Unresolvable dependency: {parameter} in {target}")]
    UnresolvableDependency { parameter: String, target: String },

    /// Building `id` failed because of a nested failure
    #[error("Could not build {id}: {source}")]
    Build {
        id: String,
        #[source]
        source: Box<ResolutionError>,
    },

    /// `id` depends on itself, directly or transitively
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// The resolved instance is not of the requested Rust type
    #[error("Resolved '{id}' is not a {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    /// A supplied value could not be converted for a parameter
    #[error("Invalid argument '{parameter}': {reason}")]
    InvalidArgument { parameter: String, reason: String },

    /// A factory closure reported a failure of its own
    #[error("Factory for '{id}' failed: {message}")]
    Factory { id: String, message: String },
}

impl ResolutionError {
    /// Shortcut for factories that need to fail with a message
    pub fn factory(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Factory {
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn wrap(id: &str, source: ResolutionError) -> Self {
        Self::Build {
            id: id.to_string(),
            source: Box::new(source),
        }
    }

    /// The innermost failure of a `Build` chain
    pub fn root_cause(&self) -> &ResolutionError {
        match self {
            Self::Build { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
