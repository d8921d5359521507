//! Parameter declarations and resolved arguments
//!
//! Rust has no runtime reflection over constructor or function parameters, so
//! anything the container autowires declares its parameters up front with a
//! [`Signature`]. The container walks the signature, resolves every
//! [`Parameter`] and hands the result to the constructor or function as
//! [`Arguments`].

use super::ResolutionError;
use crate::request::Request;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A resolved, type-erased service instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Extra parameters supplied to `make` / `call`, matched by name
pub type Params = std::collections::HashMap<String, Argument>;

/// Identifier the container uses for a Rust type
pub fn service_id<T: ?Sized + 'static>() -> &'static str {
    std::any::type_name::<T>()
}

/// A single argument value
#[derive(Clone)]
pub enum Argument {
    /// Plain data: strings, numbers, route parameters, defaults
    Value(Value),
    /// A service instance
    Service(Instance),
    /// The collected values of a variadic parameter
    Variadic(Vec<Argument>),
}

impl Argument {
    /// Wrap a concrete value as a service argument
    pub fn service<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Service(Arc::new(value))
    }

    /// The string value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Service(_) => f.write_str("Service(..)"),
            Self::Variadic(items) => f.debug_tuple("Variadic").field(items).finish(),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

/// What kind of value a parameter expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Plain data; never resolved through the container
    Builtin,
    /// A service resolved through `make(id)`
    Service(String),
}

/// Declaration of one parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub variadic: bool,
}

impl Parameter {
    /// A plain data parameter
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Builtin,
            default: None,
            variadic: false,
        }
    }

    /// A parameter resolved as the service registered for `T`
    pub fn service<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::service_id(name, service_id::<T>())
    }

    /// A parameter resolved as the service registered under `id`
    pub fn service_id(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Service(id.into()),
            default: None,
            variadic: false,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Ordered parameter list of a constructor or function
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Required plain data parameter
    pub fn value(self, name: impl Into<String>) -> Self {
        self.param(Parameter::value(name))
    }

    /// Plain data parameter with a default
    pub fn value_or(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.param(Parameter::value(name).default(default))
    }

    /// Service parameter resolved by type
    pub fn service<T: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.param(Parameter::service::<T>(name))
    }

    /// Variadic parameter; resolves to an empty list when nothing is supplied
    pub fn variadic(self, name: impl Into<String>) -> Self {
        self.param(Parameter::value(name).variadic())
    }

    /// The current request, registered by the router for every dispatch
    pub fn request(self) -> Self {
        self.param(Parameter::service::<Request>("request"))
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Resolved arguments, in signature order
#[derive(Debug, Clone)]
pub struct Arguments {
    target: String,
    values: Vec<(String, Argument)>,
}

impl Arguments {
    pub(crate) fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Argument) {
        self.values.push((name.into(), value));
    }

    /// Name of whatever these arguments were resolved for
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&Argument, ResolutionError> {
        self.get(name)
            .ok_or_else(|| ResolutionError::UnresolvableDependency {
                parameter: name.to_string(),
                target: self.target.clone(),
            })
    }

    /// Raw data value
    pub fn value(&self, name: &str) -> Result<Value, ResolutionError> {
        match self.require(name)? {
            Argument::Value(v) => Ok(v.clone()),
            Argument::Variadic(items) => Ok(Value::Array(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Argument::Value(v) => Some(v.clone()),
                        _ => None,
                    })
                    .collect(),
            )),
            Argument::Service(_) => Err(ResolutionError::invalid(name, "expected a value, got a service")),
        }
    }

    /// String form of a scalar value
    pub fn string(&self, name: &str) -> Result<String, ResolutionError> {
        match self.value(name)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ResolutionError::invalid(
                name,
                format!("expected a scalar, got {}", other),
            )),
        }
    }

    /// Parse a scalar value with `FromStr`
    pub fn parse<T>(&self, name: &str) -> Result<T, ResolutionError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.string(name)?;
        raw.parse::<T>()
            .map_err(|e| ResolutionError::invalid(name, e.to_string()))
    }

    /// Deserialize a data value
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ResolutionError> {
        serde_json::from_value(self.value(name)?)
            .map_err(|e| ResolutionError::invalid(name, e.to_string()))
    }

    /// Downcast a service argument
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ResolutionError> {
        match self.require(name)? {
            Argument::Service(instance) => {
                instance
                    .clone()
                    .downcast::<T>()
                    .map_err(|_| ResolutionError::TypeMismatch {
                        id: name.to_string(),
                        expected: std::any::type_name::<T>(),
                    })
            }
            _ => Err(ResolutionError::invalid(name, "expected a service, got a value")),
        }
    }

    /// Items of a variadic parameter. A single supplied value counts as one item.
    pub fn variadic(&self, name: &str) -> Vec<Argument> {
        match self.get(name) {
            Some(Argument::Variadic(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        }
    }

    /// The request declared with [`Signature::request`]
    pub fn request(&self) -> Result<Arc<Request>, ResolutionError> {
        self.service::<Request>("request")
    }
}

/// A function together with its parameter declarations.
///
/// Invoked through [`Container::call`](super::Container::call), which resolves
/// the arguments first.
pub struct Callable<R> {
    name: String,
    signature: Signature,
    func: Arc<dyn Fn(Arguments) -> R + Send + Sync>,
}

impl<R> Callable<R> {
    pub fn new<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(Arguments) -> R + Send + Sync + 'static,
    {
        Self {
            name: "Closure".to_string(),
            signature,
            func: Arc::new(func),
        }
    }

    /// Name used in diagnostics
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke with already resolved arguments
    pub fn invoke(&self, args: Arguments) -> R {
        (self.func)(args)
    }
}

impl<R> Clone for Callable<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            signature: self.signature.clone(),
            func: self.func.clone(),
        }
    }
}

impl<R> fmt::Debug for Callable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}
