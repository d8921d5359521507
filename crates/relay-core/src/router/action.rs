//! Route actions
//!
//! Every way of naming a handler is normalised into [`Action`] when the route
//! is registered:
//!
//! - a closure built with [`action`] becomes `Action::Closure`
//! - `"UserController@show"` and `("UserController", "show")` become
//!   `Action::MethodRef`
//! - a bare `"InvokableController"` becomes a `MethodRef` to `invoke`
//!
//! Method references are resolved through the container on every dispatch, so
//! controllers get their constructor dependencies (including the current
//! request) injected.

use crate::container::{service_id, Arguments, Callable, Concrete, Container, Injectable, Params, Signature};
use crate::error::DispatchError;
use crate::middleware::MiddlewareRef;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Future produced by a route action
pub type ActionFuture = BoxFuture<'static, Result<Response, DispatchError>>;

/// Method used for a controller given without `@method`
pub const INVOKE_METHOD: &str = "invoke";

/// A controller exposes its actions by name
pub trait Controller: Send + Sync + 'static {
    fn method(self: Arc<Self>, name: &str) -> Option<Callable<ActionFuture>>;
}

/// Type-erased controller, as stored in the container
pub type SharedController = Arc<dyn Controller>;

/// Build an action callable from an async closure
pub fn action<F, Fut, R>(signature: Signature, f: F) -> Callable<ActionFuture>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, DispatchError>> + Send + 'static,
    R: IntoResponse,
{
    Callable::new(signature, move |args: Arguments| {
        let fut = f(args);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) }) as ActionFuture
    })
}

/// What a route runs
#[derive(Clone, Debug)]
pub enum Action {
    Closure(Callable<ActionFuture>),
    MethodRef { controller: String, method: String },
}

impl Action {
    /// Closure action from a signature and an async closure
    pub fn handler<F, Fut, R>(signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, DispatchError>> + Send + 'static,
        R: IntoResponse,
    {
        Self::Closure(action(signature, f))
    }

    /// Parse `"Controller@method"` or a bare `"Controller"`
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('@') {
            Some((controller, method)) => Self::MethodRef {
                controller: controller.to_string(),
                method: method.to_string(),
            },
            None => Self::MethodRef {
                controller: reference.to_string(),
                method: INVOKE_METHOD.to_string(),
            },
        }
    }

    /// Human-readable descriptor used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Closure(callable) => callable.name().to_string(),
            Self::MethodRef { controller, method } => format!("{}@{}", controller, method),
        }
    }

    pub(crate) fn apply_namespace(&mut self, namespace: &str) {
        if let Self::MethodRef { controller, .. } = self {
            *controller = format!("{}::{}", namespace, controller);
        }
    }
}

impl From<&str> for Action {
    fn from(reference: &str) -> Self {
        Self::parse(reference)
    }
}

impl From<String> for Action {
    fn from(reference: String) -> Self {
        Self::parse(&reference)
    }
}

impl From<(&str, &str)> for Action {
    fn from((controller, method): (&str, &str)) -> Self {
        Self::MethodRef {
            controller: controller.to_string(),
            method: method.to_string(),
        }
    }
}

impl From<Callable<ActionFuture>> for Action {
    fn from(callable: Callable<ActionFuture>) -> Self {
        Self::Closure(callable)
    }
}

/// An action with middleware attached at registration
#[derive(Clone, Debug)]
pub struct RouteAction {
    pub action: Action,
    pub middleware: Vec<MiddlewareRef<Request>>,
}

impl RouteAction {
    pub fn uses(action: impl Into<Action>) -> Self {
        Self {
            action: action.into(),
            middleware: Vec::new(),
        }
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }
}

impl From<Action> for RouteAction {
    fn from(action: Action) -> Self {
        Self::uses(action)
    }
}

impl From<&str> for RouteAction {
    fn from(reference: &str) -> Self {
        Self::uses(reference)
    }
}

impl From<String> for RouteAction {
    fn from(reference: String) -> Self {
        Self::uses(reference)
    }
}

impl From<(&str, &str)> for RouteAction {
    fn from(reference: (&str, &str)) -> Self {
        Self::uses(reference)
    }
}

impl From<Callable<ActionFuture>> for RouteAction {
    fn from(callable: Callable<ActionFuture>) -> Self {
        Self::uses(callable)
    }
}

impl Container {
    /// Register controller `C` and bind `id` to a fresh instance per resolution
    pub fn controller<C: Injectable + Controller>(&self, id: impl Into<String>) {
        self.register::<C>();
        self.bind(
            id,
            Concrete::factory(|container: &Container, params: &Params| {
                let controller = container.make_as::<C>(service_id::<C>(), params)?;
                Ok(controller as SharedController)
            }),
        );
    }

    /// Register a ready-made controller instance under `id`
    pub fn controller_instance<C: Controller>(&self, id: impl Into<String>, controller: C) {
        let shared: SharedController = Arc::new(controller);
        self.instance(id, shared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ResolutionError;

    struct Greeter {
        greeting: String,
    }

    impl Injectable for Greeter {
        fn signature() -> Signature {
            Signature::new().value_or("greeting", "hello")
        }

        fn construct(args: Arguments) -> Result<Self, ResolutionError> {
            Ok(Self {
                greeting: args.string("greeting")?,
            })
        }
    }

    impl Controller for Greeter {
        fn method(self: Arc<Self>, name: &str) -> Option<Callable<ActionFuture>> {
            match name {
                "greet" => Some(action(Signature::new().value("name"), move |args| {
                    let this = self.clone();
                    async move {
                        Ok::<_, DispatchError>(format!("{} {}", this.greeting, args.string("name")?))
                    }
                })),
                _ => None,
            }
        }
    }

    #[test]
    fn test_parse_references() {
        match Action::parse("UserController@show") {
            Action::MethodRef { controller, method } => {
                assert_eq!(controller, "UserController");
                assert_eq!(method, "show");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(Action::parse("HealthCheck").describe(), "HealthCheck@invoke");
        assert_eq!(Action::from(("Posts", "index")).describe(), "Posts@index");
    }

    #[test]
    fn test_namespace_prefixes_controllers_only() {
        let mut action = Action::parse("UserController@show");
        action.apply_namespace("admin");
        assert_eq!(action.describe(), "admin::UserController@show");

        let mut closure = Action::handler(Signature::new(), |_| async { Ok("hi") });
        closure.apply_namespace("admin");
        assert_eq!(closure.describe(), "Closure");
    }

    #[tokio::test]
    async fn test_controller_resolution() {
        let container = Container::new();
        container.controller::<Greeter>("Greeter");

        let controller = container
            .make_as::<SharedController>("Greeter", &Params::new())
            .unwrap();
        let greet = (*controller).clone().method("greet").unwrap();
        assert!((*controller).clone().method("missing").is_none());

        let mut params = Params::new();
        params.insert("name".to_string(), "relay".into());
        let response = container.call(&greet, &params).unwrap().await.unwrap();
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"hello relay");
    }
}
