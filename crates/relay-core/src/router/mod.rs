//! Routing
//!
//! The [`Router`] owns the route table and the group stack used while routes
//! are registered, and turns a [`Request`] into a [`Response`]:
//!
//! ```rust,ignore
//! let mut router = Router::new(container);
//! router.get("/users/{id:[0-9]+}", "UserController@show").name("users.show");
//! router.group(Group::new().prefix("/admin").middleware("auth"), |r| {
//!     r.resource("posts", "Admin.PostController");
//! });
//!
//! let response = router.dispatch(request).await;
//! ```
//!
//! Matching is first-match-wins in registration order. Failures raised by an
//! action are always rendered into a response here; they never leave
//! [`Router::dispatch`].

mod action;
mod error;
mod group;
mod route;
mod table;

pub use action::{action, Action, ActionFuture, Controller, RouteAction, SharedController, INVOKE_METHOD};
pub use error::RouteError;
pub use group::Group;
pub use route::{MethodFilter, Route, DEFAULT_PARAM_PATTERN};
pub use table::{RouteHandle, RouteTable};

use crate::container::{service_id, Argument, Container, Params};
use crate::error::{DispatchError, HttpError};
use crate::middleware::{MiddlewareRef, Pipeline};
use crate::path_params::PathParams;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use group::GroupStack;
use http::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;
use tracing::{debug, error};

/// Route registration and dispatch
pub struct Router {
    container: Container,
    routes: RouteTable,
    groups: GroupStack,
    middleware: Vec<MiddlewareRef<Request>>,
    patterns: HashMap<String, String>,
    debug: bool,
}

impl Router {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            routes: RouteTable::new(),
            groups: GroupStack::default(),
            middleware: Vec::new(),
            patterns: HashMap::new(),
            debug: false,
        }
    }

    /// Register a route, merging every active group into it
    #[track_caller]
    pub fn add_route(
        &mut self,
        method: impl Into<MethodFilter>,
        uri: &str,
        action: impl Into<RouteAction>,
    ) -> RouteHandle<'_> {
        let mut route = Route::new(method, uri, action);
        self.groups.apply(&mut route);
        for (name, pattern) in &self.patterns {
            route.set_pattern(name, pattern);
        }

        debug!(
            method = %route.method(),
            uri = %route.uri(),
            action = %route.action().describe(),
            "Route registered"
        );
        self.routes.add(route)
    }

    #[track_caller]
    pub fn get(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(Method::GET, uri, action)
    }

    #[track_caller]
    pub fn post(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(Method::POST, uri, action)
    }

    #[track_caller]
    pub fn put(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(Method::PUT, uri, action)
    }

    #[track_caller]
    pub fn patch(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(Method::PATCH, uri, action)
    }

    #[track_caller]
    pub fn delete(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(Method::DELETE, uri, action)
    }

    /// Route answering every method
    #[track_caller]
    pub fn any(&mut self, uri: &str, action: impl Into<RouteAction>) -> RouteHandle<'_> {
        self.add_route(MethodFilter::Any, uri, action)
    }

    /// One route per method, all sharing the action
    #[track_caller]
    pub fn methods(&mut self, methods: &[Method], uri: &str, action: impl Into<RouteAction>) {
        let action = action.into();
        for method in methods {
            self.add_route(method.clone(), uri, action.clone());
        }
    }

    /// Resource routes for a controller.
    ///
    /// | Method    | URI             | Action    | Name            |
    /// |-----------|-----------------|-----------|-----------------|
    /// | GET       | `/{name}`       | `index`   | `{name}.index`  |
    /// | GET       | `/{name}/{id}`  | `show`    | `{name}.show`   |
    /// | POST      | `/{name}`       | `store`   | `{name}.store`  |
    /// | PUT/PATCH | `/{name}/{id}`  | `update`  | `{name}.update` |
    /// | DELETE    | `/{name}/{id}`  | `destroy` | `{name}.destroy`|
    #[track_caller]
    pub fn resource(&mut self, name: &str, controller: &str) {
        let base = name.trim_matches('/');
        let member = format!("{}/{{id}}", base);
        let prefix = base.replace('/', ".");
        let named = |action: &str| format!("{}.{}", prefix, action);

        self.get(base, (controller, "index")).name(&named("index"));
        self.get(&member, (controller, "show")).name(&named("show"));
        self.post(base, (controller, "store")).name(&named("store"));
        self.put(&member, (controller, "update")).name(&named("update"));
        self.patch(&member, (controller, "update"));
        self.delete(&member, (controller, "destroy")).name(&named("destroy"));
    }

    /// Register routes inside a group. Groups nest.
    pub fn group(&mut self, group: Group, routes: impl FnOnce(&mut Router)) {
        self.groups.push(group);
        routes(self);
        self.groups.pop();
    }

    /// Router-wide constraint for every parameter called `name`. Inline and
    /// per-route constraints take precedence.
    pub fn pattern(&mut self, name: &str, pattern: &str) -> &mut Self {
        self.patterns.insert(name.to_string(), pattern.to_string());
        for route in self.routes.routes_mut() {
            route.set_pattern(name, pattern);
        }
        self
    }

    /// Middleware run before every route's own middleware
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef<Request>>) -> &mut Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Include diagnostics in error bodies
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Url for a named route
    pub fn url<I, K, V>(&self, name: &str, params: I) -> Result<String, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let route = self.routes.get_by_name(name)?;
        let params: PathParams = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.to_string()))
            .collect();
        route.url(&params)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes.match_route(method, path)
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Dispatch a request to the first matching route.
    ///
    /// Global middleware runs before the route's middleware. The current
    /// request is registered as `request` in a container scope private to
    /// this dispatch.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_string();

        let Some(route) = self.routes.match_route(&method, &path) else {
            debug!(method = %method, path = %path, "No route matched");
            return HttpError::not_found("Route not found")
                .with_detail("path", path)
                .with_detail("method", method.as_str())
                .into_response();
        };

        debug!(
            method = %method,
            path = %path,
            route = %route.uri(),
            action = %route.action().describe(),
            "Route matched"
        );

        let params = route.parse_parameters(&path);
        request.set_route_params(params.clone());

        let container = self.container.scope();
        register_request(&container, request.clone());

        let invocation = Arc::new(ActionInvocation {
            container: container.clone(),
            action: route.action().clone(),
            location: route.location(),
            params,
            debug: self.debug,
        });

        let middleware: Vec<MiddlewareRef<Request>> = self
            .middleware
            .iter()
            .chain(route.middleware())
            .cloned()
            .collect();

        if middleware.is_empty() {
            return invocation.run(request).await;
        }

        let result = Pipeline::new(container)
            .send(request)
            .through(middleware)
            .debug(self.debug)
            .then(move |request: Request| {
                let invocation = invocation.clone();
                async move { Ok::<_, DispatchError>(invocation.run(request).await) }
            })
            .await;

        match result {
            Ok(response) => response,
            Err(e) => e.into_http_error(self.debug).into_response(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware)
            .field("debug", &self.debug)
            .finish()
    }
}

fn register_request(container: &Container, request: Request) {
    let request = Arc::new(request);
    container.instance_arc("request", request.clone());
    container.instance_arc(service_id::<Request>(), request);
}

/// Everything needed to run a matched route's action
struct ActionInvocation {
    container: Container,
    action: Action,
    location: &'static Location<'static>,
    params: PathParams,
    debug: bool,
}

impl ActionInvocation {
    async fn run(&self, request: Request) -> Response {
        match self.invoke(request).await {
            Ok(response) => response,
            Err(e) => self.render(e),
        }
    }

    async fn invoke(&self, request: Request) -> Result<Response, DispatchError> {
        // Middleware may have replaced the request
        register_request(&self.container, request);

        let params: Params = self
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), Argument::Value(Value::String(value.to_string()))))
            .collect();

        let future = match &self.action {
            Action::Closure(callable) => self.container.call(callable, &params)?,
            Action::MethodRef { controller, method } => {
                let instance = self
                    .container
                    .make_as::<SharedController>(controller, &Params::new())?;
                let callable = (*instance).clone().method(method).ok_or_else(|| {
                    DispatchError::handler(format!(
                        "Method {}::{}() does not exist",
                        controller, method
                    ))
                })?;
                self.container.call(&callable, &params)?
            }
        };
        future.await
    }

    /// Render an action failure.
    ///
    /// Failures with their own status keep it. Everything else is a 500
    /// `"Action Error"` whose `message` and `action` are always part of the
    /// body: actions choose what their errors say. Debug mode adds `file`,
    /// `line` and `trace`. Redaction to [`REDACTED_MESSAGE`] only applies to
    /// failures that escape to the kernel, such as panics.
    ///
    /// [`REDACTED_MESSAGE`]: crate::REDACTED_MESSAGE
    fn render(&self, e: DispatchError) -> Response {
        let descriptor = self.action.describe();
        if matches!(e, DispatchError::Http { .. }) {
            debug!(action = %descriptor, status = %e.status(), "Action returned an error status");
            return e.into_http_error(self.debug).into_response();
        }

        error!(action = %descriptor, error = %e, "Action failed");

        let mut rendered = HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Action Error", e.to_string())
            .with_detail("action", descriptor);
        if self.debug {
            let location = e.location().unwrap_or(self.location);
            rendered = rendered
                .with_detail("file", location.file())
                .with_detail("line", location.line())
                .with_detail("trace", e.trace());
        }
        rendered.into_response()
    }
}
