//! Application builder
//!
//! ```rust,ignore
//! let kernel = App::new()
//!     .with_config(Config::from_env()?)
//!     .provider(MailProvider)
//!     .routes(|r| {
//!         r.get("/users/{id}", "UserController@show").name("users.show");
//!     })
//!     .middleware(MiddlewareRef::layer(RequestIdMiddleware::new()))
//!     .build()?;
//!
//! let response = kernel.handle(request).await;
//! ```

use crate::config::Config;
use crate::container::{service_id, Container, ResolutionError};
use crate::kernel::Kernel;
use crate::middleware::MiddlewareRef;
use crate::request::Request;
use crate::router::Router;
use std::sync::Arc;
use tracing::debug;

/// Registers services into the container at startup
pub trait ServiceProvider: Send + Sync + 'static {
    /// Bind services. Runs before any provider is booted.
    fn register(&self, container: &Container) -> Result<(), ResolutionError>;

    /// Runs once after every provider has registered
    fn boot(&self, container: &Container) -> Result<(), ResolutionError> {
        let _ = container;
        Ok(())
    }
}

type RouteSetup = Box<dyn FnOnce(&mut Router)>;

/// Composes configuration, providers and routes into a [`Kernel`]
pub struct App {
    config: Config,
    container: Container,
    providers: Vec<Box<dyn ServiceProvider>>,
    routes: Vec<RouteSetup>,
    middleware: Vec<MiddlewareRef<Request>>,
    route_middleware: Vec<MiddlewareRef<Request>>,
    patterns: Vec<(String, String)>,
}

impl App {
    /// New application with default configuration. Installs the tracing
    /// subscriber if none is set.
    pub fn new() -> Self {
        crate::logging::init();

        Self {
            config: Config::default(),
            container: Container::new(),
            providers: Vec::new(),
            routes: Vec::new(),
            middleware: Vec::new(),
            route_middleware: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// The application container, for bindings made before `build`
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn provider(mut self, provider: impl ServiceProvider) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Register routes. Setups run in order when the app is built.
    pub fn routes(mut self, setup: impl FnOnce(&mut Router) + 'static) -> Self {
        self.routes.push(Box::new(setup));
        self
    }

    /// Kernel middleware, run once per request before routing
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Middleware run before every matched route's own middleware
    pub fn route_middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.route_middleware.push(middleware.into());
        self
    }

    /// Router-wide parameter constraint
    pub fn pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.push((name.into(), pattern.into()));
        self
    }

    /// Register and boot providers, then build the router and kernel
    pub fn build(self) -> Result<Kernel, ResolutionError> {
        let App {
            config,
            container,
            providers,
            routes,
            middleware,
            route_middleware,
            patterns,
        } = self;

        container.instance_arc(service_id::<Config>(), Arc::new(config.clone()));
        container.alias("config", service_id::<Config>());

        for provider in &providers {
            provider.register(&container)?;
        }
        for provider in &providers {
            provider.boot(&container)?;
        }
        debug!(providers = providers.len(), environment = %config.environment, "Providers booted");

        let mut router = Router::new(container.clone());
        for (name, pattern) in &patterns {
            router.pattern(name, pattern);
        }
        for entry in route_middleware {
            router.middleware(entry);
        }
        for setup in routes {
            setup(&mut router);
        }
        debug!(routes = router.routes().len(), "Routes registered");

        let mut kernel = Kernel::new(container, router, config);
        for entry in middleware {
            kernel = kernel.middleware(entry);
        }
        Ok(kernel)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
