//! Service container with autowiring
//!
//! The container maps identifiers to recipes ([`Binding`]s) and resolves them
//! on demand. Types that want to be built without an explicit binding are
//! registered once in the type registry with their constructor
//! [`Signature`]; the container then supplies every parameter by name, by
//! type, by default value or as an empty variadic list, in that order.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_core::container::{Container, Concrete, Params};
//!
//! let container = Container::new();
//! container.register_default::<Clock>();
//! container.singleton("clock", relay_core::service_id::<Clock>());
//!
//! let a = container.get("clock")?;
//! let b = container.get("clock")?;
//! assert!(Arc::ptr_eq(&a, &b));
//! ```
//!
//! The binding, alias, type and instance tables are shared by every clone of a
//! container. [`Container::scope`] creates a per-request view whose
//! [`instance`](Container::instance) registrations stay private to that view.

mod error;
mod signature;

pub use error::ResolutionError;
pub use signature::{
    service_id, Argument, Arguments, Callable, Instance, ParamKind, Parameter, Params, Signature,
};

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Factory closure stored in a binding
pub type Factory =
    Arc<dyn Fn(&Container, &Params) -> Result<Instance, ResolutionError> + Send + Sync>;

type Constructor = Arc<dyn Fn(Arguments) -> Result<Instance, ResolutionError> + Send + Sync>;

/// A type the container can construct on its own.
///
/// `signature` declares the constructor parameters; `construct` receives them
/// resolved. Types with a zero-argument constructor can skip this trait and use
/// [`Container::register_default`].
pub trait Injectable: Sized + Send + Sync + 'static {
    fn signature() -> Signature {
        Signature::new()
    }

    fn construct(args: Arguments) -> Result<Self, ResolutionError>;
}

/// What a binding produces
#[derive(Clone)]
pub enum Concrete {
    /// Call the factory
    Factory(Factory),
    /// Resolve another identifier. Binding an id to itself means "build it
    /// from the type registry".
    Id(String),
}

impl Concrete {
    /// Wrap a typed factory
    pub fn factory<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &Params) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |container: &Container, params: &Params| {
            f(container, params).map(|value| Arc::new(value) as Instance)
        }))
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }
}

impl From<&str> for Concrete {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Concrete {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
        }
    }
}

/// A registered recipe
#[derive(Debug, Clone)]
pub struct Binding {
    pub concrete: Concrete,
    pub shared: bool,
}

#[derive(Clone)]
enum TypeEntry {
    Concrete {
        signature: Signature,
        construct: Constructor,
    },
    Abstract,
}

#[derive(Default)]
struct Registry {
    bindings: RwLock<HashMap<String, Binding>>,
    instances: RwLock<HashMap<String, Instance>>,
    aliases: RwLock<HashMap<String, String>>,
    types: RwLock<HashMap<String, TypeEntry>>,
    resolved: RwLock<HashSet<String>>,
}

type ScopedInstances = Arc<RwLock<HashMap<String, Instance>>>;

/// Dependency resolution container.
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Clone, Default)]
pub struct Container {
    registry: Arc<Registry>,
    scope: Option<ScopedInstances>,
}

thread_local! {
    static RESOLVING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks an identifier as being resolved on the current thread
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(id: &str) -> Result<Self, ResolutionError> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().position(|entry| entry == id) {
                let mut chain: Vec<String> = stack[pos..].to_vec();
                chain.push(id.to_string());
                return Err(ResolutionError::CircularDependency { chain });
            }
            stack.push(id.to_string());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. Replaces any previous binding for `id` and drops
    /// an instance cached for it.
    pub fn bind(&self, id: impl Into<String>, concrete: impl Into<Concrete>) {
        self.bind_shared(id, concrete, false);
    }

    /// Register a shared binding: resolved once, then cached
    pub fn singleton(&self, id: impl Into<String>, concrete: impl Into<Concrete>) {
        self.bind_shared(id, concrete, true);
    }

    pub fn bind_shared(&self, id: impl Into<String>, concrete: impl Into<Concrete>, shared: bool) {
        let id = id.into();
        let concrete = concrete.into();
        debug!(id = %id, shared, concrete = ?concrete, "Binding registered");
        self.registry.instances.write().remove(&id);
        self.registry
            .bindings
            .write()
            .insert(id, Binding { concrete, shared });
    }

    /// Register a ready-made value as the resolved instance for `id`
    pub fn instance<T: Send + Sync + 'static>(&self, id: impl Into<String>, value: T) {
        self.instance_arc(id, Arc::new(value));
    }

    /// Register an already type-erased instance.
    ///
    /// On a scoped container the instance is only visible through that scope.
    pub fn instance_arc(&self, id: impl Into<String>, instance: Instance) {
        let id = id.into();
        match &self.scope {
            Some(scope) => {
                trace!(id = %id, "Scoped instance registered");
                scope.write().insert(id, instance);
            }
            None => {
                debug!(id = %id, "Instance registered");
                self.registry.instances.write().insert(id, instance);
            }
        }
    }

    /// Register `alias` as a one-hop redirect to `id`
    pub fn alias(&self, alias: impl Into<String>, id: impl Into<String>) {
        let alias = alias.into();
        let id = id.into();
        debug!(alias = %alias, id = %id, "Alias registered");
        self.registry.aliases.write().insert(alias, id);
    }

    /// Add `T` to the type registry under [`service_id::<T>()`](service_id)
    pub fn register<T: Injectable>(&self) {
        let construct: Constructor =
            Arc::new(|args: Arguments| T::construct(args).map(|value| Arc::new(value) as Instance));
        self.register_type(
            service_id::<T>(),
            TypeEntry::Concrete {
                signature: T::signature(),
                construct,
            },
        );
    }

    /// Add a type with a zero-argument constructor to the type registry
    pub fn register_default<T: Default + Send + Sync + 'static>(&self) {
        let construct: Constructor = Arc::new(|_: Arguments| Ok(Arc::new(T::default()) as Instance));
        self.register_type(
            service_id::<T>(),
            TypeEntry::Concrete {
                signature: Signature::new(),
                construct,
            },
        );
    }

    /// Declare an identifier that exists but cannot be built without a binding
    pub fn register_abstract(&self, id: impl Into<String>) {
        self.register_type(&id.into(), TypeEntry::Abstract);
    }

    fn register_type(&self, id: &str, entry: TypeEntry) {
        debug!(id = %id, "Type registered");
        self.registry.types.write().insert(id.to_string(), entry);
    }

    /// Whether `id` can be resolved without falling through to an error
    pub fn has(&self, id: &str) -> bool {
        if let Some(scope) = &self.scope {
            if scope.read().contains_key(id) {
                return true;
            }
        }
        id == service_id::<Container>()
            || self.registry.bindings.read().contains_key(id)
            || self.registry.instances.read().contains_key(id)
            || self.registry.aliases.read().contains_key(id)
            || self.registry.types.read().contains_key(id)
    }

    /// Whether `id` has been resolved at least once or holds an instance
    pub fn resolved(&self, id: &str) -> bool {
        let id = self.canonical(id);
        self.registry.resolved.read().contains(&id) || self.cached(&id).is_some()
    }

    /// Whether `id` is bound as shared
    pub fn is_shared(&self, id: &str) -> bool {
        let id = self.canonical(id);
        self.registry
            .bindings
            .read()
            .get(&id)
            .map(|b| b.shared)
            .unwrap_or(false)
    }

    /// Resolve `id` without extra parameters
    pub fn get(&self, id: &str) -> Result<Instance, ResolutionError> {
        self.make(id, &Params::new())
    }

    /// Resolve `id`.
    ///
    /// Follows at most one alias, returns a cached instance if there is one,
    /// otherwise runs the binding (or builds `id` from the type registry when
    /// nothing is bound) and caches the result if the binding is shared.
    ///
    /// Unless something else is bound under it, [`service_id::<Container>()`]
    /// resolves to a handle on this container.
    pub fn make(&self, id: &str, params: &Params) -> Result<Instance, ResolutionError> {
        let id = self.canonical(id);

        if let Some(instance) = self.cached(&id) {
            trace!(id = %id, "Resolved cached instance");
            return Ok(instance);
        }

        let binding = self.registry.bindings.read().get(&id).cloned();
        if binding.is_none() && id == service_id::<Container>() {
            trace!(id = %id, "Resolved the container itself");
            return Ok(Arc::new(self.clone()));
        }

        let _guard = ResolutionGuard::enter(&id)?;
        trace!(id = %id, bound = binding.is_some(), "Resolving");

        let (object, shared) = match binding {
            Some(Binding {
                concrete: Concrete::Factory(factory),
                shared,
            }) => (factory(self, params)?, shared),
            Some(Binding {
                concrete: Concrete::Id(other),
                shared,
            }) if other != id => (self.make(&other, params)?, shared),
            Some(Binding { shared, .. }) => (self.build(&id, params)?, shared),
            None => (self.build(&id, params)?, false),
        };

        self.registry.resolved.write().insert(id.clone());

        if shared {
            let mut instances = self.registry.instances.write();
            return Ok(instances.entry(id).or_insert(object).clone());
        }
        Ok(object)
    }

    /// Resolve `id` and downcast it to `T`
    pub fn make_as<T: Send + Sync + 'static>(
        &self,
        id: &str,
        params: &Params,
    ) -> Result<Arc<T>, ResolutionError> {
        self.make(id, params)?
            .downcast::<T>()
            .map_err(|_| ResolutionError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Resolve the service registered for `T`
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolutionError> {
        self.make_as::<T>(service_id::<T>(), &Params::new())
    }

    /// Construct `id` from the type registry, autowiring its constructor
    pub fn build(&self, id: &str, params: &Params) -> Result<Instance, ResolutionError> {
        let entry = self.registry.types.read().get(id).cloned();
        match entry {
            None => Err(ResolutionError::TypeNotFound(id.to_string())),
            Some(TypeEntry::Abstract) => Err(ResolutionError::NotInstantiable(id.to_string())),
            Some(TypeEntry::Concrete {
                signature,
                construct,
            }) => {
                let args = self
                    .resolve_dependencies(id, &signature, params)
                    .map_err(|e| ResolutionError::wrap(id, e))?;
                trace!(id = %id, args = args.iter().count(), "Constructing");
                construct(args).map_err(|e| ResolutionError::wrap(id, e))
            }
        }
    }

    /// Invoke `callable` with its parameters resolved like constructor
    /// dependencies
    pub fn call<R>(&self, callable: &Callable<R>, params: &Params) -> Result<R, ResolutionError> {
        let args = self.resolve_dependencies(callable.name(), callable.signature(), params)?;
        Ok(callable.invoke(args))
    }

    fn resolve_dependencies(
        &self,
        target: &str,
        signature: &Signature,
        params: &Params,
    ) -> Result<Arguments, ResolutionError> {
        let mut args = Arguments::new(target);

        for param in signature.params() {
            if let Some(value) = params.get(&param.name) {
                args.push(&param.name, value.clone());
                continue;
            }

            if let ParamKind::Service(service) = &param.kind {
                if self.has(service) || param.default.is_none() {
                    let instance = self.make(service, &Params::new())?;
                    args.push(&param.name, Argument::Service(instance));
                    continue;
                }
            }

            if let Some(default) = &param.default {
                args.push(&param.name, Argument::Value(default.clone()));
            } else if param.variadic {
                args.push(&param.name, Argument::Variadic(Vec::new()));
            } else {
                return Err(ResolutionError::UnresolvableDependency {
                    parameter: param.name.clone(),
                    target: target.to_string(),
                });
            }
        }

        Ok(args)
    }

    /// A per-request view sharing every table except a private instance
    /// overlay. Scoping a scoped container copies the parent's overlay.
    pub fn scope(&self) -> Container {
        let overlay = self
            .scope
            .as_ref()
            .map(|parent| parent.read().clone())
            .unwrap_or_default();
        Container {
            registry: self.registry.clone(),
            scope: Some(Arc::new(RwLock::new(overlay))),
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Drop a cached instance so the next `make` resolves it again
    pub fn forget_instance(&self, id: &str) {
        if let Some(scope) = &self.scope {
            scope.write().remove(id);
        }
        self.registry.instances.write().remove(id);
    }

    /// Clear bindings, instances, aliases and resolution history. The type
    /// registry is kept.
    pub fn flush(&self) {
        if let Some(scope) = &self.scope {
            scope.write().clear();
        }
        self.registry.bindings.write().clear();
        self.registry.instances.write().clear();
        self.registry.aliases.write().clear();
        self.registry.resolved.write().clear();
    }

    fn canonical(&self, id: &str) -> String {
        self.registry
            .aliases
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn cached(&self, id: &str) -> Option<Instance> {
        if let Some(scope) = &self.scope {
            if let Some(instance) = scope.read().get(id) {
                return Some(instance.clone());
            }
        }
        self.registry.instances.read().get(id).cloned()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.registry.bindings.read().len())
            .field("instances", &self.registry.instances.read().len())
            .field("aliases", &self.registry.aliases.read().len())
            .field("types", &self.registry.types.read().len())
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Foo;

    #[derive(Default, Debug)]
    struct Clock {
        ticks: AtomicUsize,
    }

    struct Mailer {
        clock: Arc<Clock>,
        from: String,
        retries: u32,
    }

    impl Injectable for Mailer {
        fn signature() -> Signature {
            Signature::new()
                .service::<Clock>("clock")
                .value("from")
                .value_or("retries", 3)
        }

        fn construct(args: Arguments) -> Result<Self, ResolutionError> {
            Ok(Self {
                clock: args.service::<Clock>("clock")?,
                from: args.string("from")?,
                retries: args.parse("retries")?,
            })
        }
    }

    struct Digest {
        recipients: Vec<Argument>,
    }

    impl Injectable for Digest {
        fn signature() -> Signature {
            Signature::new().variadic("recipients")
        }

        fn construct(args: Arguments) -> Result<Self, ResolutionError> {
            Ok(Self {
                recipients: args.variadic("recipients"),
            })
        }
    }

    #[derive(Debug)]
    struct Chicken;
    #[derive(Debug)]
    struct Egg;

    impl Injectable for Chicken {
        fn signature() -> Signature {
            Signature::new().service::<Egg>("egg")
        }

        fn construct(_: Arguments) -> Result<Self, ResolutionError> {
            Ok(Chicken)
        }
    }

    impl Injectable for Egg {
        fn signature() -> Signature {
            Signature::new().service::<Chicken>("chicken")
        }

        fn construct(_: Arguments) -> Result<Self, ResolutionError> {
            Ok(Egg)
        }
    }

    fn params(values: &[(&str, Argument)]) -> Params {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_default_construction_without_binding() {
        let container = Container::new();
        container.register_default::<Foo>();

        let foo = container.make_as::<Foo>(service_id::<Foo>(), &Params::new());
        assert!(foo.is_ok());
    }

    #[test]
    fn test_unknown_type_does_not_exist() {
        let container = Container::new();
        let err = container.get("Nope").unwrap_err();
        assert!(matches!(err, ResolutionError::TypeNotFound(ref id) if id == "Nope"));
        assert_eq!(err.to_string(), "Class or interface 'Nope' does not exist");
    }

    #[test]
    fn test_abstract_is_not_instantiable() {
        let container = Container::new();
        container.register_abstract("Cache");

        let err = container.get("Cache").unwrap_err();
        assert!(matches!(err, ResolutionError::NotInstantiable(_)));

        container.bind("Cache", Concrete::factory(|_: &Container, _: &Params| Ok(7u8)));
        assert!(container.make_as::<u8>("Cache", &Params::new()).is_ok());
    }

    #[test]
    fn test_singleton_returns_identical_instance() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.singleton("clock", service_id::<Clock>());

        let a = container.get("clock").unwrap();
        let b = container.get("clock").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_plain_binding_returns_fresh_instances() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.bind("clock", service_id::<Clock>());

        let a = container.make_as::<Clock>("clock", &Params::new()).unwrap();
        let b = container.make_as::<Clock>("clock", &Params::new()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_receives_extra_params() {
        let container = Container::new();
        container.bind(
            "greeting",
            Concrete::factory(|_: &Container, params: &Params| {
                let name = params
                    .get("name")
                    .and_then(Argument::as_str)
                    .unwrap_or("world")
                    .to_string();
                Ok(format!("hello {}", name))
            }),
        );

        let greeting = container
            .make_as::<String>("greeting", &params(&[("name", Argument::from("relay"))]))
            .unwrap();
        assert_eq!(greeting.as_str(), "hello relay");
    }

    #[test]
    fn test_instance_bypasses_factory() {
        let container = Container::new();
        container.instance("answer", 42u32);

        let a = container.make_as::<u32>("answer", &Params::new()).unwrap();
        let b = container.make_as::<u32>("answer", &Params::new()).unwrap();
        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_alias_follows_one_hop() {
        let container = Container::new();
        container.register_default::<Foo>();
        container.alias("Foo", service_id::<Foo>());
        container.alias("Bar", "Foo");

        assert!(container.get("Foo").is_ok());
        // Bar -> Foo is followed, Foo -> type id is not
        assert!(matches!(
            container.get("Bar").unwrap_err(),
            ResolutionError::TypeNotFound(ref id) if id == "Foo"
        ));
    }

    #[test]
    fn test_autowiring_order() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.register::<Mailer>();

        let mailer = container
            .make_as::<Mailer>(
                service_id::<Mailer>(),
                &params(&[("from", Argument::from("noreply@example.com"))]),
            )
            .unwrap();
        assert_eq!(mailer.from, "noreply@example.com");
        assert_eq!(mailer.retries, 3);
        mailer.clock.ticks.fetch_add(1, Ordering::SeqCst);

        // Named params win over defaults and over type resolution
        let clock = Arc::new(Clock::default());
        let mailer = container
            .make_as::<Mailer>(
                service_id::<Mailer>(),
                &params(&[
                    ("from", Argument::from("a@b.c")),
                    ("retries", Argument::from(json!(5))),
                    ("clock", Argument::Service(clock.clone())),
                ]),
            )
            .unwrap();
        assert_eq!(mailer.retries, 5);
        assert!(Arc::ptr_eq(&mailer.clock, &clock));
    }

    #[test]
    fn test_unresolvable_builtin_names_parameter() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.register::<Mailer>();

        let err = container.get(service_id::<Mailer>()).unwrap_err();
        match err.root_cause() {
            ResolutionError::UnresolvableDependency { parameter, .. } => {
                assert_eq!(parameter, "from")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Could not build"));
    }

    #[test]
    fn test_variadic_defaults_to_empty() {
        let container = Container::new();
        container.register::<Digest>();

        let digest = container.resolve::<Digest>().unwrap();
        assert!(digest.recipients.is_empty());
    }

    #[test]
    fn test_circular_dependency_is_reported() {
        let container = Container::new();
        container.register::<Chicken>();
        container.register::<Egg>();

        let err = container.resolve::<Chicken>().unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ResolutionError::CircularDependency { chain } if chain.len() == 3
        ));
    }

    #[test]
    fn test_call_resolves_by_name_then_type_then_default() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.singleton(service_id::<Clock>(), service_id::<Clock>());

        let callable = Callable::new(
            Signature::new()
                .value("id")
                .service::<Clock>("clock")
                .value_or("format", "json"),
            |args: Arguments| -> Result<String, ResolutionError> {
                let clock = args.service::<Clock>("clock")?;
                clock.ticks.fetch_add(1, Ordering::SeqCst);
                Ok(format!("{}:{}", args.string("id")?, args.string("format")?))
            },
        );

        let out = container
            .call(&callable, &params(&[("id", Argument::from("7"))]))
            .unwrap()
            .unwrap();
        assert_eq!(out, "7:json");
        assert_eq!(container.resolve::<Clock>().unwrap().ticks.load(Ordering::SeqCst), 1);

        let err = container.call(&callable, &Params::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::UnresolvableDependency { .. }));
    }

    #[test]
    fn test_scope_keeps_instances_private() {
        let container = Container::new();
        let scoped = container.scope();
        scoped.instance("request-id", "abc".to_string());

        assert!(scoped.has("request-id"));
        assert!(!container.has("request-id"));

        // Process-wide state is still shared
        container.instance("shared", 1u8);
        assert!(scoped.get("shared").is_ok());
    }

    #[test]
    fn test_rebinding_drops_cached_instance() {
        let container = Container::new();
        container.singleton("n", Concrete::factory(|_: &Container, _: &Params| Ok(1u8)));
        assert_eq!(*container.make_as::<u8>("n", &Params::new()).unwrap(), 1);

        container.singleton("n", Concrete::factory(|_: &Container, _: &Params| Ok(2u8)));
        assert_eq!(*container.make_as::<u8>("n", &Params::new()).unwrap(), 2);
    }

    #[test]
    fn test_forget_and_flush() {
        let container = Container::new();
        container.register_default::<Clock>();
        container.singleton("clock", service_id::<Clock>());

        let a = container.get("clock").unwrap();
        assert!(container.resolved("clock"));
        container.forget_instance("clock");
        let b = container.get("clock").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        container.flush();
        assert!(!container.has("clock"));
        assert!(!container.resolved("clock"));
    }

    #[test]
    fn test_type_mismatch() {
        let container = Container::new();
        container.instance("n", 1u8);
        let err = container.make_as::<String>("n", &Params::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_container_resolves_itself() {
        let container = Container::new();
        container.instance("greeting", "hello".to_string());
        assert!(container.has(service_id::<Container>()));

        let callable = Callable::new(
            Signature::new().service::<Container>("container"),
            |args: Arguments| -> Result<String, ResolutionError> {
                let container = args.service::<Container>("container")?;
                Ok((*container.make_as::<String>("greeting", &Params::new())?).clone())
            },
        );
        let greeting = container.call(&callable, &Params::new()).unwrap().unwrap();
        assert_eq!(greeting, "hello");

        // A scoped view hands out itself, overlay included
        let scoped = container.scope();
        scoped.instance("request-only", 7u8);
        let resolved = scoped
            .make_as::<Container>(service_id::<Container>(), &Params::new())
            .unwrap();
        assert!(resolved.is_scoped());
        assert!(resolved.get("request-only").is_ok());
        assert!(container.get("request-only").is_err());
    }
}
