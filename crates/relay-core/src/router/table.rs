use super::route::Route;
use super::RouteError;
use crate::middleware::MiddlewareRef;
use crate::request::Request;
use http::Method;
use std::collections::HashMap;

/// Ordered route collection.
///
/// Registration order is match priority: [`RouteTable::match_route`] returns
/// the first route that matches, not the most specific one. The name index
/// can always be rebuilt from the ordered list.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    names: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route and index its name, if any
    pub fn add(&mut self, route: Route) -> RouteHandle<'_> {
        let index = self.routes.len();
        if let Some(name) = route.name() {
            self.names.insert(name.to_string(), index);
        }
        self.routes.push(route);
        RouteHandle { table: self, index }
    }

    /// First route matching `method` and `path`
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Route, RouteError> {
        self.names
            .get(name)
            .and_then(|&index| self.routes.get(index))
            .ok_or_else(|| RouteError::NameNotFound(name.to_string()))
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.names.clear();
    }

    /// Recompute the name index from the route list. A later route wins when
    /// two share a name.
    pub fn rebuild_name_index(&mut self) {
        self.names = self
            .routes
            .iter()
            .enumerate()
            .filter_map(|(index, route)| route.name().map(|name| (name.to_string(), index)))
            .collect();
    }

    pub(crate) fn routes_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.routes.iter_mut()
    }

    fn rename(&mut self, index: usize, name: &str) {
        let route = &mut self.routes[index];
        if let Some(old) = route.name().map(str::to_string) {
            if self.names.get(&old) == Some(&index) {
                self.names.remove(&old);
            }
        }
        route.set_name(name);
        if let Some(full) = route.name() {
            self.names.insert(full.to_string(), index);
        }
    }
}

/// Builder handle for a route that was just added to a table
pub struct RouteHandle<'a> {
    table: &'a mut RouteTable,
    index: usize,
}

impl<'a> RouteHandle<'a> {
    pub fn route(&self) -> &Route {
        &self.table.routes[self.index]
    }

    fn route_mut(&mut self) -> &mut Route {
        &mut self.table.routes[self.index]
    }

    /// Name the route; enclosing group names are prepended
    pub fn name(mut self, name: &str) -> Self {
        let index = self.index;
        self.table.rename(index, name);
        self
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.route_mut().push_middleware(middleware);
        self
    }

    /// Constrain a parameter (`where`)
    pub fn constraint(mut self, name: &str, pattern: &str) -> Self {
        self.route_mut().set_constraint(name, pattern);
        self
    }

    pub fn constraints<I, K, V>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, pattern) in constraints {
            self.route_mut().set_constraint(name, pattern);
        }
        self
    }

    pub fn defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in defaults {
            self.route_mut().set_default(name, value);
        }
        self
    }
}
