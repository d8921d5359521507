use super::route::Route;
use crate::middleware::MiddlewareRef;
use crate::request::Request;

/// Attributes shared by every route registered inside a group
///
/// ```rust,ignore
/// router.group(Group::new().prefix("/admin").middleware("auth").name("admin"), |r| {
///     r.get("/users", "Admin.UserController@index").name("users"); // admin.users
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: Option<String>,
    middleware: Vec<MiddlewareRef<Request>>,
    constraints: Vec<(String, String)>,
    name: Option<String>,
    namespace: Option<String>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef<Request>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Parameter constraint (`where`)
    pub fn constraint(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.constraints.push((name.into(), pattern.into()));
        self
    }

    /// Name segment prepended to route names (`as`)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Prefix for controller identifiers
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Groups active while routes are being registered, outermost first
#[derive(Debug, Default)]
pub(crate) struct GroupStack {
    groups: Vec<Group>,
}

impl GroupStack {
    pub(crate) fn push(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub(crate) fn pop(&mut self) {
        self.groups.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Merge every active group into `route`.
    ///
    /// Prefixes and middleware concatenate outer to inner, constraints are a
    /// union where the route's own and then the innermost group win, and
    /// name segments join with `.` outer to inner.
    pub(crate) fn apply(&self, route: &mut Route) {
        if self.groups.is_empty() {
            return;
        }

        let mut uri = String::new();
        for prefix in self.groups.iter().filter_map(|g| g.prefix.as_deref()) {
            uri.push('/');
            uri.push_str(prefix);
        }
        uri.push('/');
        uri.push_str(route.uri());
        route.set_uri(&uri);

        let mut middleware: Vec<MiddlewareRef<Request>> = self
            .groups
            .iter()
            .flat_map(|g| g.middleware.iter().cloned())
            .collect();
        middleware.extend(route.middleware().iter().cloned());
        route.replace_middleware(middleware);

        for group in self.groups.iter().rev() {
            for (name, pattern) in &group.constraints {
                route.constraint_entry(name, pattern);
            }
        }

        let names: Vec<&str> = self
            .groups
            .iter()
            .filter_map(|g| g.name.as_deref())
            .map(|n| n.trim_end_matches('.'))
            .filter(|n| !n.is_empty())
            .collect();
        if !names.is_empty() {
            route.set_name_prefix(format!("{}.", names.join(".")));
        }

        let namespaces: Vec<&str> = self
            .groups
            .iter()
            .filter_map(|g| g.namespace.as_deref())
            .map(|n| n.trim_matches(':'))
            .filter(|n| !n.is_empty())
            .collect();
        if !namespaces.is_empty() {
            route.action_mut().apply_namespace(&namespaces.join("::"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use proptest::prelude::*;

    fn apply(groups: Vec<Group>, uri: &str, action: &str) -> Route {
        let mut stack = GroupStack::default();
        for group in groups {
            stack.push(group);
        }
        let mut route = Route::new(Method::GET, uri, action);
        stack.apply(&mut route);
        route
    }

    fn middleware_ids(route: &Route) -> Vec<&str> {
        route.middleware().iter().map(|m| m.describe()).collect()
    }

    #[test]
    fn test_nested_groups_merge_outer_to_inner() {
        let mut route = apply(
            vec![
                Group::new().prefix("/api/").middleware("a").name("api"),
                Group::new().prefix("v1").middleware("b").name("v1."),
            ],
            "/users/{id}",
            "UserController@show",
        );
        route.push_middleware("c");
        route.set_name("users.show");

        assert_eq!(route.uri(), "/api/v1/users/{id}");
        assert_eq!(middleware_ids(&route), vec!["a", "b", "c"]);
        assert_eq!(route.name(), Some("api.v1.users.show"));
    }

    #[test]
    fn test_root_route_in_prefixed_group() {
        let route = apply(vec![Group::new().prefix("/admin")], "/", "Dashboard");
        assert_eq!(route.uri(), "/admin");

        let route = apply(vec![Group::new().prefix("/")], "/", "Home");
        assert_eq!(route.uri(), "/");
    }

    #[test]
    fn test_route_constraint_beats_group_constraint() {
        let mut stack = GroupStack::default();
        stack.push(Group::new().constraint("id", "[0-9]+").constraint("slug", "[a-z]+"));
        stack.push(Group::new().constraint("slug", "[a-z-]+"));

        let mut route = Route::new(Method::GET, "/posts/{id}/{slug}", "Posts@show");
        route.set_constraint("id", "[0-9]{2}");
        stack.apply(&mut route);

        assert_eq!(route.constraints()["id"], "[0-9]{2}");
        assert_eq!(route.constraints()["slug"], "[a-z-]+");
        assert!(route.matches(&Method::GET, "/posts/12/hello-world"));
        assert!(!route.matches(&Method::GET, "/posts/123/hello"));
    }

    #[test]
    fn test_namespaces_join() {
        let route = apply(
            vec![Group::new().namespace("admin"), Group::new().namespace("users")],
            "/",
            "ProfileController@edit",
        );
        assert_eq!(route.action().describe(), "admin::users::ProfileController@edit");
    }

    #[test]
    fn test_unnamed_route_stays_unnamed() {
        let route = apply(vec![Group::new().name("admin")], "/", "Dashboard");
        assert_eq!(route.name(), None);
    }

    #[test]
    fn test_merge_is_associative() {
        let nested = apply(
            vec![
                Group::new().prefix("a").middleware("m1"),
                Group::new().prefix("b").middleware("m2"),
            ],
            "c",
            "X",
        );
        let flat = apply(
            vec![Group::new().prefix("a/b").middleware("m1").middleware("m2")],
            "c",
            "X",
        );
        assert_eq!(nested.uri(), flat.uri());
        assert_eq!(middleware_ids(&nested), middleware_ids(&flat));
    }

    proptest! {
        #[test]
        fn prop_prefix_slashes_are_normalised(
            segments in prop::collection::vec("[a-z]{1,6}", 1..4),
            leading in any::<bool>(),
            trailing in any::<bool>(),
        ) {
            let groups = segments
                .iter()
                .map(|segment| {
                    let mut prefix = segment.clone();
                    if leading {
                        prefix.insert(0, '/');
                    }
                    if trailing {
                        prefix.push('/');
                    }
                    Group::new().prefix(prefix)
                })
                .collect();

            let route = apply(groups, "/items", "Items");
            prop_assert_eq!(route.uri(), format!("/{}/items", segments.join("/")));
        }
    }
}
