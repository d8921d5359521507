//! Route records and pattern compilation
//!
//! A URI template like `/users/{id}` or `/users/{id:[0-9]+}` compiles into an
//! anchored regular expression with one named group per parameter. The
//! expression is derived from the route's current state and rebuilt after
//! every change, so constraints added after registration still apply.

use super::action::{Action, RouteAction};
use super::RouteError;
use crate::middleware::MiddlewareRef;
use crate::path_params::PathParams;
use crate::request::Request;
use http::Method;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::panic::Location;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Pattern used for parameters without any constraint
pub const DEFAULT_PARAM_PATTERN: &str = "[^/]+";

/// Which methods a route answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// Every method
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(m) => m == method,
        }
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("ANY"),
            Self::Only(m) => f.write_str(m.as_str()),
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

/// One piece of a URI template
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Param {
        name: &'a str,
        constraint: Option<&'a str>,
    },
}

/// Split a URI template into literals and `{name}` / `{name:regex}` tokens.
///
/// Braces inside a constraint nest, so `{code:[a-z]{3}}` is one token.
pub(crate) fn tokenize(uri: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let invalid = |reason: &str| RouteError::InvalidPattern {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut token_start = None;
    let mut depth = 0usize;

    for (i, c) in uri.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    if literal_start < i {
                        segments.push(Segment::Literal(&uri[literal_start..i]));
                    }
                    token_start = Some(i + 1);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let start = token_start.take().ok_or_else(|| invalid("unbalanced braces"))?;
                    let token = &uri[start..i];
                    let (name, constraint) = match token.split_once(':') {
                        Some((name, constraint)) => (name, Some(constraint)),
                        None => (token, None),
                    };
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(invalid(&format!("invalid parameter name '{}'", name)));
                    }
                    if constraint == Some("") {
                        return Err(invalid(&format!("empty constraint for '{}'", name)));
                    }
                    segments.push(Segment::Param { name, constraint });
                    literal_start = i + 1;
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err(invalid("unclosed parameter"));
    }
    if literal_start < uri.len() {
        segments.push(Segment::Literal(&uri[literal_start..]));
    }
    Ok(segments)
}

/// Collapse repeated slashes and ensure exactly one leading slash and no
/// trailing slash. Empty input maps to `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = String::with_capacity(path.len() + 1);
    for segment in segments {
        result.push('/');
        result.push_str(segment);
    }
    result
}

fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// A registered route
#[derive(Clone)]
pub struct Route {
    method: MethodFilter,
    uri: String,
    action: Action,
    middleware: Vec<MiddlewareRef<Request>>,
    constraints: HashMap<String, String>,
    patterns: HashMap<String, String>,
    name: Option<String>,
    name_prefix: String,
    defaults: HashMap<String, String>,
    location: &'static Location<'static>,
    compiled: OnceLock<Result<Regex, RouteError>>,
}

impl Route {
    /// Create a route. The URI is normalized; the caller's location is kept
    /// for diagnostics.
    #[track_caller]
    pub fn new(method: impl Into<MethodFilter>, uri: &str, action: impl Into<RouteAction>) -> Self {
        let RouteAction { action, middleware } = action.into();
        let mut route = Self {
            method: method.into(),
            uri: normalize_path(uri),
            action,
            middleware: Vec::new(),
            constraints: HashMap::new(),
            patterns: HashMap::new(),
            name: None,
            name_prefix: String::new(),
            defaults: HashMap::new(),
            location: Location::caller(),
            compiled: OnceLock::new(),
        };
        for entry in middleware {
            route.push_middleware(entry);
        }
        route
    }

    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn middleware(&self) -> &[MiddlewareRef<Request>] {
        &self.middleware
    }

    /// Constraints registered with `where`
    pub fn constraints(&self) -> &HashMap<String, String> {
        &self.constraints
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    /// Where the route was registered
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Append a middleware. Adding the same middleware again is a no-op.
    pub fn push_middleware(&mut self, middleware: impl Into<MiddlewareRef<Request>>) -> &mut Self {
        let middleware = middleware.into();
        let present = self.middleware.iter().any(|existing| match (existing, &middleware) {
            (MiddlewareRef::Named(a), MiddlewareRef::Named(b)) => a == b,
            (MiddlewareRef::Layer(a), MiddlewareRef::Layer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        });
        if !present {
            self.middleware.push(middleware);
        }
        self
    }

    /// Constrain a parameter (`where`)
    pub fn set_constraint(&mut self, name: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.constraints.insert(name.into(), pattern.into());
        self.invalidate();
        self
    }

    /// Set the route name. Names given by enclosing groups are prepended.
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(format!("{}{}", self.name_prefix, name));
        self
    }

    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub(crate) fn set_pattern(&mut self, name: &str, pattern: &str) {
        self.patterns.insert(name.to_string(), pattern.to_string());
        self.invalidate();
    }

    pub(crate) fn set_uri(&mut self, uri: &str) {
        self.uri = normalize_path(uri);
        self.invalidate();
    }

    pub(crate) fn set_name_prefix(&mut self, prefix: String) {
        self.name_prefix = prefix;
    }

    pub(crate) fn replace_middleware(&mut self, middleware: Vec<MiddlewareRef<Request>>) {
        self.middleware.clear();
        for entry in middleware {
            self.push_middleware(entry);
        }
    }

    pub(crate) fn constraint_entry(&mut self, name: &str, pattern: &str) {
        if !self.constraints.contains_key(name) {
            self.constraints.insert(name.to_string(), pattern.to_string());
            self.invalidate();
        }
    }

    pub(crate) fn action_mut(&mut self) -> &mut Action {
        &mut self.action
    }

    fn invalidate(&mut self) {
        self.compiled = OnceLock::new();
    }

    /// Build the anchored expression.
    ///
    /// Constraint precedence per parameter: inline `{name:regex}`, then
    /// `where`, then router-wide patterns, then [`DEFAULT_PARAM_PATTERN`].
    pub fn compile(&self) -> Result<Regex, RouteError> {
        let mut pattern = String::from("^");
        for segment in tokenize(&self.uri)? {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Param { name, constraint } => {
                    let constraint = constraint
                        .or_else(|| self.constraints.get(name).map(String::as_str))
                        .or_else(|| self.patterns.get(name).map(String::as_str))
                        .unwrap_or(DEFAULT_PARAM_PATTERN);
                    let _ = write!(pattern, "(?P<{}>{})", name, constraint);
                }
            }
        }
        pattern.push('$');

        Regex::new(&pattern).map_err(|e| RouteError::InvalidPattern {
            uri: self.uri.clone(),
            reason: e.to_string(),
        })
    }

    /// The compiled expression, built on first use
    pub fn regex(&self) -> Result<&Regex, RouteError> {
        self.compiled
            .get_or_init(|| self.compile())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether the method is allowed and the whole path matches
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        if !self.method.allows(method) {
            return false;
        }
        match self.regex() {
            Ok(regex) => regex.is_match(path),
            Err(e) => {
                warn!(uri = %self.uri, error = %e, "Skipping route with invalid pattern");
                false
            }
        }
    }

    /// Captured parameters merged over the route defaults.
    ///
    /// Captured values are percent-decoded; a value that does not decode to
    /// UTF-8 is kept as captured.
    pub fn parse_parameters(&self, path: &str) -> PathParams {
        let mut params: PathParams = self
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Ok(regex) = self.regex() {
            if let Some(captures) = regex.captures(path) {
                for name in regex.capture_names().flatten() {
                    if let Some(value) = captures.name(name) {
                        params.insert(name, decode_segment(value.as_str()));
                    }
                }
            }
        }
        params
    }

    /// Substitute every template token, falling back to defaults
    pub fn url(&self, params: &PathParams) -> Result<String, RouteError> {
        let mut uri = String::with_capacity(self.uri.len());
        for segment in tokenize(&self.uri)? {
            match segment {
                Segment::Literal(text) => uri.push_str(text),
                Segment::Param { name, .. } => {
                    let value = params
                        .get(name)
                        .or_else(|| self.defaults.get(name).map(String::as_str))
                        .ok_or_else(|| RouteError::MissingParameter {
                            route: self.name.clone().unwrap_or_else(|| self.uri.clone()),
                            parameter: name.to_string(),
                        })?;
                    uri.push_str(value);
                }
            }
        }
        Ok(normalize_path(&uri))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("action", &self.action.describe())
            .field("name", &self.name)
            .field("middleware", &self.middleware)
            .field("constraints", &self.constraints)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::action::Action;
    use proptest::prelude::*;

    fn route(method: Method, uri: &str) -> Route {
        Route::new(method, uri, Action::parse("WidgetController@show"))
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("api"), "/api");
        assert_eq!(normalize_path("//api//v1/"), "/api/v1");
    }

    #[test]
    fn test_tokenize_nested_braces() {
        let segments = tokenize("/codes/{code:[a-z]{3}}/raw").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("/codes/"),
                Segment::Param {
                    name: "code",
                    constraint: Some("[a-z]{3}"),
                },
                Segment::Literal("/raw"),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_bad_tokens() {
        assert!(tokenize("/users/{id").is_err());
        assert!(tokenize("/users/{}").is_err());
        assert!(tokenize("/users/{user-id}").is_err());
        assert!(tokenize("/users/{id:}").is_err());
    }

    #[test]
    fn test_partial_paths_never_match() {
        let r = route(Method::GET, "/users/{id}");
        assert!(r.matches(&Method::GET, "/users/1"));
        assert!(!r.matches(&Method::GET, "/users/1/edit"));
        assert!(!r.matches(&Method::GET, "/users"));
        assert!(!r.matches(&Method::GET, "/prefix/users/1"));
        assert!(!r.matches(&Method::POST, "/users/1"));
    }

    #[test]
    fn test_any_matches_every_method() {
        let r = Route::new(MethodFilter::Any, "/ping", Action::parse("Ping"));
        assert!(r.matches(&Method::GET, "/ping"));
        assert!(r.matches(&Method::DELETE, "/ping"));
        assert_eq!(r.method().to_string(), "ANY");
    }

    #[test]
    fn test_inline_constraint() {
        let r = route(Method::GET, "/widgets/{id:[0-9]+}");
        assert!(r.matches(&Method::GET, "/widgets/7"));
        assert!(!r.matches(&Method::GET, "/widgets/abc"));
        assert_eq!(r.parse_parameters("/widgets/7").get("id"), Some("7"));
    }

    #[test]
    fn test_where_applies_after_construction() {
        let mut r = route(Method::GET, "/users/{id}");
        assert!(r.matches(&Method::GET, "/users/abc"));

        r.set_constraint("id", "[0-9]+");
        assert!(!r.matches(&Method::GET, "/users/abc"));
        assert!(r.matches(&Method::GET, "/users/42"));
    }

    #[test]
    fn test_constraint_precedence() {
        let mut r = route(Method::GET, "/items/{id:[a-c]+}/{slug}");
        r.set_constraint("id", "[0-9]+");
        r.set_pattern("slug", "[a-z-]+");
        r.set_pattern("id", "x+");

        assert!(r.matches(&Method::GET, "/items/abc/hello-world"));
        assert!(!r.matches(&Method::GET, "/items/123/hello-world"));
        assert!(!r.matches(&Method::GET, "/items/abc/Hello"));

        r.set_constraint("slug", "[A-Z][a-z]+");
        assert!(r.matches(&Method::GET, "/items/abc/Hello"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let r = route(Method::GET, "/files/{name}.json");
        assert!(r.matches(&Method::GET, "/files/report.json"));
        assert!(!r.matches(&Method::GET, "/files/reportxjson"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let r = route(Method::GET, "/broken/{id:[0-9}");
        assert!(r.regex().is_err());
        assert!(!r.matches(&Method::GET, "/broken/1"));
    }

    #[test]
    fn test_defaults_are_overridden_by_captures() {
        let mut r = route(Method::GET, "/posts/{page}");
        r.set_default("page", "1").set_default("format", "html");

        let params = r.parse_parameters("/posts/3");
        assert_eq!(params.get("page"), Some("3"));
        assert_eq!(params.get("format"), Some("html"));
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let r = route(Method::GET, "/files/{name}");

        assert_eq!(r.parse_parameters("/files/john%20doe").get("name"), Some("john doe"));
        assert_eq!(r.parse_parameters("/files/caf%C3%A9").get("name"), Some("café"));

        // An encoded slash stays inside one segment
        assert!(r.matches(&Method::GET, "/files/a%2Fb"));
        assert_eq!(r.parse_parameters("/files/a%2Fb").get("name"), Some("a/b"));

        assert_eq!(r.parse_parameters("/files/%FF").get("name"), Some("%FF"));
    }

    #[test]
    fn test_url_generation() {
        let mut r = route(Method::GET, "/users/{id:[0-9]+}/posts/{post}");
        r.set_name("users.posts");
        let params: PathParams = [("id", "42"), ("post", "7")].into_iter().collect();
        assert_eq!(r.url(&params).unwrap(), "/users/42/posts/7");

        let params: PathParams = [("id", "42")].into_iter().collect();
        let err = r.url(&params).unwrap_err();
        assert!(matches!(err, RouteError::MissingParameter { ref parameter, .. } if parameter == "post"));
    }

    #[test]
    fn test_name_prefix_is_applied() {
        let mut r = route(Method::GET, "/");
        r.set_name_prefix("admin.".to_string());
        r.set_name("dashboard");
        r.set_name("home");
        assert_eq!(r.name(), Some("admin.home"));
    }

    #[test]
    fn test_middleware_is_deduplicated() {
        let mut r = route(Method::GET, "/");
        r.push_middleware("auth").push_middleware("auth").push_middleware("log");
        assert_eq!(r.middleware().len(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_normalized_paths_are_canonical(segments in prop::collection::vec("[a-z0-9]{1,8}", 0..5), slashes in 1usize..4) {
            let sep = "/".repeat(slashes);
            let raw = format!("{}{}{}", sep, segments.join(sep.as_str()), sep);
            let normalized = normalize_path(&raw);

            prop_assert!(normalized.starts_with('/'));
            prop_assert!(!normalized.contains("//"));
            prop_assert!(normalized == "/" || !normalized.ends_with('/'));
            prop_assert_eq!(normalize_path(&normalized), normalized.clone());
        }

        #[test]
        fn prop_param_matches_exactly_one_segment(value in "[a-zA-Z0-9_-]{1,16}", extra in "[a-z]{1,8}") {
            let r = route(Method::GET, "/users/{id}");
            let path = format!("/users/{}", value);
            prop_assert!(r.matches(&Method::GET, &path));
            let params = r.parse_parameters(&path);
            prop_assert_eq!(params.get("id"), Some(value.as_str()));

            let longer = format!("/users/{}/{}", value, extra);
            prop_assert!(!r.matches(&Method::GET, &longer));
        }
    }
}
