//! Request types for Relay
//!
//! [`Request`] is the per-request context that travels through the kernel,
//! pipelines and route actions. Besides the HTTP parts it carries typed slots
//! for the matched route parameters, the authenticated [`Principal`] and one
//! bound entity.

use crate::error::DispatchError;
use crate::path_params::PathParams;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Extensions, HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// The authenticated caller, set by authentication middleware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub claims: Value,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            claims: Value::Null,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// HTTP request plus dispatch context
#[derive(Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    extensions: Extensions,
    route_params: PathParams,
    principal: Option<Principal>,
    bound: Option<Arc<dyn Any + Send + Sync>>,
}

impl Request {
    /// Create an empty-bodied request
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            extensions: Extensions::new(),
            route_params: PathParams::new(),
            principal: None,
            bound: None,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, DispatchError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| DispatchError::internal(format!("Failed to serialize body: {}", e)))?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw request path. Percent-encoded sequences are not decoded here;
    /// [`route_params`](Self::route_params) hold decoded values.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Deserialize the query string
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        serde_urlencoded::from_str(self.uri.query().unwrap_or(""))
            .map_err(|e| DispatchError::bad_request(format!("Invalid query string: {}", e)))
    }

    /// A single query parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query::<HashMap<String, String>>()
            .ok()
            .and_then(|mut map| map.remove(key))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// A named input: a top-level field of a JSON body, falling back to the
    /// query string
    pub fn input(&self, key: &str) -> Option<Value> {
        if self.is_json() {
            if let Ok(Value::Object(mut map)) = serde_json::from_slice::<Value>(&self.body) {
                if let Some(value) = map.remove(key) {
                    return Some(value);
                }
            }
        }
        self.query_param(key).map(Value::String)
    }

    pub fn is_json(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Whether the client asked for a JSON response
    pub fn wants_json(&self) -> bool {
        self.header(ACCEPT.as_str())
            .map(|accept| accept.contains("application/json") || accept.contains("+json"))
            .unwrap_or(false)
            || self.is_json()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Parameters captured by the matched route, percent-decoded
    pub fn route_params(&self) -> &PathParams {
        &self.route_params
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name)
    }

    pub(crate) fn set_route_params(&mut self, params: PathParams) {
        self.route_params = params;
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Attach an entity for the rest of the dispatch, replacing any previous one
    pub fn bind<T: Send + Sync + 'static>(&mut self, entity: T) {
        self.bound = Some(Arc::new(entity));
    }

    /// The bound entity, if one of type `T` is attached
    pub fn bound<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.bound.as_deref().and_then(|e| e.downcast_ref::<T>())
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            extensions: parts.extensions,
            route_params: PathParams::new(),
            principal: None,
            bound: None,
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("route_params", &self.route_params)
            .field("principal", &self.principal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Paging {
        page: u32,
        per_page: Option<u32>,
    }

    #[test]
    fn test_query_deserialization() {
        let req = Request::new(Method::GET, Uri::from_static("/posts?page=2&sort=desc"));
        let paging: Paging = req.query().unwrap();
        assert_eq!(paging.page, 2);
        assert_eq!(paging.per_page, None);
        assert_eq!(req.query_param("sort").as_deref(), Some("desc"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_invalid_query_is_bad_request() {
        let req = Request::new(Method::GET, Uri::from_static("/posts?page=abc"));
        let err = req.query::<Paging>().unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_input_prefers_json_body() {
        let req = Request::new(Method::POST, Uri::from_static("/posts?title=query"))
            .with_json(&json!({ "title": "body" }))
            .unwrap();
        assert_eq!(req.input("title"), Some(json!("body")));

        let req = Request::new(Method::POST, Uri::from_static("/posts?title=query"));
        assert_eq!(req.input("title"), Some(json!("query")));
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let req = Request::new(Method::POST, Uri::from_static("/"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{nope");
        let err = req.json::<Value>().unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_principal_and_bound_entity() {
        let mut req = Request::new(Method::GET, Uri::from_static("/me"));
        assert!(!req.is_authenticated());

        req.set_principal(Principal::new("u-1").with_role("admin"));
        assert!(req.principal().unwrap().has_role("admin"));

        req.bind(String::from("post #7"));
        assert_eq!(req.bound::<String>().map(String::as_str), Some("post #7"));
        assert!(req.bound::<u32>().is_none());
    }

    #[test]
    fn test_from_http_request() {
        let http_req = http::Request::builder()
            .method(Method::PUT)
            .uri("/items/1")
            .header("accept", "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        let req = Request::from(http_req);
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.path(), "/items/1");
        assert!(req.wants_json());
        assert_eq!(req.body().as_ref(), b"{}");
    }
}
