//! In-process test client
//!
//! Drives a [`Kernel`] directly, without a transport:
//!
//! ```rust,ignore
//! let kernel = App::new().routes(|r| { r.get("/", hello); }).build()?;
//! let client = TestClient::new(kernel);
//!
//! client.get("/").await.assert_status(200).assert_body_contains("hello");
//! ```

use crate::kernel::Kernel;
use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Sends requests through a kernel
#[derive(Clone)]
pub struct TestClient {
    kernel: Arc<Kernel>,
}

impl TestClient {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel: Arc::new(kernel),
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// POST with a JSON body
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let uri: Uri = req.path.parse().unwrap_or_else(|_| Uri::from_static("/"));
        let mut request = Request::new(req.method, uri);
        *request.headers_mut() = req.headers;
        if let Some(body) = req.body {
            request = request.with_body(body);
        }

        TestResponse::from_response(self.kernel.handle(request).await).await
    }
}

/// Request builder for [`TestClient::request`]
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header. Invalid names or values are skipped.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (key.parse::<header::HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// JSON body with a matching content type
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Collected response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// # Panics
    ///
    /// Panics if the status differs.
    pub fn assert_status<S: TryInto<StatusCode>>(&self, expected: S) -> &Self {
        let Ok(expected) = expected.try_into() else {
            panic!("Invalid expected status");
        };
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self.header(key).unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the body does not contain `expected`.
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text();
        assert!(
            body.contains(expected),
            "Expected body to contain '{}', got '{}'",
            expected,
            body
        );
        self
    }
}
