//! Request ID middleware
//!
//! Tags every request with a [`RequestId`] stored in its extensions and
//! echoes it in the `x-request-id` response header. An id sent by the client
//! is reused.

use super::pipeline::{ChainFuture, Middleware, Next, Reply};
use crate::request::Request;
use http::header::{HeaderName, HeaderValue};
use std::fmt;
use uuid::Uuid;

/// Header carrying the request id
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier of one request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// A new random (v4) id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Middleware assigning a [`RequestId`] to every request
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Always generate a fresh id
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a non-empty `x-request-id` sent by the client
    pub fn trust_incoming(mut self) -> Self {
        self.trust_incoming = true;
        self
    }
}

impl Middleware<Request> for RequestIdMiddleware {
    fn handle(&self, mut req: Request, next: Next<Request>) -> ChainFuture<Request> {
        let incoming = req
            .header(REQUEST_ID_HEADER.as_str())
            .filter(|id| self.trust_incoming && !id.is_empty())
            .map(str::to_string);
        let id = incoming.map(RequestId::from).unwrap_or_else(RequestId::generate);
        req.extensions_mut().insert(id.clone());

        Box::pin(async move {
            let reply = next.run(req).await?;
            Ok(match reply {
                Reply::Respond(mut response) => {
                    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                    Reply::Respond(response)
                }
                pass => pass,
            })
        })
    }
}
