//! Incoming HTTP request type.
//!
//! An owned, fully-read view of one request: method, path, headers, body.
//! Path parameters are *not* here — route matching binds them into the
//! request [`Context`](crate::Context), where `ctx.param("name")` finds
//! them. The request itself never changes during dispatch; everything a
//! middleware wants to pass downstream travels through the context.

use bytes::Bytes;
use http::{HeaderMap, Method};

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// A request with no headers and an empty body. Add either with
    /// [`with_header`](Request::with_header) / [`with_body`](Request::with_body).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn from_parts(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self { method, path, headers, body }
    }

    /// Adds a header. Invalid names or values are dropped silently — this
    /// constructor exists for tests and in-process dispatch, not parsing.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::try_from(name),
            http::header::HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
