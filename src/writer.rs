//! Buffered response sink and the status-tracking writer proxy.
//!
//! Handlers and middleware never touch the transport. They write into a
//! [`ResponseWriter`] — status, headers, body bytes — through the
//! [`ResponseSink`] surface, and the transport converts the finished buffer
//! into a hyper response after dispatch completes.
//!
//! The writer is a small explicit state machine: `unsent → sent(code)`.
//! The first [`write_header`](ResponseSink::write_header) commits the
//! status; every later attempt is a silent no-op. A body write before any
//! header write commits `200 OK` first, matching what an HTTP connection
//! would do implicitly.
//!
//! [`WriterProxy`] decorates a writer when a log hook is configured. It
//! forwards the write surface unchanged but additionally records the
//! committed status, every *attempted* status write, and the number of body
//! bytes written, so the log hook can report what actually went out.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// The write surface handed to handlers, middleware, and hooks.
pub trait ResponseSink {
    /// Commits the response status. Only the first call has any effect.
    fn write_header(&mut self, code: StatusCode);

    /// Sets a response header. Headers are frozen once the status is
    /// committed; later inserts are dropped. Invalid names or values are
    /// dropped with a warning rather than failing the request.
    fn insert_header(&mut self, name: &str, value: &str);

    /// Appends body bytes. Commits `200 OK` first if no status was written.
    fn write(&mut self, chunk: &[u8]);
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The buffering response sink owned by a single request task.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `None` while unsent.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffer into a transport response. A writer nothing was
    /// written to becomes an empty `200 OK`.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

impl ResponseSink for ResponseWriter {
    fn write_header(&mut self, code: StatusCode) {
        if self.status.is_none() {
            self.status = Some(code);
        }
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        if self.status.is_some() {
            return;
        }
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
    }

    fn write(&mut self, chunk: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(chunk);
    }
}

// ── WriterProxy ───────────────────────────────────────────────────────────────

/// A decorator over [`ResponseWriter`] that tracks what was written.
///
/// Created by the dispatcher only when a log hook is configured, so
/// requests without logging pay nothing for it. The proxy forwards only
/// the first header write to the inner sink but records every attempt,
/// which is how the dispatcher's safety-net `write_header(500)` stays a
/// no-op after a handler already committed a status.
#[derive(Debug)]
pub struct WriterProxy {
    inner: ResponseWriter,
    attempted: Vec<StatusCode>,
    bytes_written: usize,
}

impl WriterProxy {
    pub(crate) fn new(inner: ResponseWriter) -> Self {
        Self { inner, attempted: Vec::new(), bytes_written: 0 }
    }

    /// The status actually committed to the underlying sink, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.inner.status()
    }

    /// Every status code that was *attempted*, in order, including the
    /// ones the commit guard swallowed.
    pub fn attempted(&self) -> &[StatusCode] {
        &self.attempted
    }

    /// Number of body bytes written through this proxy.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub(crate) fn into_inner(self) -> ResponseWriter {
        self.inner
    }
}

impl ResponseSink for WriterProxy {
    fn write_header(&mut self, code: StatusCode) {
        self.attempted.push(code);
        if self.inner.status().is_none() {
            self.inner.write_header(code);
        }
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        self.inner.insert_header(name, value);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.bytes_written += chunk.len();
        self.inner.write(chunk);
    }
}
