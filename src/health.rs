//! Built-in Kubernetes health-check handlers.
//!
//! Kubernetes asks two questions. torii answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your mux:
//!
//! ```rust
//! use torii::{Mux, health};
//!
//! let mut mux = Mux::new();
//! mux.get("/healthz", health::liveness);
//! mux.get("/readyz", health::readiness);
//! ```
//!
//! Override `readiness` with your own handler if you need to gate on
//! dependency availability (database connections, downstream services):
//!
//! ```rust
//! use torii::{Context, Request, ResponseSink};
//! use http::StatusCode;
//!
//! fn readiness(_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
//!     if dependencies_are_healthy() {
//!         w.write(b"ready");
//!     } else {
//!         w.write_header(StatusCode::SERVICE_UNAVAILABLE);
//!     }
//! }
//!
//! fn dependencies_are_healthy() -> bool { true }
//! ```

use crate::context::Context;
use crate::request::Request;
use crate::writer::ResponseSink;

/// Kubernetes liveness probe handler.
///
/// Always answers `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no
/// dependencies.
pub fn liveness(_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
    w.insert_header("content-type", "text/plain; charset=utf-8");
    w.write(b"ok");
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Answers `200 OK` with body `"ready"`. Replace it with your own handler
/// if your application needs a warm-up period or must verify dependency
/// health before accepting traffic.
pub fn readiness(_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
    w.insert_header("content-type", "text/plain; charset=utf-8");
    w.write(b"ready");
}
