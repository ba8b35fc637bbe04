//! Ready-made log and panic hooks built on `tracing`.
//!
//! Both match the crate's hook shapes ([`LogFn`](crate::LogFn) and
//! [`HandleFn`](crate::HandleFn)), so wiring is one line each:
//!
//! ```rust
//! use torii::{Mux, hooks};
//!
//! let mut mux = Mux::new();
//! mux.log_hook(hooks::access_log);
//! mux.panic_hook(hooks::recover_500);
//! ```

use http::StatusCode;
use tracing::{error, info};

use crate::context::Context;
use crate::request::Request;
use crate::writer::{ResponseSink, WriterProxy};

/// Emits one structured access-log event per request.
///
/// Runs after the handler (or the middleware that halted the chain), so
/// the proxy already knows the committed status and body size. A request
/// that committed nothing logs status `0` — the dispatcher's safety-net
/// 500 is written only after this hook returns.
pub fn access_log(_ctx: &Context, proxy: &WriterProxy, req: &Request) {
    let status = proxy.status().map_or(0, |s| s.as_u16());
    info!(
        method = %req.method(),
        path = req.path(),
        status,
        bytes = proxy.bytes_written(),
        "request"
    );
}

/// Minimal panic hook: records the panic and answers a plain 500.
///
/// If the panicking handler already committed a status, the 500 here is
/// swallowed by the sink's commit guard and only the log line remains.
pub fn recover_500(ctx: &Context, w: &mut dyn ResponseSink, req: &Request) {
    let message = ctx.exception().map_or("unknown panic", |e| e.message());
    error!(
        method = %req.method(),
        path = req.path(),
        "handler panicked: {message}"
    );
    w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
    w.write(b"internal server error");
}
