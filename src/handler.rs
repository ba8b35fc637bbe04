//! Handler, middleware, and hook shapes.
//!
//! # How handlers are stored
//!
//! The mux holds handlers of *different* concrete types in a single routing
//! tree, so every registered function is erased behind a shared trait
//! object: `Arc<dyn Fn(…)>`. The `Arc` gives cheap thread-safe sharing —
//! one atomic increment when a route matches — and the only per-request
//! cost after that is one virtual call.
//!
//! All three shapes receive the request context, a response sink, and the
//! request, and produce the response purely as side effects on the sink:
//!
//! - [`HandleFn`] — a route handler, the not-found fallback, or a panic
//!   hook. A panic hook additionally finds the caught panic via
//!   [`Context::exception`](crate::Context::exception).
//! - [`Middleware`] — handler-shaped, but returns the chain decision:
//!   `Some(ctx)` continues with that (possibly re-derived) context, `None`
//!   halts the chain and skips the route handler. A middleware that halts
//!   is expected to have written whatever response it wants; the log hook
//!   still runs either way.
//! - [`LogFn`] — runs exactly once at the end of every request, with a
//!   [`WriterProxy`] exposing the committed status, attempted status
//!   writes, and body byte count.

use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::writer::{ResponseSink, WriterProxy};

/// A shared, type-erased request handler.
///
/// Any `fn(&Context, &mut dyn ResponseSink, &Request)` or closure with that
/// signature registers directly:
///
/// ```rust
/// use torii::{Context, Mux, Request, ResponseSink};
///
/// fn echo_id(ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
///     let id = ctx.param("id").unwrap_or("unknown");
///     w.write(id.as_bytes());
/// }
///
/// let mut mux = Mux::new();
/// mux.get("/items/{id}", echo_id);
/// ```
pub type HandleFn = Arc<dyn Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync>;

/// A shared, type-erased middleware function.
///
/// Return `Some(ctx)` to continue the chain (derive a child context to pass
/// data down, or hand back a clone of the one you received), `None` to halt
/// the request before the handler runs.
pub type Middleware =
    Arc<dyn Fn(&Context, &mut dyn ResponseSink, &Request) -> Option<Context> + Send + Sync>;

/// A shared, type-erased log hook.
pub type LogFn = Arc<dyn Fn(&Context, &WriterProxy, &Request) + Send + Sync>;
