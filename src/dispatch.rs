//! Per-request dispatch: context derivation, middleware, handler, panic
//! recovery, and the exactly-once logging guarantee.
//!
//! One request moves through a fixed sequence:
//!
//! ```text
//! derive context ─ wrap proxy? ─ middleware chain ─┬─ handler ─┐
//!                                                  └─ (halt) ──┼─ log hook
//!                        any panic, caught once ───────────────┘
//! ```
//!
//! Two invariants rule this module:
//!
//! 1. **The log hook runs exactly once per request** — on success, on a
//!    middleware halt, and on a caught panic. This is carried by an
//!    explicit `ran_log` flag, not by control-flow shape: the recovery
//!    path consults the flag before logging, and the normal path raises
//!    the flag *before* invoking the hook so a panicking log hook is never
//!    invoked a second time by the recovery path.
//! 2. **The safety-net `write_header(500)`** after the log hook only lands
//!    if nothing was committed; the proxy's commit guard makes it a no-op
//!    otherwise.

use std::panic::{AssertUnwindSafe, catch_unwind};

use http::StatusCode;

use crate::context::{Context, Exception, PathParams};
use crate::handler::HandleFn;
use crate::mux::Mux;
use crate::request::Request;
use crate::writer::{ResponseSink, ResponseWriter, WriterProxy};

/// The response sink for one request: raw, or proxied when a log hook
/// needs post-hoc introspection. The proxy is only allocated when it will
/// actually be read.
enum Sink {
    Raw(ResponseWriter),
    Proxied(WriterProxy),
}

impl Sink {
    fn as_dyn(&mut self) -> &mut dyn ResponseSink {
        match self {
            Sink::Raw(w) => w,
            Sink::Proxied(p) => p,
        }
    }

    fn into_writer(self) -> ResponseWriter {
        match self {
            Sink::Raw(w) => w,
            Sink::Proxied(p) => p.into_inner(),
        }
    }
}

impl Mux {
    /// Runs one matched handler through the full pipeline. Every route —
    /// including the not-found fallback — enters here, so middleware,
    /// panic recovery, and logging treat all of them uniformly.
    pub(crate) fn dispatch(
        &self,
        handler: &HandleFn,
        params: Vec<(String, String)>,
        req: &Request,
    ) -> ResponseWriter {
        let mut ctx = self.root.clone();
        if !params.is_empty() {
            ctx = ctx.with(PathParams::new(params));
        }

        let mut sink = if self.log_hook.is_some() {
            Sink::Proxied(WriterProxy::new(ResponseWriter::new()))
        } else {
            Sink::Raw(ResponseWriter::new())
        };
        let mut ran_log = false;

        match &self.panic_hook {
            Some(panic_hook) => {
                // AssertUnwindSafe: the closure captures an immutable context
                // chain, an append-only buffer, and a bool — no state a
                // half-finished run could leave torn.
                let caught = catch_unwind(AssertUnwindSafe(|| {
                    self.run_to_log(handler, &mut ctx, &mut sink, req, &mut ran_log);
                }));

                if let Err(payload) = caught {
                    let ctx = ctx.with(Exception::from_payload(payload));
                    (**panic_hook)(&ctx, sink.as_dyn(), req);

                    if !ran_log {
                        if let (Some(log_hook), Sink::Proxied(proxy)) =
                            (&self.log_hook, &mut sink)
                        {
                            (**log_hook)(&ctx, proxy, req);
                            // lands only if no status was committed
                            proxy.write_header(StatusCode::INTERNAL_SERVER_ERROR);
                        }
                    }
                }
            }
            // No panic hook installed: an unwind propagates to the
            // transport layer's own recovery.
            None => self.run_to_log(handler, &mut ctx, &mut sink, req, &mut ran_log),
        }

        sink.into_writer()
    }

    /// Steps 4–6 of the pipeline: chain, handler, log hook. Runs inside
    /// the fault boundary when one is installed.
    fn run_to_log(
        &self,
        handler: &HandleFn,
        ctx: &mut Context,
        sink: &mut Sink,
        req: &Request,
        ran_log: &mut bool,
    ) {
        let (next, proceed) = self.middleware.run(ctx.clone(), sink.as_dyn(), req);
        *ctx = next;

        if proceed {
            (**handler)(ctx, sink.as_dyn(), req);
        }

        if let (Some(log_hook), Sink::Proxied(proxy)) = (&self.log_hook, &mut *sink) {
            // Flag raised before the call: if the hook itself panics the
            // recovery path must not invoke it again.
            *ran_log = true;
            (**log_hook)(ctx, proxy, req);
            // Safety net for a handler that returned without writing.
            proxy.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
