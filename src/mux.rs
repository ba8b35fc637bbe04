//! The application-state object: route trees, middleware table, hooks,
//! and the root context.
//!
//! A [`Mux`] owns everything that outlives a single request. Registration
//! happens through `&mut Mux` at startup; serving happens through `&Mux`.
//! That split is the whole concurrency story — once the mux is handed to
//! the transport (which wraps it in an `Arc`), the mutable registration
//! surface is unreachable and every in-flight request reads the same frozen
//! tables. [`Mux::reset`] is the one destructive operation; it also takes
//! `&mut self`, so it cannot race live traffic.
//!
//! Routing itself is delegated to [`matchit`] — one radix tree per HTTP
//! method, `{name}` segment parameters, `{*rest}` catch-alls. The mux's job
//! is only to make sure every matched handler, and the not-found fallback,
//! goes through the identical dispatch pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::context::Context;
use crate::handler::{HandleFn, LogFn, Middleware};
use crate::middleware::Registry;
use crate::request::Request;
use crate::writer::{ResponseSink, ResponseWriter, WriterProxy};

/// The dispatcher's application state: routes, middleware, hooks, root
/// context.
pub struct Mux {
    pub(crate) routes: HashMap<Method, MatchitRouter<HandleFn>>,
    pub(crate) not_found: HandleFn,
    pub(crate) middleware: Registry,
    pub(crate) root: Context,
    pub(crate) panic_hook: Option<HandleFn>,
    pub(crate) log_hook: Option<LogFn>,
}

impl Mux {
    /// An empty mux: no routes, no middleware, no hooks, an empty root
    /// context, and the built-in plain-404 fallback installed.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: Arc::new(default_not_found),
            middleware: Registry::new(),
            root: Context::new(),
            panic_hook: None,
            log_hook: None,
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers `handler` for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax and reach the handler through
    /// the context: `ctx.param("name")`. Catch-alls use `{*rest}`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern or conflicts with an
    /// existing registration.
    pub fn handle<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    /// Registers a `GET` handler under `path`.
    pub fn get<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler);
    }

    /// Registers a `POST` handler under `path`.
    pub fn post<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler);
    }

    /// Registers a `PUT` handler under `path`.
    pub fn put<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler);
    }

    /// Registers a `PATCH` handler under `path`.
    pub fn patch<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, path, handler);
    }

    /// Registers a `HEAD` handler under `path`.
    pub fn head<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::HEAD, path, handler);
    }

    /// Registers a `DELETE` handler under `path`.
    pub fn delete<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler);
    }

    /// Overrides the fallback handler for unmatched requests.
    ///
    /// The fallback runs through the full pipeline — middleware, panic
    /// recovery, logging — exactly like a registered route. Pass
    /// [`default_not_found`] to restore the built-in plain 404.
    pub fn not_found<F>(&mut self, handler: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.not_found = Arc::new(handler);
    }

    /// Registers `mw` to run for every request whose path lives under
    /// `prefix`.
    ///
    /// Order is deterministic: shortest matching prefix first, then
    /// registration order within a prefix. See the
    /// [`middleware`](crate::middleware) module docs for the matching rule.
    pub fn middleware<F>(&mut self, prefix: &str, mw: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) -> Option<Context>
            + Send
            + Sync
            + 'static,
    {
        let mw: Middleware = Arc::new(mw);
        self.middleware.register(prefix, mw);
    }

    // ── Hooks and root context ────────────────────────────────────────────────

    /// Installs the panic hook. With one installed, a panic anywhere in
    /// the chain or handler is caught; the hook observes the payload via
    /// `ctx.exception()` and may write a response.
    pub fn panic_hook<F>(&mut self, hook: F)
    where
        F: Fn(&Context, &mut dyn ResponseSink, &Request) + Send + Sync + 'static,
    {
        self.panic_hook = Some(Arc::new(hook));
    }

    /// Installs the log hook, invoked exactly once at the end of every
    /// request with a [`WriterProxy`] for status introspection.
    pub fn log_hook<F>(&mut self, hook: F)
    where
        F: Fn(&Context, &WriterProxy, &Request) + Send + Sync + 'static,
    {
        self.log_hook = Some(Arc::new(hook));
    }

    /// Replaces the root context every request context derives from. Use
    /// this to expose process-wide values (config, pools) to handlers.
    pub fn set_context(&mut self, ctx: Context) {
        self.root = ctx;
    }

    /// The current root context.
    pub fn context(&self) -> &Context {
        &self.root
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Destroys all registered state: routes, middleware, hooks, and the
    /// root context are replaced with defaults and the built-in 404
    /// fallback is re-installed.
    ///
    /// Meant for test isolation. Taking `&mut self` keeps it off the
    /// serving path by construction.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // ── Serving ───────────────────────────────────────────────────────────────

    /// Dispatches one request and returns the finished response buffer.
    ///
    /// This is the router-collaborator boundary: match method + path,
    /// extract ordered path parameters, and run the dispatch pipeline —
    /// or run the not-found fallback through the very same pipeline.
    pub fn serve(&self, req: &Request) -> ResponseWriter {
        let matched = self
            .routes
            .get(req.method())
            .and_then(|tree| tree.at(req.path()).ok());

        match matched {
            Some(m) => {
                let params: Vec<(String, String)> = m
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                let handler = Arc::clone(m.value);
                self.dispatch(&handler, params, req)
            }
            None => {
                let handler = Arc::clone(&self.not_found);
                self.dispatch(&handler, Vec::new(), req)
            }
        }
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in fallback: plain-text `404 page not found`.
pub fn default_not_found(_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
    w.insert_header("content-type", "text/plain; charset=utf-8");
    w.write_header(StatusCode::NOT_FOUND);
    w.write(b"404 page not found");
}
