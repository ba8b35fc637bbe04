//! # torii
//!
//! A context-driven HTTP request dispatcher. torii sits between a radix-tree
//! router ([`matchit`]) and the HTTP transport, and owns exactly one
//! problem: running a request through middleware, a handler, panic
//! recovery, and logging, with guarantees that hold on every code path.
//!
//! ## The contract
//!
//! - **Derived contexts, never mutated.** Every request gets an immutable
//!   [`Context`] derived from the mux's root; path parameters, middleware
//!   data, and panic records travel as typed layers. Siblings can't see
//!   each other's layers, so no request can corrupt another's state.
//! - **Deterministic middleware with explicit short-circuit.** Prefix-
//!   scoped, shortest-prefix-first, registration order within a prefix. A
//!   middleware halts the chain by returning `None`; the handler is
//!   skipped, the log hook is not.
//! - **Exactly-once logging.** The log hook runs once per request —
//!   success, halt, or panic — enforced by an explicit flag, not luck.
//! - **Contained panics.** With a panic hook installed, a panicking
//!   handler degrades to whatever the hook writes (or a safety-net 500);
//!   without one, the panic surfaces at the transport. The server never
//!   comes down either way.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use torii::{Context, Mux, Request, ResponseSink, Server, hooks};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mux = Mux::new();
//!     mux.log_hook(hooks::access_log);
//!     mux.panic_hook(hooks::recover_500);
//!     mux.middleware("/", |ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
//!         Some(ctx.clone()) // derive here to pass data downstream
//!     });
//!     mux.get("/items/{id}", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
//!         let id = ctx.param("id").unwrap_or("unknown");
//!         w.insert_header("content-type", "application/json");
//!         w.write(format!(r#"{{"id":"{id}"}}"#).as_bytes());
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(mux).await.unwrap();
//! }
//! ```
//!
//! Handlers are synchronous: they receive the context, a response sink,
//! and the request, and write the response as a side effect. The transport
//! runs each dispatch on its own blocking task, so handlers may block
//! without stalling the accept loop.
//!
//! What torii leaves to its collaborators: path-match syntax is
//! [`matchit`]'s contract; TLS, connection limits, and HTTP parsing are the
//! transport's (and your reverse proxy's).

mod context;
mod dispatch;
mod error;
mod handler;
mod mux;
mod request;
mod server;
mod writer;

pub mod health;
pub mod hooks;
pub mod middleware;

pub use context::{Context, Exception, PathParams};
pub use error::Error;
pub use handler::{HandleFn, LogFn, Middleware};
pub use mux::{Mux, default_not_found};
pub use request::Request;
pub use server::Server;
pub use writer::{ResponseSink, ResponseWriter, WriterProxy};
