//! Minimal torii example — parameterised routes, prefix middleware with an
//! auth short-circuit, and the built-in log/panic hooks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/items/42
//!   curl http://localhost:3000/admin/stats                      # 403
//!   curl -H 'x-admin-token: letmein' http://localhost:3000/admin/stats
//!   curl http://localhost:3000/boom                             # recovered 500
//!   curl http://localhost:3000/ghost                            # plain 404
//!   curl http://localhost:3000/healthz

use http::StatusCode;
use torii::{Context, Mux, Request, ResponseSink, Server, health, hooks};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut mux = Mux::new();

    // One access-log line per request — success, short-circuit, or panic.
    mux.log_hook(hooks::access_log);
    mux.panic_hook(hooks::recover_500);

    // Stamp every request with an id, derived into the context.
    mux.middleware("/", |ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        let id = RequestId(fastrand());
        Some(ctx.with(id))
    });

    // Gate the /admin subtree. Returning None halts the chain: the handler
    // never runs, the log hook still fires.
    mux.middleware("/admin", |ctx: &Context, w: &mut dyn ResponseSink, req: &Request| {
        if req.header("x-admin-token") == Some("letmein") {
            return Some(ctx.clone());
        }
        w.write_header(StatusCode::FORBIDDEN);
        w.write(b"forbidden");
        None
    });

    mux.get("/items/{id}", get_item);
    mux.get("/admin/stats", admin_stats);
    mux.get("/boom", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        panic!("boom");
    });
    mux.get("/healthz", health::liveness);
    mux.get("/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(mux)
        .await
        .expect("server error");
}

// GET /items/{id} — path parameters come out of the context, not the request.
fn get_item(ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
    let id = ctx.param("id").unwrap_or("unknown");
    w.insert_header("content-type", "application/json");
    w.write(format!(r#"{{"id":"{id}"}}"#).as_bytes());
}

// GET /admin/stats — only reachable through the auth middleware above.
fn admin_stats(ctx: &Context, w: &mut dyn ResponseSink, _req: &Request) {
    let req_id = ctx.get::<RequestId>().map_or(0, |r| r.0);
    w.insert_header("content-type", "application/json");
    w.write(format!(r#"{{"request_id":{req_id},"status":"all green"}}"#).as_bytes());
}

struct RequestId(u64);

// Good enough for a demo id; real services put a ULID here.
fn fastrand() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}
