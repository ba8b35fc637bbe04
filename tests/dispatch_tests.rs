//! Pipeline behavior: context derivation, short-circuits, panic recovery,
//! the exactly-once logging guarantee, and reset.

use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use torii::{Context, Mux, Request, ResponseSink, ResponseWriter, WriterProxy};

// One captured access-log invocation.
#[derive(Clone, Debug)]
struct LogEntry {
    status: u16,
    exception: Option<String>,
}

// Installs a log hook that appends one entry per invocation.
fn capture_log(mux: &mut Mux) -> Arc<Mutex<Vec<LogEntry>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    mux.log_hook(move |ctx: &Context, proxy: &WriterProxy, _req: &Request| {
        sink.lock().unwrap().push(LogEntry {
            status: proxy.status().map_or(0, |s| s.as_u16()),
            exception: ctx.exception().map(|e| e.message().to_owned()),
        });
    });
    log
}

fn status_of(w: &ResponseWriter) -> u16 {
    w.status().map_or(0, |s| s.as_u16())
}

#[test]
fn handler_observes_path_param_via_context() {
    let mut mux = Mux::new();
    mux.get("/items/{id}", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        let id = ctx.param("id").unwrap_or("unknown");
        w.write(id.as_bytes());
    });

    let w = mux.serve(&Request::new(Method::GET, "/items/42"));
    assert_eq!(status_of(&w), 200);
    assert_eq!(w.body(), b"42");
}

#[test]
fn multiple_params_keep_match_order() {
    let mut mux = Mux::new();
    mux.get("/files/{dir}/{name}", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        let params = ctx.get::<torii::PathParams>().unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("dir", "docs"), ("name", "readme")]);
        w.write(b"ok");
    });

    let w = mux.serve(&Request::new(Method::GET, "/files/docs/readme"));
    assert_eq!(w.body(), b"ok");
}

#[test]
fn params_only_injected_when_present() {
    let mut mux = Mux::new();
    mux.get("/plain", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        assert!(ctx.get::<torii::PathParams>().is_none());
        w.write(b"ok");
    });

    let w = mux.serve(&Request::new(Method::GET, "/plain"));
    assert_eq!(w.body(), b"ok");
}

#[test]
fn unmatched_route_hits_default_not_found_through_pipeline() {
    let mut mux = Mux::new();
    let log = capture_log(&mut mux);

    let w = mux.serve(&Request::new(Method::GET, "/ghost"));
    assert_eq!(status_of(&w), 404);
    assert_eq!(w.body(), b"404 page not found");

    // The fallback went through the full pipeline: logging observed it.
    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, 404);
}

#[test]
fn custom_not_found_replaces_default() {
    let mut mux = Mux::new();
    mux.not_found(|_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write_header(StatusCode::GONE);
        w.write(b"nothing here");
    });

    let w = mux.serve(&Request::new(Method::GET, "/ghost"));
    assert_eq!(status_of(&w), 410);
    assert_eq!(w.body(), b"nothing here");
}

#[test]
fn middleware_halt_skips_handler_but_not_logging() {
    let mut mux = Mux::new();
    let log = capture_log(&mut mux);

    struct ChainMark;

    mux.middleware("/", |ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        Some(ctx.with(ChainMark))
    });
    mux.middleware("/admin", |ctx: &Context, w: &mut dyn ResponseSink, req: &Request| {
        if req.header("x-auth").is_some() {
            return Some(ctx.clone());
        }
        w.write_header(StatusCode::FORBIDDEN);
        w.write(b"forbidden");
        None
    });

    let handler_ran = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&handler_ran);
    mux.get("/admin/x", move |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        *flag.lock().unwrap() = true;
        w.write(b"secret");
    });

    // Without the marker header: 403, handler skipped, logging still ran.
    let w = mux.serve(&Request::new(Method::GET, "/admin/x"));
    assert_eq!(status_of(&w), 403);
    assert_eq!(w.body(), b"forbidden");
    assert!(!*handler_ran.lock().unwrap());
    {
        let entries = log.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, 403);
    }

    // With it: the chain proceeds all the way to the handler.
    let w = mux.serve(&Request::new(Method::GET, "/admin/x").with_header("x-auth", "1"));
    assert_eq!(w.body(), b"secret");
    assert!(*handler_ran.lock().unwrap());
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn log_hook_runs_exactly_once_on_every_path() {
    let mut mux = Mux::new();
    let log = capture_log(&mut mux);
    mux.panic_hook(|_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {});

    mux.get("/ok", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write(b"ok");
    });
    mux.get("/panic", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        panic!("kaboom");
    });
    mux.middleware("/halted", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write_header(StatusCode::TOO_MANY_REQUESTS);
        None
    });
    mux.get("/halted", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write(b"never");
    });

    mux.serve(&Request::new(Method::GET, "/ok"));        // success
    mux.serve(&Request::new(Method::GET, "/halted"));    // short-circuit
    mux.serve(&Request::new(Method::GET, "/panic"));     // recovered panic
    mux.serve(&Request::new(Method::GET, "/ghost"));     // not-found fallback

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 4, "one log entry per request, no more, no less");
}

#[test]
fn panic_hook_sees_exception_and_writes_response() {
    let mut mux = Mux::new();
    let log = capture_log(&mut mux);

    mux.panic_hook(|ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        let message = ctx.exception().map_or("?", |e| e.message()).to_owned();
        w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        w.write(message.as_bytes());
    });
    mux.get("/explode", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        panic!("boom");
    });

    let w = mux.serve(&Request::new(Method::GET, "/explode"));
    assert_eq!(status_of(&w), 500);
    assert_eq!(w.body(), b"boom");

    // Logging ran once, with the exception visible in its context, and the
    // safety-net 500 was a no-op since the hook had already committed 500.
    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, 500);
    assert_eq!(entries[0].exception.as_deref(), Some("boom"));
}

#[test]
fn panic_without_hook_propagates_to_caller() {
    let mut mux = Mux::new();
    mux.get("/explode", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        panic!("unhandled");
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        mux.serve(&Request::new(Method::GET, "/explode"))
    }));
    assert!(result.is_err(), "without a panic hook the unwind must escape the core");
}

#[test]
fn safety_net_500_when_handler_writes_nothing() {
    let mut mux = Mux::new();
    let log = capture_log(&mut mux);
    mux.get("/silent", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {});

    let w = mux.serve(&Request::new(Method::GET, "/silent"));
    assert_eq!(status_of(&w), 500);

    // The hook itself observed the pre-safety-net state: nothing committed.
    assert_eq!(log.lock().unwrap()[0].status, 0);
}

#[test]
fn no_safety_net_without_log_hook() {
    let mut mux = Mux::new();
    mux.get("/silent", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {});

    // No proxy, no safety net: the transport turns an unsent writer into
    // an empty 200.
    let w = mux.serve(&Request::new(Method::GET, "/silent"));
    assert_eq!(w.status(), None);
    assert_eq!(w.into_response().status(), StatusCode::OK);
}

#[test]
fn safety_net_is_noop_after_committed_status() {
    let mut mux = Mux::new();
    let _log = capture_log(&mut mux);
    mux.get("/teapot", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write_header(StatusCode::IM_A_TEAPOT);
    });

    let w = mux.serve(&Request::new(Method::GET, "/teapot"));
    assert_eq!(status_of(&w), 418);
}

#[test]
fn panicking_log_hook_is_not_invoked_twice() {
    let mut mux = Mux::new();

    let log_calls = Arc::new(Mutex::new(0_usize));
    let calls = Arc::clone(&log_calls);
    mux.log_hook(move |_ctx: &Context, _proxy: &WriterProxy, _req: &Request| {
        *calls.lock().unwrap() += 1;
        panic!("log hook exploded");
    });

    let hook_saw = Arc::new(Mutex::new(None::<String>));
    let saw = Arc::clone(&hook_saw);
    mux.panic_hook(move |ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        *saw.lock().unwrap() = ctx.exception().map(|e| e.message().to_owned());
    });

    mux.get("/ok", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write(b"fine");
    });

    mux.serve(&Request::new(Method::GET, "/ok"));
    assert_eq!(*log_calls.lock().unwrap(), 1);
    assert_eq!(
        hook_saw.lock().unwrap().as_deref(),
        Some("log hook exploded"),
        "the recovery path handles the log hook's own panic"
    );
}

#[test]
fn root_context_values_reach_handlers() {
    struct AppName(&'static str);

    let mut mux = Mux::new();
    mux.set_context(Context::new().with(AppName("torii-test")));
    mux.get("/name", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        let name = ctx.get::<AppName>().map_or("?", |a| a.0);
        w.write(name.as_bytes());
    });

    let w = mux.serve(&Request::new(Method::GET, "/name"));
    assert_eq!(w.body(), b"torii-test");
}

#[test]
fn reset_clears_routes_middleware_hooks_and_context() {
    struct AppName(&'static str);

    let mut mux = Mux::new();
    let log = capture_log(&mut mux);
    mux.set_context(Context::new().with(AppName("doomed")));
    mux.panic_hook(|_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {});
    mux.middleware("/", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write_header(StatusCode::FORBIDDEN);
        None
    });
    mux.get("/items/{id}", |_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write(b"still here");
    });

    mux.reset();

    // Previously registered route now falls through to the default 404,
    // the halting middleware is gone, and the log hook no longer fires.
    let w = mux.serve(&Request::new(Method::GET, "/items/42"));
    assert_eq!(status_of(&w), 404);
    assert_eq!(w.body(), b"404 page not found");
    assert!(log.lock().unwrap().is_empty());
    assert!(mux.context().get::<AppName>().is_none());
}

#[test]
fn panic_in_one_request_does_not_affect_concurrent_request() {
    struct Tag(&'static str);

    let mut mux = Mux::new();
    let log = capture_log(&mut mux);
    mux.panic_hook(|_ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
    });
    mux.middleware("/", |ctx: &Context, _w: &mut dyn ResponseSink, req: &Request| {
        Some(ctx.with(Tag(if req.path() == "/stable" { "stable" } else { "volatile" })))
    });
    mux.get("/volatile", |_ctx: &Context, _w: &mut dyn ResponseSink, _req: &Request| {
        panic!("volatile handler down");
    });
    mux.get("/stable", |ctx: &Context, w: &mut dyn ResponseSink, _req: &Request| {
        // Briefly overlap with the panicking sibling request.
        std::thread::sleep(std::time::Duration::from_millis(20));
        w.write(ctx.get::<Tag>().map_or("?", |t| t.0).as_bytes());
    });

    let mux = Arc::new(mux);
    let a = {
        let mux = Arc::clone(&mux);
        std::thread::spawn(move || mux.serve(&Request::new(Method::GET, "/volatile")))
    };
    let b = {
        let mux = Arc::clone(&mux);
        std::thread::spawn(move || mux.serve(&Request::new(Method::GET, "/stable")))
    };

    let wa = a.join().expect("recovered panic must not kill the task");
    let wb = b.join().expect("sibling request must be unaffected");

    assert_eq!(status_of(&wa), 500);
    assert_eq!(wb.body(), b"stable");
    assert_eq!(status_of(&wb), 200);

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 2);
    let stable = entries.iter().find(|e| e.status == 200).unwrap();
    assert!(stable.exception.is_none(), "no exception bleeds into the healthy request");
}
