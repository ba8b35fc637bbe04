//! Prefix-scoped middleware registry and chain runner.
//!
//! Middleware is registered under a path prefix and runs for every request
//! whose path lives under that prefix. The run order is deterministic:
//! **shortest matching prefix first, then registration order within a
//! prefix**. Distinct prefixes of one path always differ in length, so the
//! rule is total — `/` middleware runs before `/admin` middleware on a
//! request to `/admin/users`, and two middleware registered under `/admin`
//! run in the order they were registered.
//!
//! Each middleware receives the context produced by the previous one and
//! returns the chain decision: `Some(ctx)` to continue, `None` to halt. On
//! halt the runner stops immediately and the dispatcher skips the route
//! handler; the log hook still observes the request.
//!
//! Prefix matching is segment-aware: `/admin` matches `/admin` and
//! `/admin/users` but not `/administrator`. A trailing-slash prefix like
//! `/admin/` matches only paths strictly below it.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::handler::Middleware;
use crate::request::Request;
use crate::writer::ResponseSink;

/// The middleware table: prefix → ordered chain.
///
/// A `BTreeMap` keyed by prefix yields the matching subset of entries in
/// shortest-prefix-first order, since all prefixes of one path sort by
/// length lexicographically.
#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<String, Vec<Middleware>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends `mw` to the chain registered under `prefix`.
    pub(crate) fn register(&mut self, prefix: &str, mw: Middleware) {
        self.entries.entry(prefix.to_owned()).or_default().push(mw);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Runs every middleware whose prefix matches the request path,
    /// threading the context forward. Returns the final context and
    /// whether the dispatcher should proceed to the handler.
    pub(crate) fn run(
        &self,
        mut ctx: Context,
        sink: &mut dyn ResponseSink,
        req: &Request,
    ) -> (Context, bool) {
        for (prefix, chain) in &self.entries {
            if !prefix_matches(prefix, req.path()) {
                continue;
            }
            for mw in chain {
                match (**mw)(&ctx, sink, req) {
                    Some(next) => ctx = next,
                    None => return (ctx, false),
                }
            }
        }
        (ctx, true)
    }
}

/// Segment-aware prefix match.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    match prefix {
        "" | "/" => true,
        _ if prefix.ends_with('/') => path.starts_with(prefix),
        _ => {
            path.starts_with(prefix)
                && (path.len() == prefix.len() || path.as_bytes()[prefix.len()] == b'/')
        }
    }
}
