//! Immutable, derivable per-request context.
//!
//! A [`Context`] is an association from *typed tokens* to values, organised
//! as a linked chain of layers. Each layer holds exactly one entry and an
//! `Arc` to its parent, so deriving a child never touches the parent:
//!
//! ```text
//! root ← with(PathParams) ← with(UserId) ← with(Exception)
//!                │
//!                └─ a sibling derived from the same parent shares the
//!                   tail of the chain without seeing the sibling's layers
//! ```
//!
//! Lookup walks from the most recently derived layer toward the root and
//! returns the first entry whose token matches — nearest layer wins. There
//! is no removal: to "change" a value, derive again; the new layer shadows
//! the old one.
//!
//! Tokens are Rust types. The crate defines two of its own ([`PathParams`],
//! [`Exception`]); applications attach anything else through a newtype:
//!
//! ```rust
//! use torii::Context;
//!
//! struct RequestId(u64);
//!
//! let root = Context::new();
//! let ctx = root.with(RequestId(7));
//! assert_eq!(ctx.get::<RequestId>().unwrap().0, 7);
//! assert!(root.get::<RequestId>().is_none()); // the parent is untouched
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// An immutable chain of typed key/value layers scoped to one request.
///
/// Cloning a `Context` is one `Arc` clone — contexts are passed around by
/// value and shared freely across threads.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Layer>>,
}

struct Layer {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Layer>>,
}

impl Context {
    /// The empty root context. Every request context ultimately derives
    /// from one of these.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Derives a child context exposing `value` under the token type `T`.
    ///
    /// The child falls back to `self` for every other token. `self` is not
    /// modified; siblings derived from it are unaffected.
    pub fn with<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Layer {
                key: TypeId::of::<T>(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Looks up the nearest layer holding a `T`. Returns `None` if no layer
    /// in the chain carries that token — an unset token is not an error.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            if layer.key == TypeId::of::<T>() {
                return layer.value.downcast_ref::<T>();
            }
            cur = layer.parent.as_deref();
        }
        None
    }

    /// Returns the named path parameter bound by route matching.
    ///
    /// For a route `/users/{id}`, `ctx.param("id")` on `/users/42` returns
    /// `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.get::<PathParams>().and_then(|p| p.get(name))
    }

    /// Returns the exception record attached by the dispatcher's recovery
    /// path. Only ever present inside a panic hook.
    pub fn exception(&self) -> Option<&Exception> {
        self.get::<Exception>()
    }

    fn depth(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            n += 1;
            cur = layer.parent.as_deref();
        }
        n
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}

// ── Built-in tokens ───────────────────────────────────────────────────────────

/// Path parameters extracted by route matching, in match order.
///
/// Injected into the request context only when the route actually bound
/// parameters; prefer [`Context::param`] for single lookups.
#[derive(Clone, Debug)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub(crate) fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// Value of the parameter `name`, if the route bound one.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All `(name, value)` pairs in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// The recovered payload of a caught panic.
///
/// Attached to the context only on the dispatcher's recovery path and read
/// back with [`Context::exception`]. Panic payloads are almost always a
/// `&str` or `String` (from `panic!("…")`); those survive verbatim. Any
/// other payload type is recorded as a fixed placeholder.
#[derive(Clone, Debug)]
pub struct Exception {
    message: String,
}

impl Exception {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
