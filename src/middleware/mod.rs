//! Middleware layer.
//!
//! A middleware sits in front of a route's action and receives the rest of
//! the chain as a [`Next`]. It may:
//!
//! - pass control onward with `next.run(ex)` and return (or adjust) what
//!   comes back,
//! - short-circuit by returning its own reply without running `next`,
//! - fail by returning an error, which the resolver recovers from.
//!
//! ```text
//! route.middlewares = [A, B, C]
//!
//! A.handle(ex, next_b)
//!   └─ B.handle(ex, next_c)
//!        └─ C.handle(ex, next_action)
//!             └─ negotiate content type, action.call(ex)
//! ```
//!
//! Middlewares are registered by name in the [`Container`](crate::Container)
//! and instantiated fresh for every request that reaches them, so they may
//! keep per-request state in `self` but nothing survives between requests.

use std::fmt;
use std::sync::Arc;

use crate::exchange::{Exchange, IntoOutcome, Outcome};

mod trace;

pub use trace::Trace;

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain from this point forward.
///
/// Running it consumes it, so a middleware can continue the chain at most
/// once.
pub struct Next {
    run: Box<dyn FnOnce(&mut Exchange<'_>) -> Outcome>,
}

impl Next {
    pub(crate) fn new(run: impl FnOnce(&mut Exchange<'_>) -> Outcome + 'static) -> Self {
        Self { run: Box::new(run) }
    }

    /// Runs every remaining middleware and the action.
    pub fn run(self, ex: &mut Exchange<'_>) -> Outcome {
        (self.run)(ex)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// An interceptor that runs before a route's action.
///
/// ```rust
/// use strand::{Exchange, Middleware, Next, Outcome};
///
/// struct PoweredBy;
///
/// impl Middleware for PoweredBy {
///     fn handle(&mut self, ex: &mut Exchange<'_>, next: Next) -> Outcome {
///         ex.response.header("x-powered-by", "strand");
///         next.run(ex)
///     }
/// }
/// ```
pub trait Middleware {
    fn handle(&mut self, ex: &mut Exchange<'_>, next: Next) -> Outcome;
}

/// Builds a middleware from a function.
///
/// ```rust
/// use strand::{Container, Exchange, Next, Outcome, middleware};
///
/// fn timing(ex: &mut Exchange<'_>, next: Next) -> Outcome {
///     ex.response.header("server-timing", "app");
///     next.run(ex)
/// }
///
/// let container = Container::new().middleware("timing", || middleware::from_fn(timing));
/// ```
pub fn from_fn<F, O>(f: F) -> FromFn<F>
where
    F: Fn(&mut Exchange<'_>, Next) -> O,
    O: IntoOutcome,
{
    FromFn(Arc::new(f))
}

/// A middleware backed by a function. See [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F> Clone for FromFn<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F, O> Middleware for FromFn<F>
where
    F: Fn(&mut Exchange<'_>, Next) -> O,
    O: IntoOutcome,
{
    fn handle(&mut self, ex: &mut Exchange<'_>, next: Next) -> Outcome {
        (self.0)(ex, next).into_outcome()
    }
}
