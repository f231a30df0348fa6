//! Chain resolution: one request in, one response out.
//!
//! # Per-request state machine
//!
//! ```text
//! Start ─┬─ RouteMatched ─ ChainBuilt ─ ChainExecuting ─┬─ ResponseProduced
//!        │                                               │
//!        └─ RouteMissing ──────────────────────── FailureRaised
//!                                                        │
//!                                   ErrorHandled ─ ResponseProduced
//! ```
//!
//! # Building the chain
//!
//! The action becomes the innermost [`Next`]. Middlewares are then folded
//! over it from last to first, each wrapping the continuation built so far,
//! so the outermost continuation runs the first declared middleware:
//!
//! ```text
//! middlewares = [A, B]
//!
//! next = action                 ← terminal: negotiate, then call the action
//! next = |ex| B.handle(ex, next)
//! next = |ex| A.handle(ex, next)
//! next.run(ex)                  ← A, B, action
//! ```
//!
//! Nothing is instantiated while building. Each step asks the container for
//! a fresh instance when the chain reaches it, so a short-circuit leaves the
//! remaining middlewares and the action unbuilt.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, error, trace, warn};

use crate::container::Container;
use crate::error::{BoxError, Failure, Panicked};
use crate::exchange::{Exchange, Outcome, Reply};
use crate::middleware::Next;
use crate::recovery::FailureContext;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Params, Route, Router};

/// Resolves requests against a route table, instantiating chain steps from a
/// container.
///
/// Cheap to clone: both collaborators are shared behind `Arc` and never
/// mutated after construction.
#[derive(Clone)]
pub struct Resolver {
    router: Arc<Router>,
    container: Arc<Container>,
}

impl Resolver {
    pub fn new(router: impl Into<Arc<Router>>, container: impl Into<Arc<Container>>) -> Self {
        Self { router: router.into(), container: container.into() }
    }

    pub fn router(&self) -> &Router { &self.router }
    pub fn container(&self) -> &Container { &self.container }

    /// Looks up the route for the request's own method and path, then
    /// executes it.
    pub fn resolve(&self, request: &mut Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();
        self.resolve_path(request, &method, &path)
    }

    /// Looks up the route for an explicit method and path, then executes it
    /// against `request`.
    pub fn resolve_path(&self, request: &mut Request, method: &Method, path: &str) -> Response {
        let (route, params) = self.router.lookup(method, path);
        self.execute(request, route, params)
    }

    /// Runs `route`'s chain for `request` and returns its response.
    ///
    /// Never fails: a missing route, an error or panic anywhere in the chain,
    /// and a chain that finishes without a response all go through the
    /// container's error handler instead.
    pub fn execute(
        &self,
        request: &mut Request,
        route: Option<Arc<Route>>,
        params: Params,
    ) -> Response {
        match self.run_chain(request, route, params) {
            Ok(response) => {
                debug!(status = response.status_code().as_u16(), "response produced");
                response
            }
            Err(failure) => self.recover(request, failure),
        }
    }

    fn run_chain(
        &self,
        request: &mut Request,
        route: Option<Arc<Route>>,
        params: Params,
    ) -> Result<Response, Failure> {
        let Some(route) = route else {
            return Err(Failure::RouteNotFound {
                method: request.method().to_string(),
                path: request.path().to_owned(),
            });
        };
        debug!(
            route = route.pattern(),
            action = %route.action(),
            middlewares = route.middlewares().len(),
            "route matched"
        );

        let chain = self.build(&route);
        request.set_route(route);
        request.set_route_params(params);

        let mut ex = Exchange::new(request);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| chain.run(&mut ex)))
            .unwrap_or_else(|payload| Err(Box::new(Panicked(panic_message(payload))) as BoxError));

        match normalize(&mut ex, outcome).map_err(Failure::ChainInvocation)? {
            Reply::Next(_) => Err(Failure::ContractViolation(
                "chain returned a continuation instead of a response".to_owned(),
            )),
            _ => Ok(ex.response),
        }
    }

    fn build(&self, route: &Route) -> Next {
        let container = Arc::clone(&self.container);
        let action = route.action().clone();

        let terminal = Next::new(move |ex| {
            ex.response.negotiate_content_type(&*ex.request, container.default_content_type());
            let mut instance = container.make_action(&action)?;
            trace!(%action, "calling action");
            let outcome = instance.call(ex);
            normalize(ex, outcome)
        });

        route.middlewares().iter().rev().fold(terminal, |next, name| {
            let container = Arc::clone(&self.container);
            let name = name.clone();
            Next::new(move |ex| {
                let mut instance = container.make_middleware(&name)?;
                trace!(middleware = %name, "entering middleware");
                let outcome = instance.handle(ex, next);
                normalize(ex, outcome)
            })
        })
    }

    fn recover(&self, request: &Request, failure: Failure) -> Response {
        match &failure {
            Failure::RouteNotFound { .. } => debug!(%failure, "request failed"),
            Failure::ChainInvocation(err) if err.is::<Panicked>() => error!(%failure, "request failed"),
            Failure::ChainInvocation(_) => warn!(%failure, "request failed"),
            Failure::ContractViolation(_) => error!(%failure, "request failed"),
        }

        let ctx = FailureContext::new(failure, request);
        let container = &self.container;
        panic::catch_unwind(AssertUnwindSafe(|| container.make_error_handler(ctx).to_response()))
            .unwrap_or_else(|payload| {
                error!(panic = %panic_message(payload), "error handler panicked");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            })
    }
}

/// Folds a node's reply into the in-flight response. Errors and unrun
/// continuations pass through untouched.
fn normalize(ex: &mut Exchange<'_>, outcome: Outcome) -> Outcome {
    Ok(ex.absorb(outcome?))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload.downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
