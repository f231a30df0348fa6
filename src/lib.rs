//! # strand
//!
//! Middleware chains for a minimal HTTP framework.
//!
//! A route names an action and the middlewares that run in front of it.
//! For every request strand builds that chain fresh, runs it, and guarantees
//! exactly one well-formed response comes out, whatever happens inside.
//!
//! ## The contract
//!
//! - Middlewares run in the order they are declared on the route. Each one
//!   receives the rest of the chain as a [`Next`] and decides whether to run
//!   it.
//! - Content negotiation happens once, right before the action runs.
//! - A request has one response, held by its [`Exchange`]. Raw bodies and
//!   bare status codes returned anywhere in the chain are poured into it, so
//!   headers a middleware set on the way in are kept.
//! - Every middleware and action instance is built for one request and
//!   dropped with it.
//! - A missing route, an error, a panic, or a chain that ends without a
//!   response all become a response through one [`ErrorHandler`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strand::{Container, Exchange, HttpError, Next, Outcome, Resolver, Route, Router, Server};
//! use strand::middleware::Trace;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strand::Error> {
//!     let routes = Router::new()
//!         .get("/users/{id}", Route::to("users", "show").middleware("trace").middleware("auth"));
//!
//!     let container = Container::new()
//!         .middleware("trace", Trace::default)
//!         .middleware_fn("auth", require_token)
//!         .handler("users", "show", show_user);
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .serve(Resolver::new(routes, container))
//!         .await
//! }
//!
//! fn require_token(ex: &mut Exchange<'_>, next: Next) -> Outcome {
//!     match ex.request.header("authorization") {
//!         Some(_) => next.run(ex),
//!         None => Err(HttpError::unauthorized().into()),
//!     }
//! }
//!
//! fn show_user(ex: &mut Exchange<'_>) -> serde_json::Value {
//!     serde_json::json!({ "id": ex.request.param("id") })
//! }
//! ```

mod config;
mod container;
mod error;
mod exchange;
mod handler;
mod recovery;
mod request;
mod resolver;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::{Config, ConfigError};
pub use container::{Container, ContainerError};
pub use error::{BoxError, Error, Failure, HttpError, Panicked};
pub use exchange::{Exchange, IntoOutcome, Outcome, Reply};
pub use handler::{Action, Handler};
pub use middleware::{Middleware, Next};
pub use recovery::{DefaultErrorHandler, ErrorHandler, FailureContext};
pub use request::Request;
pub use resolver::Resolver;
pub use response::{Body, ContentType, Response};
pub use router::{ActionRef, Params, Route, Router};
pub use server::Server;
