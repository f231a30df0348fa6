//! Error types.
//!
//! Two families live here and they never mix:
//!
//! - [`Error`] surfaces infrastructure failures: binding a port, accepting a
//!   connection, loading configuration. It is what [`Server`](crate::Server)
//!   returns.
//! - [`Failure`] classifies everything that can go wrong while resolving a
//!   single request. It never reaches the caller of
//!   [`Resolver::execute`](crate::Resolver::execute); the error handler turns
//!   it into a [`Response`](crate::Response).

use std::fmt;
use std::net::AddrParseError;

use http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Any error a middleware, an action or the container may raise.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by strand's fallible infrastructure operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

// ── Request failures ─────────────────────────────────────────────────────────

/// Why a request could not be resolved into a response by its chain.
///
/// The resolver only classifies; mapping a failure to a status code is the
/// [`ErrorHandler`](crate::ErrorHandler)'s job.
#[derive(Debug, Error)]
pub enum Failure {
    /// No route matched the method + path pair.
    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// A middleware, the action, or the container failed mid-chain.
    #[error("chain invocation failed: {0}")]
    ChainInvocation(#[source] BoxError),

    /// The chain completed without producing a response.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl Failure {
    /// The status-carrying error behind this failure, if a middleware or
    /// action raised one.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::ChainInvocation(err) => err.downcast_ref::<HttpError>(),
            _ => None,
        }
    }
}

/// A panic that unwound out of the chain, captured with its message.
#[derive(Debug, Error)]
#[error("panicked: {0}")]
pub struct Panicked(pub String);

// ── HttpError ────────────────────────────────────────────────────────────────

/// An error that already knows which status it should become.
///
/// Return it from a middleware to abort with something more specific than a
/// 500:
///
/// ```rust
/// use strand::{HttpError, Exchange, Next, Outcome};
///
/// fn require_token(ex: &mut Exchange<'_>, next: Next) -> Outcome {
///     if ex.request.header("authorization").is_none() {
///         return Err(HttpError::unauthorized().into());
///     }
///     next.run(ex)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for HttpError {}
