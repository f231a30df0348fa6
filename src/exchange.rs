//! What every chain node sees, and what it may hand back.

use bytes::Bytes;
use http::StatusCode;

use crate::error::BoxError;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::{Body, Response};

/// The request being resolved and the response being built for it.
///
/// One exchange exists per [`Resolver::execute`](crate::Resolver::execute)
/// call and is passed by `&mut` down the whole chain. Its `response` is the
/// only response the request will get: it stays in place while the chain
/// runs and is moved out once the outermost node returns.
#[derive(Debug)]
pub struct Exchange<'r> {
    pub request: &'r mut Request,
    /// The in-flight response. Content negotiation writes here right before
    /// the action runs, raw [`Body`] and status replies are poured into it,
    /// and a built [`Response`] reply replaces it.
    pub response: Response,
}

impl<'r> Exchange<'r> {
    pub(crate) fn new(request: &'r mut Request) -> Self {
        Self { request, response: Response::default() }
    }

    /// Places `body` into the in-flight response and marks it complete.
    pub fn respond(&mut self, body: impl Into<Body>) -> Reply {
        self.response.set_body(body.into());
        Reply::Done
    }

    /// Folds a node's reply into the in-flight response. Everything except
    /// an unrun continuation comes back as [`Reply::Done`].
    pub(crate) fn absorb(&mut self, reply: Reply) -> Reply {
        match reply {
            Reply::Response(response) => self.response = response,
            Reply::Body(body) => { self.response.set_body(body); }
            Reply::Status(status) => { self.response.set_status(status); }
            reply @ (Reply::Done | Reply::Next(_)) => return reply,
        }
        Reply::Done
    }
}

/// What a middleware or action produced.
#[derive(Debug)]
pub enum Reply {
    /// The in-flight response ([`Exchange::response`]) is complete.
    Done,
    /// A freshly built response that replaces the in-flight one.
    Response(Response),
    /// A raw body, poured into the in-flight response.
    Body(Body),
    /// A bare status, set on the in-flight response.
    Status(StatusCode),
    /// A continuation handed back without being run. Propagated unchanged,
    /// but a chain that ends on one has broken its contract.
    Next(Next),
}

/// The result of running one chain node.
pub type Outcome = Result<Reply, BoxError>;

impl From<Response> for Reply {
    fn from(r: Response) -> Self { Self::Response(r) }
}

impl From<Body> for Reply {
    fn from(b: Body) -> Self { Self::Body(b) }
}

impl From<StatusCode> for Reply {
    fn from(s: StatusCode) -> Self { Self::Status(s) }
}

impl From<Next> for Reply {
    fn from(n: Next) -> Self { Self::Next(n) }
}

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion from whatever a middleware or action returns into an [`Outcome`].
///
/// Implemented for responses, raw bodies (strings, JSON values, bytes), bare
/// status codes, and `Result`s of any of these.
///
/// ```rust
/// use strand::{Exchange, HttpError};
///
/// fn show(ex: &mut Exchange<'_>) -> Result<String, HttpError> {
///     let id = ex.request.param("id").ok_or_else(HttpError::not_found)?;
///     Ok(format!("user {id}"))
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

macro_rules! into_reply {
    ($($ty:ty => |$v:ident| $reply:expr;)*) => {
        $(
            impl IntoOutcome for $ty {
                fn into_outcome(self) -> Outcome {
                    let $v = self;
                    Ok($reply)
                }
            }
        )*
    };
}

into_reply! {
    Reply             => |r| r;
    Response          => |r| Reply::Response(r);
    Next              => |n| Reply::Next(n);
    Body              => |b| Reply::Body(b);
    &'static str      => |s| Reply::Body(Body::from(s));
    String            => |s| Reply::Body(Body::Text(s));
    serde_json::Value => |v| Reply::Body(Body::Json(v));
    Bytes             => |b| Reply::Body(Body::Bytes(b));
    Vec<u8>           => |b| Reply::Body(Body::from(b));
    StatusCode        => |s| Reply::Status(s);
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome {
        self.map_err(Into::into)?.into_outcome()
    }
}
