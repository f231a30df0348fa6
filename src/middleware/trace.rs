//! Request tracing middleware.

use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::exchange::{Exchange, Outcome, Reply};
use crate::middleware::{Middleware, Next};

/// Per-request span with method, path, status and latency.
///
/// Register it under a name and put that name first on the routes you want
/// traced:
///
/// ```rust
/// use strand::{Container, Route, middleware::Trace};
///
/// let container = Container::new().middleware("trace", Trace::default);
/// let route = Route::to("users", "show").middleware("trace");
/// ```
#[derive(Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle(&mut self, ex: &mut Exchange<'_>, next: Next) -> Outcome {
        let span = info_span!(
            "request",
            method = %ex.request.method(),
            path = ex.request.path()
        );
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = next.run(ex);

        let latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(Reply::Next(_)) => info!(latency_us, "request completed without a response"),
            Ok(reply) => {
                let status = match reply {
                    Reply::Response(res) => res.status_code(),
                    Reply::Status(status) => *status,
                    _ => ex.response.status_code(),
                };
                info!(status = status.as_u16(), latency_us, "request completed");
            }
            Err(err) => warn!(error = %err, latency_us, "request failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    #[test]
    fn passes_the_inner_reply_through() {
        let mut req = Request::new(Method::GET, "/traced");
        let mut ex = Exchange::new(&mut req);
        let next = Next::new(|_| Ok(Reply::Response(Response::text("inner"))));

        match Trace.handle(&mut ex, next) {
            Ok(Reply::Response(res)) => assert_eq!(res.content_type(), Some(crate::ContentType::Text)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn leaves_the_in_flight_response_alone() {
        let mut req = Request::new(Method::GET, "/traced");
        let mut ex = Exchange::new(&mut req);
        let next = Next::new(|ex| {
            ex.response.set_status(http::StatusCode::ACCEPTED);
            Ok(ex.respond("inner"))
        });

        assert!(matches!(Trace.handle(&mut ex, next), Ok(Reply::Done)));
        assert_eq!(ex.response.status_code(), http::StatusCode::ACCEPTED);
        assert_eq!(ex.response.body(), &crate::Body::Text("inner".into()));
    }

    #[test]
    fn passes_errors_through() {
        let mut req = Request::new(Method::GET, "/traced");
        let mut ex = Exchange::new(&mut req);
        let next = Next::new(|_| Err("backend down".into()));

        let err = Trace.handle(&mut ex, next).unwrap_err();
        assert_eq!(err.to_string(), "backend down");
    }
}
