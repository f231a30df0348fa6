//! Turning failures into responses.
//!
//! The resolver never decides what a failure looks like on the wire. It
//! wraps the failure into a [`FailureContext`], asks the container for an
//! [`ErrorHandler`] built around it, and returns whatever that handler
//! renders.

use http::{Method, StatusCode};
use serde_json::json;

use crate::error::Failure;
use crate::request::Request;
use crate::response::Response;

/// A caught failure together with the request it interrupted.
#[derive(Debug)]
pub struct FailureContext {
    failure: Failure,
    method: Method,
    path: String,
}

impl FailureContext {
    pub fn new(failure: Failure, req: &Request) -> Self {
        Self {
            failure,
            method: req.method().clone(),
            path: req.path().to_owned(),
        }
    }

    pub fn failure(&self) -> &Failure { &self.failure }
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }

    pub fn into_failure(self) -> Failure { self.failure }
}

/// Renders a caught failure. The only way a failure reaches the client.
pub trait ErrorHandler {
    fn to_response(&self) -> Response;
}

/// Maps failures to JSON error responses.
///
/// | Failure | Status |
/// |---|---|
/// | `RouteNotFound` | 404 |
/// | `ChainInvocation` carrying an [`HttpError`](crate::HttpError) | that error's status |
/// | anything else | 500 |
///
/// The body is `{"status": 404, "error": "Not Found"}`. An `HttpError`
/// contributes its message. The failure itself is only described under a
/// `detail` key when `expose_errors` is on.
#[derive(Debug)]
pub struct DefaultErrorHandler {
    ctx: FailureContext,
    expose_errors: bool,
}

impl DefaultErrorHandler {
    pub fn new(ctx: FailureContext, expose_errors: bool) -> Self {
        Self { ctx, expose_errors }
    }

    pub fn status(&self) -> StatusCode {
        match self.ctx.failure() {
            Failure::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            failure => failure
                .http_error()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, |e| e.status()),
        }
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn to_response(&self) -> Response {
        let status = self.status();
        let failure = self.ctx.failure();

        let mut body = json!({
            "status": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
        });
        if let Some(err) = failure.http_error() {
            body["message"] = json!(err.message());
        }
        if self.expose_errors {
            body["detail"] = json!(failure.to_string());
        }

        let mut res = Response::json(body);
        res.set_status(status);
        res
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{HttpError, Panicked};
    use crate::response::Body;

    use super::*;

    fn handler(failure: Failure, expose: bool) -> DefaultErrorHandler {
        let req = Request::new(Method::GET, "/users/42");
        DefaultErrorHandler::new(FailureContext::new(failure, &req), expose)
    }

    fn json_body(res: &Response) -> serde_json::Value {
        match res.body() {
            Body::Json(v) => v.clone(),
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn route_not_found_is_404() {
        let res = handler(
            Failure::RouteNotFound { method: "GET".into(), path: "/users/42".into() },
            false,
        )
        .to_response();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(&res), json!({ "status": 404, "error": "Not Found" }));
    }

    #[test]
    fn generic_failures_hide_details() {
        let res = handler(Failure::ChainInvocation("db password leaked".into()), false).to_response();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(&res);
        assert!(body.get("detail").is_none());
        assert!(!body.to_string().contains("db password"));
    }

    #[test]
    fn details_are_exposed_when_configured() {
        let res = handler(Failure::ChainInvocation(Box::new(Panicked("oops".into()))), true)
            .to_response();
        assert_eq!(json_body(&res)["detail"], "chain invocation failed: panicked: oops");
    }

    #[test]
    fn http_errors_keep_their_status_and_message() {
        let err = HttpError::new(StatusCode::UNAUTHORIZED, "token expired");
        let res = handler(Failure::ChainInvocation(Box::new(err)), false).to_response();
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(&res)["message"], "token expired");
    }

    #[test]
    fn contract_violations_are_500() {
        let h = handler(Failure::ContractViolation("no response".into()), false);
        assert_eq!(h.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
