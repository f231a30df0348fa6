//! Dependency container.
//!
//! Routes refer to middlewares and actions by name. The container maps each
//! name to a factory and calls that factory every time a chain reaches the
//! corresponding step, so no instance is ever shared between two requests.
//!
//! ```rust
//! use strand::{Container, Exchange, middleware::Trace};
//!
//! fn show(ex: &mut Exchange<'_>) -> String {
//!     format!("user {}", ex.request.param("id").unwrap_or("?"))
//! }
//!
//! let container = Container::new()
//!     .middleware("trace", Trace::default)
//!     .handler("users", "show", show);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::exchange::{Exchange, IntoOutcome};
use crate::handler::{Action, Handler};
use crate::middleware::{self, Middleware, Next};
use crate::recovery::{DefaultErrorHandler, ErrorHandler, FailureContext};
use crate::response::ContentType;
use crate::router::ActionRef;

type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;
type ActionFactory = Arc<dyn Fn() -> Box<dyn Action> + Send + Sync>;
type ErrorHandlerFactory = Arc<dyn Fn(FailureContext) -> Box<dyn ErrorHandler> + Send + Sync>;

/// A name a route refers to has no registration.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no middleware registered as `{0}`")]
    UnknownMiddleware(String),

    #[error("no action registered as `{0}`")]
    UnknownAction(ActionRef),
}

/// Named factories for everything a chain instantiates.
///
/// Built once at startup, then shared read-only across requests.
pub struct Container {
    middlewares: HashMap<String, MiddlewareFactory>,
    actions: HashMap<ActionRef, ActionFactory>,
    error_handler: Option<ErrorHandlerFactory>,
    expose_errors: bool,
    default_content_type: ContentType,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        let defaults = Config::default();
        Self {
            middlewares: HashMap::new(),
            actions: HashMap::new(),
            error_handler: None,
            expose_errors: defaults.expose_errors,
            default_content_type: defaults.default_content_type,
        }
    }

    /// Applies the request-handling parts of `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.expose_errors = config.expose_errors;
        self.default_content_type = config.default_content_type;
        self
    }

    /// Registers a middleware factory under `name`. Called once per request
    /// that reaches this middleware.
    pub fn middleware<F, M>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.middlewares.insert(
            name.into(),
            Arc::new(move || Box::new(factory()) as Box<dyn Middleware>),
        );
        self
    }

    /// Registers a function as a middleware under `name`.
    ///
    /// Every request gets its own handle, but all handles share the one
    /// function: state captured by a closure (an `Arc<AtomicUsize>`, say) is
    /// shared across requests. Use [`middleware`](Self::middleware) with a
    /// [`Middleware`] type for per-request state.
    pub fn middleware_fn<F, O>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Exchange<'_>, Next) -> O + Send + Sync + 'static,
        O: IntoOutcome + 'static,
    {
        let mw = middleware::from_fn(f);
        self.middleware(name, move || mw.clone())
    }

    /// Registers an action factory for `target@method`. Called once per
    /// request that reaches the action.
    pub fn action<F, A>(mut self, target: &str, method: &str, factory: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Action + 'static,
    {
        self.actions.insert(
            ActionRef::new(target, method),
            Arc::new(move || Box::new(factory()) as Box<dyn Action>),
        );
        self
    }

    /// Registers a function as the action for `target@method`.
    ///
    /// As with [`middleware_fn`](Self::middleware_fn), captured closure state
    /// is shared across requests. Use [`action`](Self::action) for
    /// per-request state.
    pub fn handler(self, target: &str, method: &str, handler: impl Handler) -> Self {
        let action = handler.into_action();
        self.action(target, method, move || action.clone())
    }

    /// Replaces the [`DefaultErrorHandler`].
    pub fn error_handler<F, H>(mut self, factory: F) -> Self
    where
        F: Fn(FailureContext) -> H + Send + Sync + 'static,
        H: ErrorHandler + 'static,
    {
        self.error_handler = Some(Arc::new(move |ctx| Box::new(factory(ctx)) as Box<dyn ErrorHandler>));
        self
    }

    pub fn default_content_type(&self) -> ContentType {
        self.default_content_type
    }

    pub fn make_middleware(&self, name: &str) -> Result<Box<dyn Middleware>, ContainerError> {
        let factory = self.middlewares.get(name)
            .ok_or_else(|| ContainerError::UnknownMiddleware(name.to_owned()))?;
        Ok(factory())
    }

    pub fn make_action(&self, action: &ActionRef) -> Result<Box<dyn Action>, ContainerError> {
        let factory = self.actions.get(action)
            .ok_or_else(|| ContainerError::UnknownAction(action.clone()))?;
        Ok(factory())
    }

    pub fn make_error_handler(&self, ctx: FailureContext) -> Box<dyn ErrorHandler> {
        match &self.error_handler {
            Some(factory) => factory(ctx),
            None => Box::new(DefaultErrorHandler::new(ctx, self.expose_errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::{Method, StatusCode};

    use super::*;
    use crate::error::Failure;
    use crate::exchange::Outcome;
    use crate::request::Request;
    use crate::response::Response;

    struct Counted;

    impl Action for Counted {
        fn call(&mut self, _ex: &mut Exchange<'_>) -> Outcome {
            StatusCode::NO_CONTENT.into_outcome()
        }
    }

    #[test]
    fn factories_run_once_per_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let container = Container::new().action("c", "m", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Counted
        });

        let target = ActionRef::new("c", "m");
        container.make_action(&target).unwrap();
        container.make_action(&target).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn function_handlers_share_captured_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let container = Container::new().handler("c", "m", move |_ex: &mut Exchange<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        });

        let target = ActionRef::new("c", "m");
        for _ in 0..2 {
            let mut req = Request::new(Method::GET, "/");
            let mut ex = Exchange::new(&mut req);
            container.make_action(&target).unwrap().call(&mut ex).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_names_are_errors() {
        let container = Container::new();
        let err = container.make_middleware("auth").err().unwrap();
        assert_eq!(err.to_string(), "no middleware registered as `auth`");

        let err = container.make_action(&ActionRef::new("users", "show")).err().unwrap();
        assert_eq!(err.to_string(), "no action registered as `users@show`");
    }

    #[test]
    fn custom_error_handler_replaces_default() {
        struct Teapot;
        impl ErrorHandler for Teapot {
            fn to_response(&self) -> Response {
                Response::status(StatusCode::IM_A_TEAPOT)
            }
        }

        let container = Container::new().error_handler(|_ctx| Teapot);
        let req = Request::new(Method::GET, "/");
        let ctx = FailureContext::new(Failure::ContractViolation("x".into()), &req);
        assert_eq!(container.make_error_handler(ctx).to_response().status_code(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn config_reaches_the_container() {
        let config: Config = "default_content_type = \"html\"".parse().unwrap();
        let container = Container::new().with_config(&config);
        assert_eq!(container.default_content_type(), ContentType::Html);
    }
}
