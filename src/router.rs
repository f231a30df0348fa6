//! Radix-tree route table.
//!
//! One tree per HTTP method, O(path-length) lookup. A matched [`Route`] names
//! the action to run and the middlewares to run before it. It does not hold
//! them: instances come from the [`Container`](crate::Container), fresh for
//! every request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

/// Path parameters extracted by a match, by name.
pub type Params = HashMap<String, String>;

/// Names an action registered in the container: a target plus one of its
/// methods, written `target@method`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ActionRef {
    pub target: String,
    pub method: String,
}

impl ActionRef {
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self { target: target.into(), method: method.into() }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.target, self.method)
    }
}

/// A registered route: what to run, and what runs in front of it.
///
/// ```rust
/// use strand::Route;
///
/// let route = Route::to("users", "show")
///     .middleware("trace")
///     .middleware("auth");
/// assert_eq!(route.middlewares(), ["trace", "auth"]);
/// ```
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    pattern: String,
    action: ActionRef,
    middlewares: Vec<String>,
}

impl Route {
    pub fn to(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            pattern: String::new(),
            action: ActionRef::new(target, method),
            middlewares: Vec::new(),
        }
    }

    /// Appends a middleware. Middlewares run in the order they are added.
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middlewares.push(name.into());
        self
    }

    pub fn action(&self) -> &ActionRef { &self.action }
    pub fn middlewares(&self) -> &[String] { &self.middlewares }

    /// HTTP method the route was registered under.
    pub fn method(&self) -> &Method { &self.method }

    /// Path pattern the route was registered under, e.g. `/users/{id}`.
    pub fn pattern(&self) -> &str { &self.pattern }
}

/// The application route table.
///
/// Build it once at startup and hand it to a [`Resolver`](crate::Resolver).
/// Each registration returns `self` so calls chain naturally.
///
/// ```rust
/// use http::Method;
/// use strand::{Route, Router};
///
/// let routes = Router::new()
///     .get("/users/{id}", Route::to("users", "show").middleware("auth"))
///     .on(Method::DELETE, "/users/{id}", Route::to("users", "destroy"));
/// ```
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a route for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    /// Route tables are built at startup, so this fails fast.
    pub fn on(mut self, method: Method, path: &str, mut route: Route) -> Self {
        route.method = method.clone();
        route.pattern = path.to_owned();
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(route))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, route: Route) -> Self { self.on(Method::GET, path, route) }
    pub fn post(self, path: &str, route: Route) -> Self { self.on(Method::POST, path, route) }
    pub fn put(self, path: &str, route: Route) -> Self { self.on(Method::PUT, path, route) }
    pub fn patch(self, path: &str, route: Route) -> Self { self.on(Method::PATCH, path, route) }
    pub fn delete(self, path: &str, route: Route) -> Self { self.on(Method::DELETE, path, route) }

    /// Finds the route for `method` + `path`.
    ///
    /// A miss yields `None` with empty params; the resolver turns that into a
    /// not-found failure.
    pub fn lookup(&self, method: &Method, path: &str) -> (Option<Arc<Route>>, Params) {
        let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) else {
            return (None, Params::new());
        };
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        (Some(Arc::clone(matched.value)), params)
    }
}
