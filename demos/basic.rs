//! Minimal strand example: a small user API behind a middleware chain.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'authorization: Bearer t' http://localhost:3000/users/42
//!   curl -H 'authorization: Bearer t' -H 'accept: text/plain' http://localhost:3000/users/42
//!   curl -X POST -H 'authorization: Bearer t' http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/nowhere

use http::StatusCode;
use strand::middleware::Trace;
use strand::{
    Action, Container, Exchange, HttpError, Next, Outcome, Resolver, Response, Route, Router,
    Server,
};

#[tokio::main]
async fn main() -> Result<(), strand::Error> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => strand::Config::load(path)?,
        None => strand::Config::default(),
    };

    let routes = Router::new()
        .get("/healthz", Route::to("health", "live"))
        .get("/users/{id}", Route::to("users", "show").middleware("trace").middleware("auth"))
        .post("/users", Route::to("users", "store").middleware("trace").middleware("auth"))
        .delete("/users/{id}", Route::to("users", "destroy").middleware("trace").middleware("auth"));

    let container = Container::new()
        .with_config(&config)
        .middleware("trace", Trace::default)
        .middleware_fn("auth", require_token)
        .handler("health", "live", |_ex: &mut Exchange<'_>| "ok")
        .handler("users", "show", show_user)
        .action("users", "store", StoreUser::default)
        .handler("users", "destroy", |_ex: &mut Exchange<'_>| StatusCode::NO_CONTENT);

    Server::from_config(&config)?
        .serve(Resolver::new(routes, container))
        .await
}

// Short-circuits with 401 unless an authorization header is present.
fn require_token(ex: &mut Exchange<'_>, next: Next) -> Outcome {
    if ex.request.header("authorization").is_none() {
        return Err(HttpError::unauthorized().into());
    }
    ex.response.header("x-authenticated", "1");
    next.run(ex)
}

// GET /users/{id} returns a raw JSON value; the resolver wraps it into the
// negotiated response.
fn show_user(ex: &mut Exchange<'_>) -> Result<serde_json::Value, HttpError> {
    let id = ex.request.param("id").ok_or_else(HttpError::not_found)?;
    Ok(serde_json::json!({ "id": id, "name": "alice" }))
}

// POST /users builds its own response instead of returning a body.
#[derive(Default)]
struct StoreUser;

impl Action for StoreUser {
    fn call(&mut self, ex: &mut Exchange<'_>) -> Outcome {
        let input: serde_json::Value = serde_json::from_slice(ex.request.body())
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        let mut res = Response::json(serde_json::json!({ "id": "99", "name": input["name"] }));
        res.set_status(StatusCode::CREATED).header("location", "/users/99");
        Ok(res.into())
    }
}
