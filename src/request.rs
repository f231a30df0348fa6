//! Incoming HTTP request type.

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use http_body_util::BodyExt;

use crate::router::{Params, Route};

/// An incoming HTTP request.
///
/// Before routing it carries only what the client sent. Once the resolver
/// has matched a route it also carries that [`Route`] and the extracted path
/// parameters, so every middleware and the action can read them.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: Params,
    pub(crate) route: Option<Arc<Route>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            params: Params::new(),
            route: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Buffers a hyper request into a [`Request`].
    pub(crate) async fn from_http<B>(req: http::Request<B>) -> Result<Self, B::Error>
    where
        B: hyper::body::Body,
    {
        let (parts, body) = req.into_parts();
        let headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        let body = body.collect().await?.to_bytes();

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers,
            body,
            params: Params::new(),
            route: None,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &Params { &self.params }

    /// The route this request was matched to, once resolution has started.
    pub fn route(&self) -> Option<&Route> { self.route.as_deref() }

    pub fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub fn set_route_params(&mut self, params: Params) {
        self.params = params;
    }
}
