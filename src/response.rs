//! Outgoing HTTP response type and content negotiation.
//!
//! A request owns exactly one [`Response`] while its chain runs. Actions and
//! middlewares can either build a fresh one and return it, or return a raw
//! [`Body`] and let the resolver pour it into the in-flight response.

use bytes::Bytes;
use http::StatusCode;
use http::header::{HeaderName, HeaderValue};
use http_body_util::Full;
use serde::Deserialize;
use tracing::warn;

use crate::request::Request;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types strand can negotiate and encode.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    MsgPack,      // application/msgpack
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    /// Types [`Body`] can be encoded as, in tie-break order for wildcard
    /// ranges such as `text/*`. The rest must be set explicitly.
    const NEGOTIABLE: [ContentType; 4] = [Self::Text, Self::Html, Self::Json, Self::OctetStream];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::MsgPack     => "application/msgpack",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }

    /// The bare `type/subtype`, without parameters.
    fn essence(self) -> &'static str {
        let s = self.as_str();
        s.split(';').next().unwrap_or(s)
    }

    fn matches_range(self, range: &str) -> bool {
        let essence = self.essence();
        match range.strip_suffix("/*") {
            Some(main) => essence.split('/').next() == Some(main),
            None => essence.eq_ignore_ascii_case(range),
        }
    }

    /// Pick the best content type for an `Accept` header value.
    ///
    /// Media ranges are ordered by q-value (stable for ties). Only text,
    /// HTML, JSON and octet-stream are ever chosen. `*/*`, an empty header,
    /// or a header naming only types we cannot produce all yield `None`,
    /// leaving the choice to the caller's default.
    pub fn negotiate(accept: &str) -> Option<Self> {
        let mut ranges: Vec<(&str, f32)> = accept.split(',')
            .filter_map(|item| {
                let mut parts = item.split(';').map(str::trim);
                let range = parts.next().filter(|r| !r.is_empty())?;
                let q = parts
                    .find_map(|p| p.strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((range, q))
            })
            .filter(|&(_, q)| q > 0.0)
            .collect();
        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranges.into_iter()
            .take_while(|&(range, _)| range != "*/*")
            .find_map(|(range, _)| Self::NEGOTIABLE.into_iter().find(|ct| ct.matches_range(range)))
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// A raw response body, before it has been placed into a [`Response`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl Body {
    /// The content type this body implies when nothing else decided one.
    fn natural_content_type(&self) -> Option<ContentType> {
        match self {
            Self::Empty    => None,
            Self::Text(_)  => Some(ContentType::Text),
            Self::Json(_)  => Some(ContentType::Json),
            Self::Bytes(_) => Some(ContentType::OctetStream),
        }
    }

    /// Encodes the body for the wire under the given content type. Text
    /// placed into a JSON response is encoded as a JSON string.
    fn encode(self, content_type: Option<ContentType>) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Text(text) if content_type == Some(ContentType::Json) => {
                serde_json::to_vec(&text).map(Bytes::from).unwrap_or_default()
            }
            Self::Text(text) => Bytes::from(text),
            Self::Json(value) => serde_json::to_vec(&value).map(Bytes::from).unwrap_or_default(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Body {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<serde_json::Value> for Body {
    fn from(v: serde_json::Value) -> Self { Self::Json(v) }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self { Self::Bytes(b) }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self { Self::Bytes(Bytes::from(b)) }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use strand::{Body, ContentType, Response};
/// use http::StatusCode;
///
/// Response::text("hello");
/// Response::json(serde_json::json!({ "id": 1 }));
/// Response::status(StatusCode::NO_CONTENT);
///
/// let mut res = Response::default();
/// res.set_content_type(ContentType::Xml)
///     .header("location", "/users/42")
///     .set_body(Body::from("<ok/>"));
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    content_type: Option<ContentType>,
    explicit_content_type: bool,
    negotiated: bool,
    body: Body,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(value: serde_json::Value) -> Self {
        Self::with_type(ContentType::Json, Body::Json(value))
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_type(ContentType::Text, Body::Text(body.into()))
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, ..Self::default() }
    }

    fn with_type(content_type: ContentType, body: Body) -> Self {
        Self {
            content_type: Some(content_type),
            explicit_content_type: true,
            body,
            ..Self::default()
        }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Body { &self.body }
    pub fn content_type(&self) -> Option<ContentType> { self.content_type }

    /// Whether [`negotiate_content_type`](Self::negotiate_content_type) has
    /// run on this response.
    pub fn is_negotiated(&self) -> bool { self.negotiated }

    pub fn set_status(&mut self, code: StatusCode) -> &mut Self {
        self.status = code;
        self
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Fixes the content type. Negotiation will not override it.
    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = Some(content_type);
        self.explicit_content_type = true;
        self
    }

    /// Chooses a content type from the request's `Accept` header, falling
    /// back to `default` when nothing acceptable is known.
    ///
    /// Runs at most once per response and never touches a content type that
    /// was set explicitly.
    pub fn negotiate_content_type(&mut self, req: &Request, default: ContentType) -> &mut Self {
        if self.negotiated || self.explicit_content_type {
            return self;
        }
        self.negotiated = true;
        self.content_type = Some(
            req.header("accept")
                .and_then(ContentType::negotiate)
                .unwrap_or(default),
        );
        self
    }

    /// Places a raw body into this response. A body that implies its own
    /// content type only applies it when nothing was chosen before.
    pub fn set_body(&mut self, body: Body) -> &mut Self {
        if self.content_type.is_none() {
            self.content_type = body.natural_content_type();
        }
        self.body = body;
        self
    }

    /// Converts into the `http` representation hyper writes to the wire.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let content_type = self.content_type.filter(|_| self.body != Body::Empty);
        let bytes = self.body.encode(content_type);

        let mut res = http::Response::new(Full::new(bytes));
        *res.status_mut() = self.status;

        let headers = res.headers_mut();
        if let Some(ct) = content_type {
            headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(ct.as_str()));
        }
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => { headers.append(name, value); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn accepting(accept: &str) -> Request {
        Request::new(Method::GET, "/").with_header("accept", accept)
    }

    #[test]
    fn negotiate_prefers_highest_quality() {
        assert_eq!(ContentType::negotiate("text/html;q=0.5, application/json"), Some(ContentType::Json));
        assert_eq!(ContentType::negotiate("text/*"), Some(ContentType::Text));
        assert_eq!(ContentType::negotiate("application/*"), Some(ContentType::Json));
    }

    #[test]
    fn negotiate_skips_types_bodies_cannot_be_encoded_as() {
        for accept in ["application/xml", "application/msgpack", "application/pdf", "text/csv", "text/event-stream"] {
            assert_eq!(ContentType::negotiate(accept), None, "{accept}");
        }
        assert_eq!(
            ContentType::negotiate("application/xml, text/html;q=0.4"),
            Some(ContentType::Html)
        );
    }

    #[test]
    fn negotiate_defers_on_wildcards_and_unknowns() {
        assert_eq!(ContentType::negotiate("*/*"), None);
        assert_eq!(ContentType::negotiate("image/png"), None);
        assert_eq!(ContentType::negotiate(""), None);
        assert_eq!(ContentType::negotiate("application/json;q=0"), None);
    }

    #[test]
    fn negotiation_uses_default_without_accept() {
        let mut res = Response::default();
        res.negotiate_content_type(&Request::new(Method::GET, "/"), ContentType::Html);
        assert_eq!(res.content_type(), Some(ContentType::Html));
        assert!(res.is_negotiated());
    }

    #[test]
    fn negotiation_keeps_explicit_content_type() {
        let mut res = Response::default();
        res.set_content_type(ContentType::Xml);
        res.negotiate_content_type(&accepting("application/json"), ContentType::Text);
        assert_eq!(res.content_type(), Some(ContentType::Xml));
        assert!(!res.is_negotiated());
    }

    #[test]
    fn negotiation_runs_once() {
        let mut res = Response::default();
        res.negotiate_content_type(&accepting("application/json"), ContentType::Text);
        res.negotiate_content_type(&accepting("text/html"), ContentType::Text);
        assert_eq!(res.content_type(), Some(ContentType::Json));
    }

    #[test]
    fn set_body_infers_type_only_when_undecided() {
        let mut res = Response::default();
        res.set_body(Body::from("hi"));
        assert_eq!(res.content_type(), Some(ContentType::Text));

        let mut res = Response::default();
        res.negotiate_content_type(&accepting("application/json"), ContentType::Text);
        res.set_body(Body::from("hi"));
        assert_eq!(res.content_type(), Some(ContentType::Json));
    }

    #[test]
    fn text_under_json_is_encoded_as_string() {
        let mut res = Response::default();
        res.set_content_type(ContentType::Json).set_body(Body::from("Hello"));
        let inner = res.into_inner();
        assert_eq!(inner.headers()["content-type"], "application/json");

        let encoded = Body::from("Hello").encode(Some(ContentType::Json));
        assert_eq!(encoded, Bytes::from_static(b"\"Hello\""));
    }

    #[test]
    fn into_inner_carries_status_and_headers() {
        let mut res = Response::status(StatusCode::CREATED);
        res.header("location", "/users/42").header("bad header", "x");
        let inner = res.into_inner();
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.headers()["location"], "/users/42");
        assert!(inner.headers().get("content-type").is_none());
        assert_eq!(inner.headers().len(), 1);
    }

    #[test]
    fn empty_bodies_carry_no_content_type() {
        let mut res = Response::default();
        res.negotiate_content_type(&accepting("application/json"), ContentType::Text)
            .set_status(StatusCode::NO_CONTENT);
        assert_eq!(res.content_type(), Some(ContentType::Json));
        assert!(res.into_inner().headers().get("content-type").is_none());
    }
}
