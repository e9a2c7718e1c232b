//! Per-dispatch request snapshot.
//!
//! # Responsibilities
//! - Derive url, path, host, query and content type from the raw descriptor
//! - Parse the body lazily, once, on first access
//! - Carry the parameters captured for the route currently being invoked
//!
//! # Design Decisions
//! - Everything but `params` sits behind one `Arc`, shared by all matched routes
//! - Each matched route gets its own `RequestView` with a fresh `Params`, so
//!   handlers never observe another route's captures
//! - JSON bodies are parsed on demand; a malformed body surfaces as an error
//!   from `body()`, which a handler can propagate with `?`

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::routing::matcher::Params;

/// The request descriptor produced by the I/O layer.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    /// Path plus optional `?query`.
    pub url: String,
    pub headers: HeaderMap,
    /// The fully accumulated body.
    pub body: Bytes,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = header::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Failure to decode a request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
}

struct Shared {
    url: String,
    path: String,
    host: String,
    hostname: String,
    method: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    content_type: String,
    raw_body: Bytes,
    body: OnceLock<Result<Option<Value>, BodyError>>,
}

/// What a handler sees of the inbound request.
#[derive(Clone)]
pub struct RequestView {
    shared: Arc<Shared>,
    params: Params,
}

impl RequestView {
    pub fn from_raw(raw: RawRequest) -> Self {
        let RawRequest {
            method,
            url,
            headers,
            body,
        } = raw;

        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let hostname = host.split(':').next().unwrap_or_default().to_string();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (url.clone(), HashMap::new()),
        };
        let content_type = content_type(&headers);

        Self {
            shared: Arc::new(Shared {
                url,
                path,
                host,
                hostname,
                method,
                query,
                headers,
                content_type,
                raw_body: body,
                body: OnceLock::new(),
            }),
            params: Params::new(),
        }
    }

    /// A view sharing this request's data but carrying `params` instead.
    pub fn with_params(&self, params: Params) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            params,
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn path(&self) -> &str {
        &self.shared.path
    }

    /// Host header value, port included.
    pub fn host(&self) -> &str {
        &self.shared.host
    }

    pub fn hostname(&self) -> &str {
        &self.shared.hostname
    }

    pub fn method(&self) -> &str {
        &self.shared.method
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.shared.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.shared.query.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.shared.headers
    }

    /// Header lookup; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.shared.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Media type without parameters, e.g. `application/json`. Empty if absent.
    pub fn content_type(&self) -> &str {
        &self.shared.content_type
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.shared.raw_body
    }

    /// The decoded body.
    ///
    /// `application/json` decodes as JSON (an empty body is `{}`), `text/plain`
    /// yields the raw string, anything else yields `None`.
    pub fn body(&self) -> Result<Option<&Value>, BodyError> {
        self.shared
            .body
            .get_or_init(|| parse_body(&self.shared.content_type, &self.shared.raw_body))
            .as_ref()
            .map(Option::as_ref)
            .map_err(Clone::clone)
    }
}

impl fmt::Debug for RequestView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestView")
            .field("method", &self.shared.method)
            .field("url", &self.shared.url)
            .field("content_type", &self.shared.content_type)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn parse_body(content_type: &str, raw: &Bytes) -> Result<Option<Value>, BodyError> {
    match content_type {
        "application/json" if raw.is_empty() => Ok(Some(Value::Object(Default::default()))),
        "application/json" => serde_json::from_slice(raw)
            .map(Some)
            .map_err(|e| BodyError::InvalidJson(e.to_string())),
        "text/plain" => Ok(Some(Value::String(
            String::from_utf8_lossy(raw).into_owned(),
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(raw: RawRequest) -> RequestView {
        RequestView::from_raw(raw)
    }

    #[test]
    fn empty_json_body_is_empty_object() {
        let req = view(RawRequest::new("POST", "/").header(header::CONTENT_TYPE, "application/json"));
        assert_eq!(req.body(), Ok(Some(&json!({}))));
    }

    #[test]
    fn json_body_is_decoded() {
        let req = view(
            RawRequest::new("POST", "/")
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(r#"{"a":1}"#),
        );
        assert_eq!(req.content_type(), "application/json");
        assert_eq!(req.body(), Ok(Some(&json!({"a": 1}))));
    }

    #[test]
    fn text_body_passes_through_undecoded() {
        let req = view(
            RawRequest::new("POST", "/")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(r#"{"a":1}"#),
        );
        assert_eq!(req.body(), Ok(Some(&Value::String(r#"{"a":1}"#.into()))));

        let req = view(RawRequest::new("POST", "/").header(header::CONTENT_TYPE, "text/plain").body("hi"));
        assert_eq!(req.body(), Ok(Some(&json!("hi"))));
    }

    #[test]
    fn other_content_types_leave_body_unset() {
        let req = view(
            RawRequest::new("POST", "/")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(vec![0u8, 1, 2]),
        );
        assert_eq!(req.body(), Ok(None));
        assert_eq!(req.raw_body().len(), 3);

        let req = view(RawRequest::new("POST", "/").body("x"));
        assert_eq!(req.content_type(), "");
        assert_eq!(req.body(), Ok(None));
    }

    #[test]
    fn malformed_json_is_an_error_every_time() {
        let req = view(
            RawRequest::new("POST", "/")
                .header(header::CONTENT_TYPE, "application/json")
                .body("{nope"),
        );
        assert!(matches!(req.body(), Err(BodyError::InvalidJson(_))));
        assert!(req.body().is_err());
    }

    #[test]
    fn url_is_split_into_path_and_query() {
        let req = view(RawRequest::new("GET", "/search?q=rust&page=2&q=tokio"));
        assert_eq!(req.url(), "/search?q=rust&page=2&q=tokio");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_param("q"), Some("tokio"));
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.query().len(), 2);
    }

    #[test]
    fn host_and_hostname() {
        let req = view(RawRequest::new("GET", "/").header(header::HOST, "example.com:8080"));
        assert_eq!(req.host(), "example.com:8080");
        assert_eq!(req.hostname(), "example.com");

        let req = view(RawRequest::new("GET", "/"));
        assert_eq!(req.host(), "");
        assert_eq!(req.hostname(), "");
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = view(RawRequest::new("GET", "/").header(header::HeaderName::from_static("x-trace"), "abc"));
        assert_eq!(req.header("X-Trace"), Some("abc"));
        assert_eq!(req.header("x-trace"), Some("abc"));
    }

    #[test]
    fn params_are_isolated_per_view() {
        let base = view(RawRequest::new("GET", "/users/42"));

        let mut first = Params::new();
        first.insert("id", "42");
        let a = base.with_params(first);

        let mut second = Params::new();
        second.insert("user", "42");
        let b = base.with_params(second);

        assert_eq!(a.param("id"), Some("42"));
        assert_eq!(a.param("user"), None);
        assert_eq!(b.param("user"), Some("42"));
        assert_eq!(b.param("id"), None);
        assert!(base.params().is_empty());
    }
}
