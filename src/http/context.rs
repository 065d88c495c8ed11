//! Per-request context.
//!
//! # Responsibilities
//! - Expose the request: method, path, headers, query, params, body
//! - Collect the response status and headers set by middleware and handlers
//! - Carry a free-form state bag between middleware layers
//! - Track the lifecycle phase of the request
//!
//! # Design Decisions
//! - Created fresh per request, never pooled
//! - Request parts are read-only; only the response side and state mutate
//! - State is split into JSON values keyed by string and typed extensions

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{
    request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::reply::Reply;
use crate::observability::logging::Logger;
use crate::routing::Params;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Received,
    Matched,
    MiddlewareRunning,
    HandlerRunning,
    ResponseReady,
    Faulted,
}

/// Parsed query string, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self(pairs)
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Values shared between middleware layers and the handler.
#[derive(Debug, Default)]
pub struct State {
    values: HashMap<String, Value>,
    extensions: Extensions,
}

impl State {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Decode a stored value into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store a typed value. One slot per type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    pub fn typed<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn typed_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut::<T>()
    }
}

/// The mutable object threaded through middleware and handler.
pub struct Context {
    parts: Parts,
    body: Bytes,
    query: Query,
    params: Params,
    status: StatusCode,
    response_headers: HeaderMap,
    state: State,
    logger: Logger,
    phase: Phase,
    trust_proxy: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.parts.method)
            .field("path", &self.parts.uri.path())
            .field("params", &self.params)
            .field("status", &self.status)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(request: Request<Bytes>, logger: Logger) -> Self {
        let (parts, body) = request.into_parts();
        let query = Query::parse(parts.uri.query());
        Self {
            parts,
            body,
            query,
            params: Params::default(),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            state: State::default(),
            logger,
            phase: Phase::Received,
            trust_proxy: false,
        }
    }

    pub(crate) fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn take_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.response_headers)
    }

    /// Raw request parts.
    pub fn request(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.parts.headers.contains_key(name)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the request body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Set a response header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::try_from(name)
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        self.response_headers.insert(name, value);
        Ok(self)
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Serialize `value` as the JSON reply.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Reply> {
        Reply::json(value)
    }

    pub fn text(&self, body: impl Into<String>) -> Reply {
        Reply::Text(body.into())
    }

    /// Address of the client.
    ///
    /// With `trust_proxy` the first `X-Forwarded-For` entry wins; otherwise the
    /// peer address recorded by the listener is used.
    pub fn client_ip(&self) -> Option<IpAddr> {
        if self.trust_proxy {
            let forwarded = self
                .header("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }

        self.parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn context(request: Request<Bytes>) -> Context {
        Context::new(request, Logger::new("TEST"))
    }

    fn get(uri: &str) -> Request<Bytes> {
        Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_request_view() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/items?tag=a&tag=b&page=2")
            .header("x-api-key", "secret")
            .body(Bytes::new())
            .unwrap();
        let ctx = context(request);

        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/items");
        assert_eq!(ctx.header("x-api-key"), Some("secret"));
        assert!(!ctx.has_header("authorization"));
        assert_eq!(ctx.query().get("page"), Some("2"));
        assert_eq!(ctx.query().get_all("tag").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(ctx.phase(), Phase::Received);
    }

    #[test]
    fn test_body_json() {
        #[derive(Deserialize)]
        struct NewUser {
            name: String,
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/users")
            .body(Bytes::from_static(br#"{"name":"ada"}"#))
            .unwrap();
        let ctx = context(request);
        let user: NewUser = ctx.body_json().unwrap();
        assert_eq!(user.name, "ada");

        let bad = context(get("/users"));
        assert!(matches!(bad.body_json::<NewUser>(), Err(Error::Json(_))));
    }

    #[test]
    fn test_response_side() {
        let mut ctx = context(get("/"));
        ctx.set_status(StatusCode::CREATED);
        ctx.set_header("x-powered-by", "strata").unwrap();
        assert!(matches!(
            ctx.set_header("bad header", "x"),
            Err(Error::InvalidHeader(_))
        ));

        assert_eq!(ctx.status(), StatusCode::CREATED);
        assert_eq!(ctx.response_headers()["x-powered-by"], "strata");
    }

    #[test]
    fn test_state_bag() {
        #[derive(Clone, Debug, PartialEq)]
        struct UserId(u64);

        let mut ctx = context(get("/"));
        ctx.state_mut().set("user", json!({ "name": "ada" }));
        ctx.state_mut().set("count", 3);
        ctx.state_mut().insert(UserId(9));

        assert_eq!(ctx.state().get("user").unwrap()["name"], "ada");
        assert_eq!(ctx.state().get_as::<u32>("count"), Some(3));
        assert_eq!(ctx.state().typed::<UserId>(), Some(&UserId(9)));
        assert!(ctx.state_mut().remove("user").is_some());
        assert!(!ctx.state().contains("user"));
    }

    #[test]
    fn test_client_ip() {
        let peer: SocketAddr = "127.0.0.1:5555".parse().unwrap();
        let forwarded = || {
            let mut request = Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(Bytes::new())
                .unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
            request
        };

        let direct = context(forwarded());
        assert_eq!(direct.client_ip(), Some(peer.ip()));

        let proxied = context(forwarded()).with_trust_proxy(true);
        assert_eq!(proxied.client_ip(), "203.0.113.7".parse().ok());
    }
}
