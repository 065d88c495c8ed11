//! Handler return values and their conversion into responses.

use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

/// What a handler or middleware produced.
///
/// Strings are sent as-is; anything else serializable goes out as JSON.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    /// Default `Content-Type` for this body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Reply::Empty => None,
            Reply::Text(_) => Some(TEXT_PLAIN),
            Reply::Json(_) => Some(APPLICATION_JSON),
        }
    }

    pub fn into_body(self) -> Bytes {
        match self {
            Reply::Empty => Bytes::new(),
            Reply::Text(text) => Bytes::from(text),
            Reply::Json(value) => Bytes::from(value.to_string()),
        }
    }

    /// Build the final response. Headers set by the caller win over the
    /// default content type.
    pub fn into_response(self, status: StatusCode, headers: HeaderMap) -> Response<Bytes> {
        let content_type = self.content_type();
        let mut response = Response::new(self.into_body());
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        if let Some(content_type) = content_type {
            response
                .headers_mut()
                .entry(header::CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }
        response
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Text(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Text(value.to_owned())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

/// Plain-text response outside any handler, used for 404/413/500.
pub(crate) fn plain(status: StatusCode, body: &'static str) -> Response<Bytes> {
    Reply::Text(body.to_owned()).into_response(status, HeaderMap::new())
}
