//! Incoming HTTP request type, decoded body, and per-request context.
//!
//! A [`Request`] is handed to a route handler only after the pipeline has
//! decoded its body and attached a [`RequestContext`]. Handlers therefore
//! never see raw transport details — by the time they run, identity and
//! body shape are settled.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};
use tracing::{Span, info_span};

use crate::error::RouteError;

// ── Request context ───────────────────────────────────────────────────────────

/// Per-request identity and logging handle.
///
/// Created once per inbound request, dropped when the response is sent.
/// The span carries the request id, so every log line emitted inside it is
/// correlated without any global state.
#[derive(Clone, Debug)]
pub struct RequestContext {
    request_id: String,
    span: Span,
}

impl RequestContext {
    pub fn new(request_id: String) -> Self {
        let span = info_span!("request", request_id = %request_id);
        Self { request_id, span }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The logging span bound to this request. Enter it (or instrument a
    /// future with it) so log lines carry the request id.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

// ── Decoded body ──────────────────────────────────────────────────────────────

/// The request body after pipeline decoding.
///
/// JSON and url-encoded forms are decoded eagerly; anything else is kept
/// as raw bytes for the handler to interpret.
#[derive(Clone, Debug)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Form(HashMap<String, String>),
    Raw(Bytes),
}

impl Body {
    /// Decodes raw bytes according to the request's content type.
    ///
    /// A malformed JSON or form body is a 400-class [`RouteError`] — the
    /// request never reaches route dispatch.
    pub fn decode(content_type: Option<&str>, bytes: Bytes) -> Result<Self, RouteError> {
        if bytes.is_empty() {
            return Ok(Self::Empty);
        }
        match content_type {
            Some(ct) if ct.starts_with("application/json") => {
                serde_json::from_slice(&bytes)
                    .map(Self::Json)
                    .map_err(|e| RouteError::bad_request(format!("Malformed JSON body: {e}")))
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                serde_urlencoded::from_bytes(&bytes)
                    .map(Self::Form)
                    .map_err(|e| RouteError::bad_request(format!("Malformed form body: {e}")))
            }
            _ => Ok(Self::Raw(bytes)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// An incoming HTTP request as seen by a route handler.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Body,
    params: HashMap<String, String>,
    ctx: RequestContext,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Body,
        params: HashMap<String, String>,
        ctx: RequestContext,
    ) -> Self {
        Self { method, path, headers, body, params, ctx }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup; non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The decoded JSON body, if there is one.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The decoded url-encoded form body, if there is one.
    pub fn form(&self) -> Option<&HashMap<String, String>> {
        match &self.body {
            Body::Form(m) => Some(m),
            _ => None,
        }
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/documents/{id}`, `req.param("id")` on `/documents/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn request_id(&self) -> &str {
        self.ctx.request_id()
    }
}
