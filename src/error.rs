//! Error types: infrastructure failures and the route-error normalizer.
//!
//! Two worlds, kept apart on purpose:
//!
//! - [`Error`] — infrastructure failures (bind, config, unreachable
//!   dependency). These surface in `main` and are allowed to stop the
//!   process.
//! - [`RouteError`] — anything a request can fail with. These never stop
//!   the process: the pipeline's terminal stage normalizes every one of
//!   them into the stable JSON envelope
//!   `{"statusCode": <int>, "error": "<string>"}`.
//!
//! Routes report failure through a typed [`ErrorKind`], not by message
//! text. The kind carries the status code, so normalization is total:
//! every `RouteError` maps to a valid envelope, and anything without a
//! more specific kind lands on `{500, "Internal Server Error"}`.

use std::fmt;

use serde::Serialize;

use crate::response::Response;

// ── Infrastructure errors ─────────────────────────────────────────────────────

/// The error type for prow's fallible infrastructure operations.
///
/// Request-level failures are expressed as [`RouteError`] values, not as
/// `Error`s. This type surfaces what can go wrong before or outside a
/// request: binding the port, reading configuration, reaching the
/// search-index dependency at boot.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure: bind or accept.
    Io(std::io::Error),
    /// Invalid configuration value, named so the operator can fix it.
    Config(String),
    /// The search-index dependency could not be reached or refused us.
    Dependency(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Dependency(msg) => write!(f, "dependency: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Route errors ──────────────────────────────────────────────────────────────

/// What went wrong with a request, as a closed set of kinds.
///
/// Each kind owns its status code. Routes pick the kind; nothing downstream
/// ever interprets message text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    BadRequest,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    Conflict,            // 409
    UnprocessableEntity, // 422
    Internal,            // 500
}

impl ErrorKind {
    /// The HTTP status code this kind maps to.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest          => 400,
            Self::Unauthorized        => 401,
            Self::Forbidden           => 403,
            Self::NotFound            => 404,
            Self::Conflict            => 409,
            Self::UnprocessableEntity => 422,
            Self::Internal            => 500,
        }
    }
}

/// A failure raised by body decoding, route dispatch, or a handler.
///
/// The message is what the client sees in the envelope's `error` field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteError {
    kind: ErrorKind,
    message: String,
}

impl RouteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnprocessableEntity, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// The stable error envelope returned to clients, whatever failed inside.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalized {
    pub status_code: u16,
    pub error: String,
}

/// The canned body written when envelope serialization itself fails.
/// Kept as a literal so this path cannot fail in turn.
const FALLBACK_BODY: &[u8] = br#"{"statusCode":500,"error":"Internal Server Error"}"#;

impl Normalized {
    /// The blanket fallback: `{500, "Internal Server Error"}`.
    pub fn fallback() -> Self {
        Self { status_code: 500, error: "Internal Server Error".to_owned() }
    }

    /// Converts the envelope into an HTTP response.
    ///
    /// Serialization of this struct cannot realistically fail, but the
    /// contract is that the client always gets *an* envelope — so a failed
    /// serialization substitutes [`FALLBACK_BODY`] rather than propagating.
    pub fn into_response(self) -> Response {
        let status = self.status_code;
        match serde_json::to_vec(&self) {
            Ok(body) => Response::builder().status(status).json(body),
            Err(_) => Response::builder().status(500).json(FALLBACK_BODY.to_vec()),
        }
    }
}

/// Maps any route error to its envelope. Total: every input produces a
/// valid `{statusCode, error}` pair.
pub fn normalize(err: &RouteError) -> Normalized {
    Normalized {
        status_code: err.kind().status_code(),
        error: err.message().to_owned(),
    }
}
