//! Cross-origin policy: the origin whitelist and its response headers.
//!
//! The whitelist is an ordered list of regular-expression patterns read
//! once from configuration and compiled once at process start. An empty
//! list means every origin is allowed (wildcard). A malformed pattern is
//! a descriptive startup failure — never a silent per-request one.
//!
//! A disallowed origin is not hard-rejected: browsers enforce CORS, not
//! servers. The response simply carries no permissive headers, and the
//! headers always reflect the actual decision.

use regex::Regex;

use crate::error::Error;
use crate::response::Response;

/// The cross-origin decision for one request, made once per request and
/// applied to whatever response the later stages produce.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CorsDecision {
    /// No whitelist configured: `access-control-allow-origin: *`.
    AllowAny,
    /// Origin matched a pattern: echo it back, with `vary: origin`.
    AllowOrigin(String),
    /// No `Origin` header, or no pattern matched: no CORS headers at all.
    Deny,
}

/// Compiled origin whitelist.
///
/// Read-only after process start, so it is freely shared across concurrent
/// requests without synchronization.
#[derive(Debug)]
pub struct OriginMatcher {
    patterns: Vec<Regex>,
}

impl OriginMatcher {
    /// Compiles the configured patterns. Empty input compiles to the
    /// wildcard matcher.
    ///
    /// A pattern that fails to compile aborts startup with an error naming
    /// the offending entry.
    pub fn compile(whitelist: &[String]) -> Result<Self, Error> {
        let patterns = whitelist
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| Error::Config(format!("invalid CORS pattern `{p}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `origin` may receive a permissive cross-origin response.
    ///
    /// Empty whitelist: always true, whatever the origin looks like.
    /// Otherwise: true iff at least one pattern matches (partial-match
    /// semantics, as with any regex search).
    pub fn allows(&self, origin: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(origin))
    }

    /// Decides the CORS outcome for a request's `Origin` header.
    pub fn decide(&self, origin: Option<&str>) -> CorsDecision {
        if self.patterns.is_empty() {
            return CorsDecision::AllowAny;
        }
        match origin {
            Some(origin) if self.allows(origin) => CorsDecision::AllowOrigin(origin.to_owned()),
            _ => CorsDecision::Deny,
        }
    }
}

impl CorsDecision {
    /// Writes the headers this decision calls for onto `resp`.
    pub fn apply(&self, resp: &mut Response) {
        match self {
            Self::AllowAny => {
                resp.set_header("access-control-allow-origin", "*");
            }
            Self::AllowOrigin(origin) => {
                resp.set_header("access-control-allow-origin", origin.clone());
                resp.set_header("vary", "origin");
            }
            Self::Deny => {}
        }
    }

    /// Answers a preflight `OPTIONS` request directly, skipping dispatch.
    ///
    /// Every preflight gets a 204. A denied origin gets it bare — no CORS
    /// headers at all — and the browser blocks the actual request; the
    /// server never hard-rejects.
    pub fn preflight_response(&self) -> Response {
        let mut resp = Response::status(204);
        if matches!(self, Self::Deny) {
            return resp;
        }
        self.apply(&mut resp);
        resp.set_header(
            "access-control-allow-methods",
            "GET,HEAD,POST,PUT,PATCH,DELETE",
        );
        resp.set_header(
            "access-control-allow-headers",
            "content-type,x-request-id",
        );
        resp.set_header("access-control-max-age", "86400");
        resp
    }
}
