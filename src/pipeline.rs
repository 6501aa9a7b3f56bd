//! The request pipeline: every request flows through these stages, in this
//! order, exactly once.
//!
//! 1. Baseline security headers — side effect only, never rejects.
//! 2. Request id — fresh UUID, echoed as `x-request-id`.
//! 3. Body decoding — malformed JSON/form bodies fail with 400 here,
//!    before route dispatch.
//! 4. Static assets — a hit responds directly and skips every later stage.
//! 5. Cross-origin policy — headers reflect the matcher's decision;
//!    disallowed origins are not hard-rejected.
//! 6. Request context — id + logging span attached.
//! 7. Route dispatch — opaque handlers that succeed or return a
//!    [`RouteError`].
//! 8. Error normalization — every failure becomes the stable
//!    `{statusCode, error}` envelope; nothing escapes to crash the process.
//!
//! The access log line is emitted last, best-effort, when console logging
//! is enabled.

use std::net::SocketAddr;
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use http::Method;
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::assets::AssetDir;
use crate::cors::OriginMatcher;
use crate::error::{RouteError, normalize};
use crate::request::{Body, Request, RequestContext};
use crate::response::Response;
use crate::router::Router;

/// Baseline hardening headers, applied to every response the pipeline
/// produces — errors and static assets included.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-xss-protection", "0"),
];

/// Everything the pipeline needs, assembled once at startup and shared
/// read-only across all in-flight requests.
pub struct App {
    router: Router,
    origins: OriginMatcher,
    assets: AssetDir,
    console_log: bool,
}

impl App {
    pub fn new(router: Router, origins: OriginMatcher, assets: AssetDir) -> Self {
        Self { router, origins, assets, console_log: true }
    }

    /// Enables or disables the per-request access log.
    pub fn console_log(mut self, enabled: bool) -> Self {
        self.console_log = enabled;
        self
    }
}

/// Processes one request through the stages. Always returns a response —
/// failures are normalized, never propagated.
///
/// `body` arrives as a `Result` so that transport failures while reading
/// it (client gone mid-upload, broken chunking) fail at stage 3 like any
/// malformed body — hardened, correlatable, and access-logged.
pub(crate) async fn handle(
    app: &App,
    parts: http::request::Parts,
    body: Result<Bytes, RouteError>,
    remote_addr: SocketAddr,
) -> Response {
    let started = Instant::now();

    // Stage 2: identity first, so even decode failures are correlatable.
    let request_id = Uuid::new_v4().to_string();

    let mut response = respond(app, &parts, body, &request_id).await;

    // Stages 1 + 2, response side: applied to every outcome uniformly.
    for (name, value) in SECURITY_HEADERS {
        response.set_header(name, *value);
    }
    response.set_header("x-request-id", request_id.clone());

    if app.console_log {
        let line = format_access_line(
            SystemTime::now(),
            &request_id,
            &parts,
            started.elapsed().as_secs_f64() * 1000.0,
            remote_addr,
            response.status_code(),
        );
        info!(target: "access", "{line}");
    }

    response
}

/// Stages 3–8: everything that can short-circuit or fail.
async fn respond(
    app: &App,
    parts: &http::request::Parts,
    body: Result<Bytes, RouteError>,
    request_id: &str,
) -> Response {
    let path = parts.uri.path().to_owned();
    let ctx = RequestContext::new(request_id.to_owned());

    // Stage 3: body decoding. A body that failed in transport or failed to
    // parse never reaches dispatch.
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let body = match body.and_then(|bytes| Body::decode(content_type, bytes)) {
        Ok(body) => body,
        Err(err) => return fail(&ctx, err),
    };

    // Stage 4: static assets. A hit is terminal — no CORS evaluation, no
    // dispatch, exactly as if the file were the whole application.
    if let Some(resp) = app.assets.serve(&parts.method, &path).await {
        return resp;
    }

    // Stage 5: cross-origin policy.
    let origin = parts
        .headers
        .get(http::header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let cors = app.origins.decide(origin);
    if parts.method == Method::OPTIONS
        && origin.is_some()
        && parts.headers.contains_key("access-control-request-method")
    {
        return cors.preflight_response();
    }

    // Stage 7: dispatch (stage 6, the context, rides along in the request).
    let outcome = match app.router.lookup(&parts.method, &path) {
        Some((handler, params)) => {
            let span = ctx.span().clone();
            let req = Request::new(
                parts.method.clone(),
                path,
                parts.headers.clone(),
                body,
                params,
                ctx.clone(),
            );
            handler.call(req).instrument(span).await
        }
        None => Err(RouteError::not_found("Not Found")),
    };

    // Stage 8: error normalization.
    let mut response = match outcome {
        Ok(resp) => resp,
        Err(err) => fail(&ctx, err),
    };
    cors.apply(&mut response);
    response
}

/// Terminal error stage: logs through the request's span and produces the
/// normalized envelope.
fn fail(ctx: &RequestContext, err: RouteError) -> Response {
    let normalized = normalize(&err);
    ctx.span().in_scope(|| {
        error!(
            status = normalized.status_code,
            error = %normalized.error,
            "API Error"
        );
    });
    normalized.into_response()
}

/// One access-log line per completed request:
///
/// ```text
/// <date> <requestId> <method> <url> <response-time>ms <remote-addr> - <remote-user> "HTTP/<version>" "<referrer>" <status>
/// ```
fn format_access_line(
    now: SystemTime,
    request_id: &str,
    parts: &http::request::Parts,
    elapsed_ms: f64,
    remote_addr: SocketAddr,
    status: u16,
) -> String {
    let referrer = parts
        .headers
        .get(http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    format!(
        "{date} {request_id} {method} {url} {elapsed_ms:.3}ms {remote_addr} - - \"HTTP/{version}\" \"{referrer}\" {status}",
        date = httpdate::fmt_http_date(now),
        method = parts.method,
        url = parts.uri,
        version = version_str(parts.version),
    )
}

fn version_str(version: http::Version) -> &'static str {
    match version {
        http::Version::HTTP_09 => "0.9",
        http::Version::HTTP_10 => "1.0",
        http::Version::HTTP_11 => "1.1",
        http::Version::HTTP_2 => "2.0",
        http::Version::HTTP_3 => "3.0",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;
    use crate::handler::RouteResult;
    use std::io::Write;

    fn test_app(whitelist: &[&str]) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("logo.svg"))
            .unwrap()
            .write_all(b"<svg/>")
            .unwrap();

        async fn echo(req: Request) -> Response {
            Response::json(format!(r#"{{"path":"{}"}}"#, req.path()).into_bytes())
        }
        async fn missing(_req: Request) -> RouteResult {
            Err(RouteError::not_found("Resource not found"))
        }
        async fn boom(_req: Request) -> RouteResult {
            Err(RouteError::internal("boom"))
        }

        let router = Router::new()
            .get("/echo", echo)
            .get("/missing", missing)
            .post("/echo", echo)
            .get("/boom", boom);
        let whitelist: Vec<String> = whitelist.iter().map(|s| (*s).to_owned()).collect();
        let origins = OriginMatcher::compile(&whitelist).unwrap();
        let app = App::new(router, origins, AssetDir::new(dir.path())).console_log(false);
        (dir, app)
    }

    fn parts(method: Method, uri: &str, headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn remote() -> SocketAddr {
        "127.0.0.1:51234".parse().unwrap()
    }

    #[tokio::test]
    async fn successful_dispatch_returns_the_handler_response() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(&app, parts(Method::GET, "/echo", &[]), Ok(Bytes::new()), remote()).await;
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.body(), br#"{"path":"/echo"}"#);
    }

    #[tokio::test]
    async fn every_response_carries_security_headers_and_a_request_id() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(&app, parts(Method::GET, "/echo", &[]), Ok(Bytes::new()), remote()).await;
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
        assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
        assert!(resp.header("x-request-id").is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn request_ids_are_unique_per_request() {
        let (_dir, app) = test_app(&[]);
        let a = handle(&app, parts(Method::GET, "/echo", &[]), Ok(Bytes::new()), remote()).await;
        let b = handle(&app, parts(Method::GET, "/echo", &[]), Ok(Bytes::new()), remote()).await;
        assert_ne!(a.header("x-request-id"), b.header("x-request-id"));
    }

    #[tokio::test]
    async fn route_error_is_normalized_into_the_envelope() {
        let (_dir, app) = test_app(&[]);
        let resp =
            handle(&app, parts(Method::GET, "/missing", &[]), Ok(Bytes::new()), remote()).await;
        assert_eq!(resp.status_code(), 404);
        assert_eq!(resp.body(), br#"{"statusCode":404,"error":"Resource not found"}"#);
    }

    #[tokio::test]
    async fn unknown_route_is_a_normalized_404() {
        let (_dir, app) = test_app(&[]);
        let resp =
            handle(&app, parts(Method::GET, "/nowhere", &[]), Ok(Bytes::new()), remote()).await;
        assert_eq!(resp.status_code(), 404);
        assert_eq!(resp.body(), br#"{"statusCode":404,"error":"Not Found"}"#);
    }

    #[tokio::test]
    async fn internal_error_maps_to_500() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(&app, parts(Method::GET, "/boom", &[]), Ok(Bytes::new()), remote()).await;
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.body(), br#"{"statusCode":500,"error":"boom"}"#);
    }

    #[tokio::test]
    async fn malformed_json_body_fails_before_dispatch() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(
            &app,
            parts(Method::POST, "/echo", &[("content-type", "application/json")]),
            Ok(Bytes::from_static(b"{broken")),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 400);
        // The 400 is still hardened and correlatable.
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
        assert!(resp.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn body_read_failure_still_flows_through_the_pipeline() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(
            &app,
            parts(Method::POST, "/echo", &[]),
            Err(RouteError::bad_request(
                "Failed to read request body: connection reset",
            )),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 400);
        assert_eq!(
            resp.body(),
            br#"{"statusCode":400,"error":"Failed to read request body: connection reset"}"#
        );
        // Transport failures get the same hardening and correlation as any
        // other outcome.
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
        assert!(resp.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn static_hit_short_circuits_dispatch_and_cors() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(
            &app,
            parts(Method::GET, "/logo.svg", &[("origin", "https://app.test")]),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.body(), b"<svg/>");
        assert_eq!(resp.header("content-type"), Some("image/svg+xml"));
        // Static responses never carry CORS headers: the asset stage runs
        // before origin evaluation.
        assert_eq!(resp.header("access-control-allow-origin"), None);
        // But they are still hardened.
        assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
    }

    #[tokio::test]
    async fn wildcard_cors_sets_star_on_route_responses() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(
            &app,
            parts(Method::GET, "/echo", &[("origin", "https://anywhere.test")]),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn whitelisted_origin_is_echoed_and_others_are_not() {
        let (_dir, app) = test_app(&[r"^https://app\.test$"]);

        let allowed = handle(
            &app,
            parts(Method::GET, "/echo", &[("origin", "https://app.test")]),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(
            allowed.header("access-control-allow-origin"),
            Some("https://app.test")
        );
        assert_eq!(allowed.header("vary"), Some("origin"));

        let denied = handle(
            &app,
            parts(Method::GET, "/echo", &[("origin", "https://evil.test")]),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(denied.status_code(), 200, "denied origins are not hard-rejected");
        assert_eq!(denied.header("access-control-allow-origin"), None);
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_is_answered_directly() {
        let (_dir, app) = test_app(&[r"^https://app\.test$"]);
        let resp = handle(
            &app,
            parts(
                Method::OPTIONS,
                "/echo",
                &[
                    ("origin", "https://app.test"),
                    ("access-control-request-method", "POST"),
                ],
            ),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 204);
        assert_eq!(
            resp.header("access-control-allow-origin"),
            Some("https://app.test")
        );
        assert!(resp.header("access-control-allow-methods").is_some());
    }

    #[tokio::test]
    async fn preflight_from_denied_origin_is_a_bare_204() {
        let (_dir, app) = test_app(&[r"^https://app\.test$"]);
        let resp = handle(
            &app,
            parts(
                Method::OPTIONS,
                "/echo",
                &[
                    ("origin", "https://evil.test"),
                    ("access-control-request-method", "POST"),
                ],
            ),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 204);
        assert_eq!(resp.header("access-control-allow-origin"), None);
        assert_eq!(resp.header("access-control-allow-methods"), None);
        // The hardening stage still runs on the direct answer.
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
    }

    #[tokio::test]
    async fn normalized_errors_also_carry_cors_headers() {
        let (_dir, app) = test_app(&[]);
        let resp = handle(
            &app,
            parts(Method::GET, "/missing", &[("origin", "https://app.test")]),
            Ok(Bytes::new()),
            remote(),
        )
        .await;
        assert_eq!(resp.status_code(), 404);
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
    }

    #[test]
    fn access_line_matches_the_documented_format() {
        let parts = parts(
            Method::GET,
            "/search?q=rust",
            &[("referer", "https://app.test/page")],
        );
        let line = format_access_line(
            SystemTime::UNIX_EPOCH,
            "req-1",
            &parts,
            12.5,
            remote(),
            200,
        );
        assert_eq!(
            line,
            "Thu, 01 Jan 1970 00:00:00 GMT req-1 GET /search?q=rust 12.500ms \
             127.0.0.1:51234 - - \"HTTP/1.1\" \"https://app.test/page\" 200"
        );
    }

    #[test]
    fn access_line_uses_dash_for_missing_referrer() {
        let parts = parts(Method::GET, "/", &[]);
        let line =
            format_access_line(SystemTime::UNIX_EPOCH, "req-2", &parts, 0.0, remote(), 404);
        assert!(line.ends_with("\"HTTP/1.1\" \"-\" 404"), "line was: {line}");
        assert!(line.contains("req-2"));
    }
}
