//! Built-in health-check handlers.
//!
//! Kubernetes asks two questions. prow answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Readiness is gated on the search-index dependency: the one probe at
//! boot proved it reachable, but it can still go away at runtime, and a
//! pod that cannot search should not receive traffic.

use crate::request::Request;
use crate::response::Response;
use crate::search::SearchClient;

/// Liveness probe handler.
///
/// Always returns `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe handler, bound to the shared search client.
///
/// Pings the dependency: `200 "ready"` when it answers, `503` when it
/// does not.
pub fn readiness(search: SearchClient) -> impl crate::Handler {
    move |_req: Request| {
        let search = search.clone();
        async move {
            match search.ping().await {
                Ok(()) => Response::text("ready"),
                Err(_) => Response::status(503),
            }
        }
    }
}
