//! # prow
//!
//! The HTTP front door of a search-index service. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Every inbound request flows through one fixed pipeline: baseline
//! security headers, a fresh request id, body decoding, static assets,
//! cross-origin policy, per-request logging context, route dispatch, and a
//! terminal error stage that turns *any* failure into the stable JSON
//! envelope `{"statusCode": <int>, "error": "<string>"}`. Nothing escapes
//! a request to crash the process.
//!
//! Bootstrap is equally opinionated: the listening socket opens first,
//! then the search-index dependency is probed once — unreachable means the
//! process exits non-zero rather than accept traffic it cannot serve —
//! and an idempotent "ensure index" call is fired on a detached task that
//! only ever logs its outcome.
//!
//! What nginx / ingress already owns — prow intentionally ignores:
//!
//! - **Body-size limits** — `client_max_body_size` in nginx
//! - **Rate limiting** — `limit_req` / ingress-nginx annotations
//! - **Slow-client protection** — nginx timeout and buffer settings
//! - **TLS termination** — nginx SSL / k8s ingress
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use prow::{App, AssetDir, OriginMatcher, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new().get("/documents/{id}", get_document);
//!     let origins = OriginMatcher::compile(&[]).unwrap();
//!     let app = App::new(router, origins, AssetDir::new("public"));
//!
//!     let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
//!     let listening = Server::bind(addr).listen().await.unwrap();
//!     listening.serve(app).await.unwrap();
//! }
//!
//! async fn get_document(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod assets;
mod config;
mod cors;
mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod router;
mod search;
mod server;

pub mod health;

pub use assets::AssetDir;
pub use config::Config;
pub use cors::{CorsDecision, OriginMatcher};
pub use error::{Error, ErrorKind, Normalized, RouteError, normalize};
pub use handler::{Handler, IntoResponse, RouteResult};
pub use pipeline::App;
pub use request::{Body, Request, RequestContext};
pub use response::{Response, ResponseBuilder};
pub use router::Router;
pub use search::{SearchClient, spawn_ensure_index};
pub use server::{Listening, Server};
