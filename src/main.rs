//! Process entrypoint: config, bootstrap protocol, serve loop.
//!
//! Bootstrap ordering matters and is encoded here, not in the library:
//!
//! 1. Logging and configuration (bad config is fatal).
//! 2. Open the listening socket.
//! 3. Probe the search-index dependency — unreachable is fatal: the
//!    service must not run while unable to reach its only dependency.
//! 4. Fire the best-effort ensure-index task; it races with request
//!    serving and only logs its outcome.
//! 5. Serve until graceful shutdown.

use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use prow::{
    App, AssetDir, Config, Error, OriginMatcher, Router, SearchClient, Server, health,
    spawn_ensure_index,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let cfg = Config::from_env()?;
    let origins = OriginMatcher::compile(&cfg.cors_whitelist)?;

    // Socket first: the bootstrap protocol probes the dependency with the
    // listener already open.
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listening = Server::bind(addr).listen().await?;

    // Liveness probe — the one fatal runtime condition. The `?` surfaces
    // the failure to `main`, which logs it once and exits non-zero.
    let search = SearchClient::connect(&cfg.search_url, &cfg.search_index).await?;

    // Best-effort, fire-and-forget. Requests may be served before this
    // completes; its failure is logged and nothing more.
    spawn_ensure_index(search.clone());

    let app = App::new(routes(search), origins, AssetDir::new(&cfg.public_dir))
        .console_log(cfg.console_log);

    info!("App started on port {}", cfg.port);
    listening.serve(app).await
}

fn routes(search: SearchClient) -> Router {
    Router::new()
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness(search))
}
