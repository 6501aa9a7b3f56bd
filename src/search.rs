//! Search-index dependency client.
//!
//! One shared handle, cloned freely: [`reqwest::Client`] is internally
//! reference-counted, so every clone is cheap and every operation is safe
//! to invoke concurrently from in-flight requests and the bootstrap task.
//!
//! Two lifecycle operations, with deliberately different failure policies:
//!
//! - [`SearchClient::connect`] — liveness probe, **fatal** at boot. A
//!   service that cannot reach its only dependency must not accept traffic
//!   it cannot serve.
//! - [`SearchClient::ensure_index`] — **best-effort**, run detached via
//!   [`spawn_ensure_index`]. A missing index is a data-plane problem that
//!   can be repaired without a restart, so its failure is logged and
//!   nothing more.

use std::time::Duration;

use tracing::{error, info};

use crate::error::Error;

/// Client for the search-index service the routes ultimately query.
#[derive(Clone, Debug)]
pub struct SearchClient {
    http: reqwest::Client,
    base: String,
    index: String,
}

impl SearchClient {
    /// Constructs the client and probes the dependency once.
    ///
    /// Any transport failure or non-success answer is an
    /// [`Error::Dependency`]; the caller decides that this is fatal.
    pub async fn connect(base_url: &str, index: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Dependency(format!("failed to build http client: {e}")))?;
        let client = Self {
            http,
            base: base_url.trim_end_matches('/').to_owned(),
            index: index.to_owned(),
        };
        client.ping().await?;
        Ok(client)
    }

    /// Liveness probe: one round-trip to the service root.
    pub async fn ping(&self) -> Result<(), Error> {
        let resp = self
            .http
            .get(format!("{}/", self.base))
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("search index unreachable: {e}")))?;
        resp.error_for_status()
            .map_err(|e| Error::Dependency(format!("search index unhealthy: {e}")))?;
        Ok(())
    }

    /// The name of the index this service expects.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Ensures the expected index exists. Idempotent: an index that is
    /// already there — found by the HEAD probe or reported by a racing
    /// PUT — still counts as success.
    pub async fn ensure_index(&self) -> Result<(), Error> {
        let url = self.index_url();

        let head = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("index probe failed: {e}")))?;
        if head.status().is_success() {
            return Ok(());
        }

        let put = self
            .http
            .put(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("index creation failed: {e}")))?;
        let status = put.status();
        if status.is_success() {
            return Ok(());
        }

        let body = put.text().await.unwrap_or_default();
        if already_exists(status.as_u16(), &body) {
            // Someone else created it between our HEAD and PUT.
            return Ok(());
        }
        Err(Error::Dependency(format!(
            "index creation returned {status}: {body}"
        )))
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base, self.index)
    }
}

/// Whether a failed index-creation answer means the index is already
/// present — the one "failure" that is actually success.
fn already_exists(status: u16, body: &str) -> bool {
    status == 400 && body.contains("resource_already_exists_exception")
}

/// Fires the ensure-index call on a detached task. Completion is observed
/// only for logging; there is no channel back into request serving and no
/// retry.
pub fn spawn_ensure_index(client: SearchClient) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match client.ensure_index().await {
            Ok(()) => info!(index = %client.index(), "search index ensured"),
            Err(e) => error!(index = %client.index(), "failed to ensure search index: {e}"),
        }
    })
}
