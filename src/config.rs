//! Process configuration, read once from the environment at start.
//!
//! Every knob has a default so the binary runs out of the box against a
//! local search index. Values are parsed eagerly: a bad port or boolean is
//! a startup failure, not a latent per-request one.

use std::env;

use crate::error::Error;

/// All configuration the process consumes. Immutable after startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listening TCP port (`PROW_PORT`).
    pub port: u16,
    /// Whether the per-request access log is emitted (`PROW_CONSOLE_LOG`).
    pub console_log: bool,
    /// Origin whitelist patterns (`PROW_CORS_WHITELIST`, comma-separated).
    /// Empty means every origin is allowed.
    pub cors_whitelist: Vec<String>,
    /// Static asset root (`PROW_PUBLIC_DIR`).
    pub public_dir: String,
    /// Base URL of the search-index service (`PROW_SEARCH_URL`).
    pub search_url: String,
    /// Name of the index the service expects (`PROW_SEARCH_INDEX`).
    pub search_index: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// The actual parsing, factored over a lookup function so tests don't
    /// have to mutate process-global environment state.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let port = match get("PROW_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PROW_PORT is not a valid port: `{raw}`")))?,
            None => 3000,
        };

        let console_log = match get("PROW_CONSOLE_LOG") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| Error::Config(format!("PROW_CONSOLE_LOG is not a boolean: `{raw}`")))?,
            None => true,
        };

        let cors_whitelist = match get("PROW_CORS_WHITELIST") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            port,
            console_log,
            cors_whitelist,
            public_dir: get("PROW_PUBLIC_DIR").unwrap_or_else(|| "public".to_owned()),
            search_url: get("PROW_SEARCH_URL")
                .unwrap_or_else(|| "http://127.0.0.1:9200".to_owned()),
            search_index: get("PROW_SEARCH_INDEX").unwrap_or_else(|| "documents".to_owned()),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
