//! Static asset serving from a fixed public root.
//!
//! A hit short-circuits the pipeline: the file is the response and no
//! later stage runs. A miss returns `None` and the request continues to
//! route dispatch. Only GET and HEAD can match — other methods fall
//! through untouched.
//!
//! Path handling is deliberately strict: traversal segments (`..`) and
//! hidden segments (leading `.`) never resolve, whatever the filesystem
//! contains.

use std::path::{Component, Path, PathBuf};

use http::Method;

use crate::response::Response;

/// The static asset root. Cheap to clone; read-only after startup.
#[derive(Clone, Debug)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Attempts to serve `path` from the asset root.
    ///
    /// Returns `None` when the path does not resolve to a file, so the
    /// pipeline can continue. An I/O failure on an existing file yields a
    /// 500 response rather than a miss — the asset exists, we just could
    /// not read it.
    pub async fn serve(&self, method: &Method, path: &str) -> Option<Response> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }

        let relative = sanitize(path)?;
        let full = self.root.join(&relative);

        let meta = tokio::fs::metadata(&full).await.ok()?;
        if !meta.is_file() {
            return None;
        }

        let content_type = content_type_for(&full);
        match tokio::fs::read(&full).await {
            Ok(bytes) => {
                let body = if method == Method::HEAD { Vec::new() } else { bytes };
                Some(Response::builder().bytes(content_type, body))
            }
            Err(e) => {
                tracing::error!(path = %full.display(), "failed to read static asset: {e}");
                Some(Response::status(500))
            }
        }
    }
}

/// Maps a request path to a relative filesystem path, or `None` if the
/// path must not be served.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let trimmed = if trimmed.is_empty() { "index.html" } else { trimmed };

    let candidate = Path::new(trimmed);
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(seg) => {
                // Hidden files and directories stay hidden.
                if seg.to_str().is_some_and(|s| s.starts_with('.')) {
                    return None;
                }
                clean.push(seg);
            }
            // `..`, `/`, `C:\` and friends: refuse rather than resolve.
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(clean)
}

/// Content type by file extension; unknown extensions are served as
/// opaque bytes.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("wasm") => "application/wasm",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture() -> (tempfile::TempDir, AssetDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("app.js")).unwrap();
        f.write_all(b"console.log('hi');").unwrap();
        std::fs::File::create(dir.path().join("index.html"))
            .unwrap()
            .write_all(b"<html></html>")
            .unwrap();
        std::fs::File::create(dir.path().join(".secret")).unwrap();
        let assets = AssetDir::new(dir.path());
        (dir, assets)
    }

    #[tokio::test]
    async fn serves_an_existing_file_with_its_content_type() {
        let (_dir, assets) = fixture();
        let resp = assets.serve(&Method::GET, "/app.js").await.unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.header("content-type"), Some("text/javascript; charset=utf-8"));
        assert_eq!(resp.body(), b"console.log('hi');");
    }

    #[tokio::test]
    async fn root_path_serves_index_html() {
        let (_dir, assets) = fixture();
        let resp = assets.serve(&Method::GET, "/").await.unwrap();
        assert_eq!(resp.body(), b"<html></html>");
    }

    #[tokio::test]
    async fn head_request_omits_the_body() {
        let (_dir, assets) = fixture();
        let resp = assets.serve(&Method::HEAD, "/app.js").await.unwrap();
        assert_eq!(resp.status_code(), 200);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn misses_return_none() {
        let (_dir, assets) = fixture();
        assert!(assets.serve(&Method::GET, "/missing.css").await.is_none());
    }

    #[tokio::test]
    async fn non_get_methods_never_match() {
        let (_dir, assets) = fixture();
        assert!(assets.serve(&Method::POST, "/app.js").await.is_none());
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let (_dir, assets) = fixture();
        assert!(assets.serve(&Method::GET, "/../etc/passwd").await.is_none());
        assert!(assets.serve(&Method::GET, "/a/../../b").await.is_none());
    }

    #[tokio::test]
    async fn hidden_files_are_never_served() {
        let (_dir, assets) = fixture();
        assert!(assets.serve(&Method::GET, "/.secret").await.is_none());
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type_for(Path::new("x.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("x.svg")), "image/svg+xml");
    }
}
