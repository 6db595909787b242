//! Static file serving module
//!
//! Resolves request paths inside the web root, fetches content through the
//! file cache, and builds conditional (ETag) and partial (Range) responses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::filecache::CachedFile;
use crate::hooks::RequestInfo;
use crate::http::range::RangeOutcome;
use crate::http::{self, cache};
use crate::logger;

/// Serve a request path from the web root
pub async fn serve(
    info: &RequestInfo,
    is_head: bool,
    if_none_match: Option<&str>,
    range_header: Option<&str>,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(fs_path) = resolve_path(
        &state.config.server.web_root,
        &info.path,
        &state.config.routes.index_files,
    ) else {
        return http::build_404_response();
    };

    let file = match state.cache.get(&fs_path, &state.hooks).await {
        Ok(Some(file)) => file,
        Ok(None) => return http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                fs_path.display()
            ));
            return http::build_404_response();
        }
    };

    build_file_response(&file, if_none_match, range_header, is_head)
}

/// Resolve a request path to a file inside the web root.
///
/// Rejects `..` segments outright, then canonicalizes and verifies the
/// result is still contained in the web root. Directory paths fall back
/// to the configured index files.
pub fn resolve_path(web_root: &str, request_path: &str, index_files: &[String]) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.split('/').any(|seg| seg == "..") {
        logger::log_warning(&format!("Path traversal attempt blocked: {request_path}"));
        return None;
    }

    let root = match Path::new(web_root).canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Web root not found or inaccessible '{web_root}': {e}"
            ));
            return None;
        }
    };

    let mut candidate = root.join(relative);

    if candidate.is_dir() || relative.is_empty() || relative.ends_with('/') {
        candidate = index_files
            .iter()
            .map(|index| candidate.join(index))
            .find(|p| p.is_file())?;
    }

    // Missing files are a plain 404, not worth a log line
    let canonical = candidate.canonicalize().ok()?;
    if !canonical.starts_with(&root) {
        logger::log_warning(&format!(
            "Path escape blocked: {} -> {}",
            request_path,
            canonical.display()
        ));
        return None;
    }

    Some(canonical)
}

/// Build the response for a cached file: 304, 206, 416, or full 200
fn build_file_response(
    file: &CachedFile,
    if_none_match: Option<&str>,
    range_header: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    if cache::etag_matches(if_none_match, &file.etag) {
        return http::build_304_response(&file.etag);
    }

    let total_size = file.len();
    match http::parse_range_header(range_header, total_size) {
        RangeOutcome::Satisfiable(range) => {
            let start = range.start;
            let end = range.end_position(total_size);
            let body = if is_head {
                Bytes::new()
            } else {
                file.data.slice(start..=end)
            };
            return http::response::build_partial_response(
                body,
                file.content_type,
                &file.etag,
                start,
                end,
                total_size,
                is_head,
            );
        }
        RangeOutcome::Unsatisfiable => return http::build_416_response(total_size),
        RangeOutcome::Ignored => {}
    }

    http::response::build_content_response(
        file.data.clone(),
        file.content_type,
        &file.etag,
        is_head,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filecache::FileCache;
    use crate::hooks::NoHooks;
    use hyper::Method;
    use std::io::Write;
    use std::net::SocketAddr;
    use std::time::Instant;

    fn temp_web_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("blitz-static-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, content: &[u8]) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    fn test_state(web_root: &Path) -> Arc<AppState> {
        let mut config = Config::load_from("nonexistent-config").unwrap();
        config.server.web_root = web_root.to_str().unwrap().to_string();
        Arc::new(AppState::new(
            config,
            Arc::new(NoHooks),
            FileCache::new(1024 * 1024),
        ))
    }

    fn request(path: &str) -> RequestInfo {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        RequestInfo {
            method: Method::GET,
            path: path.to_string(),
            query: None,
            version: "1.1".to_string(),
            peer,
            secure: false,
            host: None,
            referer: None,
            user_agent: None,
            received_at: Instant::now(),
        }
    }

    #[test]
    fn test_resolve_rejects_dotdot() {
        let root = temp_web_root("dotdot");
        write_file(&root, "ok.txt", b"ok");
        let index = vec!["index.html".to_string()];
        assert!(resolve_path(root.to_str().unwrap(), "/../etc/passwd", &index).is_none());
        assert!(resolve_path(root.to_str().unwrap(), "/a/../../b", &index).is_none());
        assert!(resolve_path(root.to_str().unwrap(), "/ok.txt", &index).is_some());
    }

    #[test]
    fn test_resolve_directory_uses_index() {
        let root = temp_web_root("index");
        write_file(&root, "index.html", b"<html></html>");
        let index = vec!["index.html".to_string()];
        let resolved = resolve_path(root.to_str().unwrap(), "/", &index).unwrap();
        assert!(resolved.ends_with("index.html"));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let root = temp_web_root("missing");
        let index = vec!["index.html".to_string()];
        assert!(resolve_path(root.to_str().unwrap(), "/nope.txt", &index).is_none());
    }

    #[tokio::test]
    async fn test_serve_full_file() {
        let root = temp_web_root("full");
        write_file(&root, "hello.txt", b"hello world");
        let state = test_state(&root);

        let resp = serve(&request("/hello.txt"), false, None, None, &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Length"], "11");
        assert_eq!(resp.headers()["Accept-Ranges"], "bytes");
        assert!(resp.headers().contains_key("ETag"));
    }

    #[tokio::test]
    async fn test_serve_missing_is_404() {
        let root = temp_web_root("notfound");
        let state = test_state(&root);
        let resp = serve(&request("/gone.txt"), false, None, None, &state).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_serve_conditional_304() {
        let root = temp_web_root("cond");
        write_file(&root, "a.css", b"body{}");
        let state = test_state(&root);

        let first = serve(&request("/a.css"), false, None, None, &state).await;
        let etag = first.headers()["ETag"].to_str().unwrap().to_string();

        let second = serve(&request("/a.css"), false, Some(&etag), None, &state).await;
        assert_eq!(second.status(), 304);
    }

    #[tokio::test]
    async fn test_serve_range() {
        let root = temp_web_root("range");
        write_file(&root, "data.bin", b"0123456789");
        let state = test_state(&root);

        let resp = serve(&request("/data.bin"), false, None, Some("bytes=2-5"), &state).await;
        assert_eq!(resp.status(), 206);
        assert_eq!(resp.headers()["Content-Range"], "bytes 2-5/10");
        assert_eq!(resp.headers()["Content-Length"], "4");

        let resp = serve(&request("/data.bin"), false, None, Some("bytes=50-"), &state).await;
        assert_eq!(resp.status(), 416);
    }

    #[tokio::test]
    async fn test_serve_suffix_range_on_empty_file_is_416() {
        let root = temp_web_root("empty-range");
        write_file(&root, "empty.txt", b"");
        let state = test_state(&root);

        let resp = serve(&request("/empty.txt"), false, None, Some("bytes=-1"), &state).await;
        assert_eq!(resp.status(), 416);
        assert_eq!(resp.headers()["Content-Range"], "bytes */0");

        // No Range header on an empty file is still a plain 200
        let resp = serve(&request("/empty.txt"), false, None, None, &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Length"], "0");
    }

    #[tokio::test]
    async fn test_serve_head_has_headers_no_body() {
        let root = temp_web_root("head");
        write_file(&root, "page.html", b"<html>hi</html>");
        let state = test_state(&root);

        let resp = serve(&request("/page.html"), true, None, None, &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Length"], "15");
    }
}
