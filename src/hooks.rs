//! Request hook API
//!
//! Sites customize the server by implementing [`Hooks`]. The server invokes
//! the hooks at fixed points, in this order for every request:
//!
//! 1. [`Hooks::pre_request`] - before any routing (e.g. IP bans)
//! 2. [`Hooks::on_request`] - custom routes; `Some` short-circuits the
//!    built-in static file handler
//! 3. [`Hooks::set_headers`] - last-word header edits before the response
//!    is sent
//! 4. [`Hooks::read_custom`] - transforms file bytes after disk read and
//!    before caching (only on the static file path)
//! 5. [`Hooks::post_request`] - after the response is built, for logging
//!
//! All methods have no-op defaults, so an implementation only overrides the
//! points it cares about.

use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Response};
use http_body_util::Full;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;

/// Verdict of the pre-request hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Proceed with normal request handling
    Continue,
    /// Reject the request with 403 Forbidden
    Deny,
}

/// Request facts handed to the hooks
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// HTTP version string ("1.0", "1.1")
    pub version: String,
    pub peer: SocketAddr,
    /// True when the request arrived over the TLS listener
    pub secure: bool,
    pub host: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Arrival timestamp, for latency accounting in access logs
    pub received_at: Instant,
}

impl RequestInfo {
    /// Host header if present, otherwise the given fallback hostname
    #[must_use]
    pub fn host_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.host.as_deref().unwrap_or(fallback)
    }
}

/// A response produced by [`Hooks::on_request`]
pub struct Handled {
    pub response: Response<Full<Bytes>>,
    /// Suppress the access log entry for this request
    pub quiet: bool,
    /// Optional label appended to the access log line (e.g. "HTTPS Redirect")
    pub log_label: Option<&'static str>,
}

impl Handled {
    #[must_use]
    pub const fn new(response: Response<Full<Bytes>>) -> Self {
        Self {
            response,
            quiet: false,
            log_label: None,
        }
    }

    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    #[must_use]
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.log_label = Some(label);
        self
    }
}

impl From<Response<Full<Bytes>>> for Handled {
    fn from(response: Response<Full<Bytes>>) -> Self {
        Self::new(response)
    }
}

/// Response facts handed to the post-request hook
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    /// Body bytes sent (0 for HEAD responses)
    pub body_bytes: usize,
    /// Set when the handler asked for no access log entry
    pub quiet: bool,
    pub log_label: Option<&'static str>,
}

/// Per-request extension points, invoked in a fixed order
pub trait Hooks: Send + Sync {
    /// Called before any routing. Return [`HookAction::Deny`] to reject the
    /// request with 403.
    fn pre_request(&self, _peer: SocketAddr, _method: &Method, _path: &str) -> HookAction {
        HookAction::Continue
    }

    /// Custom request handling. Returning `Some` skips the static file
    /// handler; `None` lets the server serve the request.
    fn on_request(&self, _req: &RequestInfo) -> Option<Handled> {
        None
    }

    /// Edit response headers just before a response is sent. Runs after the
    /// response is built, so inserted headers win.
    fn set_headers(&self, _req: &RequestInfo, _headers: &mut HeaderMap) {}

    /// Transform file bytes read from the web root before they are cached
    /// and served (e.g. minification, templating). Default is identity.
    fn read_custom(&self, _path: &Path, data: Vec<u8>) -> Vec<u8> {
        data
    }

    /// Called once per completed request, after the response is built.
    fn post_request(&self, _req: &RequestInfo, _res: &ResponseInfo) {}
}

/// No-op hooks, used when a server runs without site customization
pub struct NoHooks;

impl Hooks for NoHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_default_hooks_are_noops() {
        let hooks = NoHooks;
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(
            hooks.pre_request(peer, &Method::GET, "/"),
            HookAction::Continue
        );
        let req = RequestInfo {
            method: Method::GET,
            path: "/".to_string(),
            query: None,
            version: "1.1".to_string(),
            peer,
            secure: false,
            host: None,
            referer: None,
            user_agent: None,
            received_at: Instant::now(),
        };
        assert!(hooks.on_request(&req).is_none());
        let data = hooks.read_custom(Path::new("a.txt"), vec![1, 2, 3]);
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn test_handled_builders() {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let handled = Handled::new(resp).quiet().with_label("test");
        assert!(handled.quiet);
        assert_eq!(handled.log_label, Some("test"));
    }

    #[test]
    fn test_host_or_fallback() {
        let peer: SocketAddr = "127.0.0.1:1024".parse().unwrap();
        let mut req = RequestInfo {
            method: Method::GET,
            path: "/".to_string(),
            query: None,
            version: "1.1".to_string(),
            peer,
            secure: false,
            host: None,
            referer: None,
            user_agent: None,
            received_at: Instant::now(),
        };
        assert_eq!(req.host_or("example.com"), "example.com");
        req.host = Some("other.net".to_string());
        assert_eq!(req.host_or("example.com"), "other.net");
    }
}
