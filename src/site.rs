//! Default site hooks
//!
//! The site-specific wiring: the plain-HTTP to HTTPS redirect, the `/ping`
//! and `/makemeacoffee` routes, the cache-header policy, and access
//! logging. Everything here goes through the public [`Hooks`] API, so a
//! deployment can swap in its own implementation without touching the
//! server core.

use hyper::{HeaderMap, StatusCode};

use crate::config::Config;
use crate::hooks::{Handled, Hooks, RequestInfo, ResponseInfo};
use crate::http;
use crate::http::cache::CachePolicy;
use crate::logger::{self, AccessLogEntry, LogFormat};

const TEAPOT_BODY: &str =
    "Apologies, the server was unable to brew your coffee, because it is not a coffee machine.";

/// Path prefix whose responses never get a cache header
const UNCACHED_PREFIX: &str = "/logs";

pub struct SiteHooks {
    tls_enabled: bool,
    https_port: u16,
    hostname: String,
    access_log: bool,
    log_format: LogFormat,
}

impl SiteHooks {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            tls_enabled: config.tls_enabled(),
            https_port: config.server.https_port,
            hostname: config.server.hostname.clone(),
            access_log: config.logging.access_log,
            log_format: LogFormat::parse(&config.logging.access_log_format),
        }
    }

    /// Build the HTTPS equivalent of a plain-HTTP request URL.
    ///
    /// The Host header (sans port) is preferred over the configured
    /// hostname; a non-standard HTTPS port is made explicit.
    fn redirect_target(&self, req: &RequestInfo) -> String {
        let host = strip_port(req.host_or(&self.hostname));
        let mut target = String::from("https://");
        target.push_str(host);
        if self.https_port != 443 {
            target.push_str(&format!(":{}", self.https_port));
        }
        target.push_str(&req.path);
        if let Some(query) = &req.query {
            target.push('?');
            target.push_str(query);
        }
        target
    }
}

impl Hooks for SiteHooks {
    fn on_request(&self, req: &RequestInfo) -> Option<Handled> {
        // HTTPS auto-redirect: anything arriving over plain HTTP moves to
        // the TLS listener, with a fixed-length body and a closed connection
        if self.tls_enabled && !req.secure {
            let response = http::build_redirect_308(&self.redirect_target(req));
            return Some(Handled::new(response).with_label("HTTPS Redirect"));
        }

        match req.path.as_str() {
            "/ping" => {
                let body = format!("{}\nPing OK", crate::SERVER_VERSION);
                // Fixed-length, connection closed, and not access-logged
                let response = http::build_text_response(StatusCode::OK, body, true);
                Some(Handled::new(response).quiet())
            }
            "/makemeacoffee" => {
                let response =
                    http::build_text_response(StatusCode::IM_A_TEAPOT, TEAPOT_BODY, false);
                Some(Handled::new(response))
            }
            _ => None,
        }
    }

    fn set_headers(&self, req: &RequestInfo, headers: &mut HeaderMap) {
        if req.path.starts_with(UNCACHED_PREFIX) {
            return;
        }
        if let Ok(value) = CachePolicy::Private(3600).header_value().parse() {
            headers.insert("Cache-Control", value);
        }
    }

    fn post_request(&self, req: &RequestInfo, res: &ResponseInfo) {
        if res.quiet || !self.access_log {
            return;
        }

        let mut entry = AccessLogEntry::new(
            req.peer.ip().to_string(),
            req.method.to_string(),
            req.path.clone(),
        );
        entry.query = req.query.clone();
        entry.http_version = req.version.clone();
        entry.status = res.status;
        entry.body_bytes = res.body_bytes;
        entry.referer = req.referer.clone();
        entry.user_agent = req.user_agent.clone();
        entry.request_time_us =
            u64::try_from(req.received_at.elapsed().as_micros()).unwrap_or(u64::MAX);

        logger::log_access(&entry, &self.log_format, res.log_label);
    }
}

/// Drop a `:port` suffix from a Host header value, leaving IPv6 literals
/// (`[::1]`) intact
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(v6, _)| &host[..=v6.len()]);
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;
    use std::net::SocketAddr;
    use std::time::Instant;

    fn config_with_tls(https_port: u16) -> Config {
        let mut config = Config::load_from("nonexistent-config").unwrap();
        config.server.https_port = https_port;
        config.server.hostname = "example.com".to_string();
        config
    }

    fn request(path: &str, secure: bool, host: Option<&str>) -> RequestInfo {
        let peer: SocketAddr = "10.0.0.1:50000".parse().unwrap();
        RequestInfo {
            method: Method::GET,
            path: path.to_string(),
            query: None,
            version: "1.1".to_string(),
            peer,
            secure,
            host: host.map(ToString::to_string),
            referer: None,
            user_agent: None,
            received_at: Instant::now(),
        }
    }

    #[test]
    fn test_ping_route() {
        let hooks = SiteHooks::new(&config_with_tls(0));
        let handled = hooks.on_request(&request("/ping", false, None)).unwrap();
        assert!(handled.quiet);
        assert_eq!(handled.response.status(), 200);
        assert_eq!(handled.response.headers()["Connection"], "close");
        // Fixed-length reply: Content-Length present means no chunked encoding
        assert!(handled.response.headers().contains_key("Content-Length"));
    }

    #[test]
    fn test_teapot_route() {
        let hooks = SiteHooks::new(&config_with_tls(0));
        let handled = hooks
            .on_request(&request("/makemeacoffee", false, None))
            .unwrap();
        assert_eq!(handled.response.status(), 418);
        assert!(!handled.quiet);
    }

    #[test]
    fn test_unknown_path_falls_through() {
        let hooks = SiteHooks::new(&config_with_tls(0));
        assert!(hooks.on_request(&request("/other", false, None)).is_none());
    }

    #[test]
    fn test_https_redirect_when_insecure() {
        let hooks = SiteHooks::new(&config_with_tls(443));
        let handled = hooks
            .on_request(&request("/a/b", false, Some("example.com")))
            .unwrap();
        assert_eq!(handled.response.status(), 308);
        assert_eq!(
            handled.response.headers()["Location"],
            "https://example.com/a/b"
        );
        assert_eq!(handled.log_label, Some("HTTPS Redirect"));
    }

    #[test]
    fn test_https_redirect_nonstandard_port_and_query() {
        let hooks = SiteHooks::new(&config_with_tls(8443));
        let mut req = request("/a", false, Some("example.com:8080"));
        req.query = Some("x=1".to_string());
        let handled = hooks.on_request(&req).unwrap();
        assert_eq!(
            handled.response.headers()["Location"],
            "https://example.com:8443/a?x=1"
        );
    }

    #[test]
    fn test_no_redirect_over_tls() {
        let hooks = SiteHooks::new(&config_with_tls(443));
        // Secure requests skip the redirect and reach the routes
        let handled = hooks.on_request(&request("/ping", true, None)).unwrap();
        assert_eq!(handled.response.status(), 200);
        assert!(hooks.on_request(&request("/other", true, None)).is_none());
    }

    #[test]
    fn test_redirect_falls_back_to_configured_hostname() {
        let hooks = SiteHooks::new(&config_with_tls(443));
        let handled = hooks.on_request(&request("/x", false, None)).unwrap();
        assert_eq!(
            handled.response.headers()["Location"],
            "https://example.com/x"
        );
    }

    #[test]
    fn test_cache_header_policy() {
        let hooks = SiteHooks::new(&config_with_tls(0));
        let mut headers = HeaderMap::new();
        hooks.set_headers(&request("/assets/app.css", false, None), &mut headers);
        assert_eq!(headers["Cache-Control"], "private, max-age=3600");

        let mut headers = HeaderMap::new();
        hooks.set_headers(&request("/logs/today.txt", false, None), &mut headers);
        assert!(!headers.contains_key("Cache-Control"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }
}
