// Configuration module entry point
// Manages application configuration and runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    CacheConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, RoutesConfig, ServerConfig,
    TlsConfig,
};

/// Fallback cache budget when system RAM cannot be detected
const DEFAULT_CACHE_BYTES: u64 = 256 * 1024 * 1024;

impl Config {
    /// Load configuration from "config.toml" merged with `BLITZ_`-prefixed
    /// environment variables and built-in defaults
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("BLITZ"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.http_port", 80)?
            .set_default("server.https_port", 0)?
            .set_default("server.hostname", "example.com")?
            .set_default("server.web_root", "./web")?
            .set_default("tls.cert_file", "web.crt")?
            .set_default("tls.key_file", "web.key")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_grace", 30)?
            .set_default("http.server_name", crate::SERVER_VERSION)?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn http_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.http_port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn https_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.https_port)
            .parse()
            .map_err(|e| format!("Invalid HTTPS address: {e}"))
    }

    /// Whether the TLS listener is enabled (`https_port` nonzero)
    #[must_use]
    pub const fn tls_enabled(&self) -> bool {
        self.server.https_port != 0
    }

    /// Resolve the file cache byte budget: explicit config value, or one
    /// quarter of detected system RAM, or a fixed fallback
    #[must_use]
    pub fn cache_budget(&self) -> u64 {
        self.cache
            .max_bytes
            .unwrap_or_else(|| detect_system_ram().map_or(DEFAULT_CACHE_BYTES, |ram| ram / 4))
    }
}

/// Read total system RAM in bytes from /proc/meminfo.
///
/// Returns None on non-Linux systems and on parse failure; callers fall
/// back to a fixed budget. Avoids libc so the crate stays free of unsafe.
#[must_use]
pub fn detect_system_ram() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb = rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // No config file named this way; defaults + env only
        let cfg = Config::load_from("nonexistent-config").expect("defaults should deserialize");
        assert_eq!(cfg.server.http_port, 80);
        assert_eq!(cfg.server.https_port, 0);
        assert!(!cfg.tls_enabled());
        assert_eq!(cfg.server.web_root, "./web");
        assert_eq!(cfg.server.hostname, "example.com");
        assert_eq!(cfg.tls.cert_file, "web.crt");
        assert_eq!(cfg.performance.shutdown_grace, 30);
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert_eq!(cfg.routes.index_files, vec!["index.html", "index.htm"]);
    }

    #[test]
    fn test_socket_addrs() {
        let cfg = Config::load_from("nonexistent-config").unwrap();
        let addr = cfg.http_socket_addr().unwrap();
        assert_eq!(addr.port(), 80);
    }

    #[test]
    fn test_cache_budget_explicit() {
        let mut cfg = Config::load_from("nonexistent-config").unwrap();
        cfg.cache.max_bytes = Some(1024);
        assert_eq!(cfg.cache_budget(), 1024);
    }

    #[test]
    fn test_cache_budget_fallback_is_positive() {
        let cfg = Config::load_from("nonexistent-config").unwrap();
        assert!(cfg.cache_budget() > 0);
    }
}
