//! Logger module
//!
//! Server lifecycle logging, access logging in several formats, and error
//! and warning output, optionally to files.

mod format;
pub mod writer;

pub use format::{AccessLogEntry, LogFormat};

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger from configuration
///
/// Should be called once at application startup, before any listener binds.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to the info/access log
fn write_info(message: &str) {
    match writer::try_get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to the error log
fn write_error(message: &str) {
    match writer::try_get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(
    http_addr: &SocketAddr,
    https_addr: Option<&SocketAddr>,
    config: &Config,
    system_ram: Option<u64>,
    cache_budget: u64,
) {
    write_info("======================================");
    write_info(&format!(
        "{} started, {}",
        crate::SERVER_VERSION,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z")
    ));
    write_info(&format!("Listening on: http://{http_addr}"));
    if let Some(addr) = https_addr {
        write_info(&format!("Listening on: https://{addr}"));
    }
    match system_ram {
        Some(ram) => write_info(&format!(
            "RAM: {}MB, Max cache: {}MB",
            ram / 1_000_000,
            cache_budget / 1_000_000
        )),
        None => write_info(&format!(
            "RAM: unknown, Max cache: {}MB",
            cache_budget / 1_000_000
        )),
    }
    write_info(&format!("Web root: {}", config.server.web_root));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_request(method: &hyper::Method, uri: &hyper::Uri, version: hyper::Version) {
    write_info(&format!("[Request] {method} {uri} {version:?}"));
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        write_info(&format!("[Headers] Count: {count}"));
    }
}

/// Emit a formatted access log entry, optionally with a trailing label
/// (e.g. "HTTPS Redirect")
pub fn log_access(entry: &AccessLogEntry, format: &LogFormat, label: Option<&str>) {
    let mut line = entry.render(format);
    if let Some(label) = label {
        line.push_str(" \"");
        line.push_str(label);
        line.push('"');
    }
    write_info(&line);
}

pub fn log_shutdown_signal(signal: &str) {
    write_info(&format!("\n[Signal] {signal} received, shutting down gracefully"));
}

pub fn log_shutdown_complete(active: usize) {
    if active == 0 {
        write_info("[Shutdown] All connections drained, exiting");
    } else {
        write_info(&format!(
            "[Shutdown] Grace period elapsed with {active} connection(s) still open, exiting"
        ));
    }
}

pub fn log_cache_stats(hits: u64, misses: u64, evictions: u64) {
    write_info(&format!(
        "[Cache] hits: {hits}, misses: {misses}, evictions: {evictions}"
    ));
}
