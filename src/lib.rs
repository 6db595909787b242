//! blitz - a small asynchronous HTTP/1.1 web server.
//!
//! Serves static files from a web root with an in-memory cache, optional TLS
//! termination, and a per-request hook API for site-specific behavior
//! (custom routes, header policy, file transforms, access logging).

pub mod config;
pub mod filecache;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod logger;
pub mod server;
pub mod site;

/// Server identification string, used in the `/ping` reply and the
/// `Server` response header.
pub const SERVER_VERSION: &str = concat!("blitz/", env!("CARGO_PKG_VERSION"));
