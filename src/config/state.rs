// Application state module
// Shared runtime state handed to every connection

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Notify;

use super::types::Config;
use crate::filecache::FileCache;
use crate::hooks::Hooks;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Site-specific request hooks
    pub hooks: Arc<dyn Hooks>,
    /// In-memory file content cache
    pub cache: FileCache,
    /// Notified once on SIGTERM/SIGINT; accept loops exit on it
    pub shutdown: Arc<Notify>,

    // Cached config value for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, hooks: Arc<dyn Hooks>, cache: FileCache) -> Self {
        let access_log = config.logging.access_log;
        Self {
            config,
            hooks,
            cache,
            shutdown: Arc::new(Notify::new()),
            cached_access_log: AtomicBool::new(access_log),
        }
    }
}
