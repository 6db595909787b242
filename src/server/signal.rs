// Signal handling module
//
// SIGTERM and SIGINT both trigger graceful shutdown: accept loops stop,
// then in-flight connections get a bounded drain period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Shutdown coordination state
pub struct ShutdownSignal {
    /// Notified once when shutdown is requested; accept loops wait on it
    pub notify: Arc<Notify>,
    pub requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new(notify: Arc<Notify>) -> Self {
        Self {
            notify,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    fn trigger(&self, signal: &str) {
        logger::log_shutdown_signal(signal);
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// Spawn the signal listener task (Unix)
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<ShutdownSignal>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => shutdown.trigger("SIGTERM"),
            _ = sigint.recv() => shutdown.trigger("SIGINT"),
        }
    });
}

/// Non-Unix fallback, Ctrl+C only
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<ShutdownSignal>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger("Ctrl+C");
        }
    });
}
