// Accept loop module
// Per-listener loop over accepted connections, exiting on shutdown

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_rustls::TlsAcceptor;

use super::conn::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop for one listener until shutdown is signalled.
///
/// `acceptor` is `Some` for the TLS listener; accepted streams then go
/// through the TLS handshake before HTTP serving. Returning stops new
/// accepts; in-flight connections keep running in their own tasks and are
/// drained by the caller.
pub async fn run_accept_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    acceptor: Option<TlsAcceptor>,
    shutdown: Arc<Notify>,
    label: &'static str,
) {
    // Register the waiter up front so a notification between loop
    // iterations is never missed
    let notified = shutdown.notified();
    tokio::pin!(notified);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            acceptor.clone(),
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("[{label}] Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut notified => {
                logger::log_warning(&format!("[{label}] Listener stopping, no longer accepting"));
                break;
            }
        }
    }

    drop(listener);
}

/// Wait for active connections to finish, up to `grace_secs`.
///
/// Returns the number of connections still open when the wait ended.
pub async fn drain_connections(active_connections: &Arc<AtomicUsize>, grace_secs: u64) -> usize {
    let deadline =
        tokio::time::Instant::now() + std::time::Duration::from_secs(grace_secs);

    loop {
        let active = active_connections.load(std::sync::atomic::Ordering::SeqCst);
        if active == 0 {
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let counter = Arc::new(AtomicUsize::new(0));
        assert_eq!(drain_connections(&counter, 5).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_times_out_with_connections_open() {
        let counter = Arc::new(AtomicUsize::new(2));
        assert_eq!(drain_connections(&counter, 1).await, 2);
    }

    #[tokio::test]
    async fn test_drain_observes_counter_reaching_zero() {
        let counter = Arc::new(AtomicUsize::new(1));
        let waiter = Arc::clone(&counter);
        let handle = tokio::spawn(async move { drain_connections(&waiter, 10).await });
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        counter.store(0, Ordering::SeqCst);
        assert_eq!(handle.await.unwrap(), 0);
    }
}
