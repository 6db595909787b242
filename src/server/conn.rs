// Connection handling module
// Accepts a single TCP connection and serves HTTP over it, with optional
// TLS termination

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsAcceptor;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, enforcing the connection limit.
///
/// The counter is incremented before the limit check and rolled back on
/// rejection, so two racing accepts cannot both slip under the limit.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    acceptor: Option<TlsAcceptor>,
) {
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.cached_access_log.load(Ordering::Relaxed) {
        logger::log_connection_accepted(&peer_addr);
    }

    let state = Arc::clone(state);
    let conn_counter = Arc::clone(conn_counter);

    tokio::spawn(async move {
        match acceptor {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(tls_stream) => serve(tls_stream, peer_addr, state, true).await,
                Err(e) => {
                    logger::log_warning(&format!("TLS handshake failed from {peer_addr}: {e}"));
                }
            },
            None => serve(stream, peer_addr, state, false).await,
        }
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve HTTP/1.1 over an established stream.
///
/// Applies keep-alive settings and an overall connection timeout of
/// max(read, write) timeout. `secure` marks requests as having arrived
/// over the TLS listener, which the site hooks use for the HTTPS redirect.
async fn serve<I>(
    stream: I,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    secure: bool,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);

    let keep_alive_timeout = state.config.performance.keep_alive_timeout;
    let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
        state.config.performance.read_timeout,
        state.config.performance.write_timeout,
    ));

    let mut builder = http1::Builder::new();
    // A zero keep-alive timeout means close after one request
    builder.keep_alive(keep_alive_timeout > 0);

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            let state = Arc::clone(&service_state);
            async move { handler::handle_request(req, state, peer_addr, secure).await }
        }),
    );

    match tokio::time::timeout(timeout_duration, conn).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => {
            logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filecache::FileCache;
    use crate::hooks::NoHooks;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_state(keep_alive_timeout: u64) -> Arc<AppState> {
        let mut config = Config::load_from("nonexistent-config").unwrap();
        config.performance.keep_alive_timeout = keep_alive_timeout;
        Arc::new(AppState::new(
            config,
            Arc::new(NoHooks),
            FileCache::new(1024),
        ))
    }

    #[tokio::test]
    async fn test_zero_keep_alive_closes_after_one_request() {
        let (mut client, server) = tokio::io::duplex(8192);
        let peer: std::net::SocketAddr = "127.0.0.1:41000".parse().unwrap();
        let task = tokio::spawn(serve(server, peer, test_state(0), false));

        client
            .write_all(b"GET /nothing HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        // EOF here means the server closed the connection after answering
        client.read_to_end(&mut response).await.unwrap();
        task.await.unwrap();

        let text = String::from_utf8_lossy(&response).to_lowercase();
        assert!(text.starts_with("http/1.1 404"));
        assert!(text.contains("connection: close"));
    }

    #[tokio::test]
    async fn test_keep_alive_serves_multiple_requests() {
        let (mut client, server) = tokio::io::duplex(8192);
        let peer: std::net::SocketAddr = "127.0.0.1:41001".parse().unwrap();
        let task = tokio::spawn(serve(server, peer, test_state(60), false));

        let mut buf = vec![0u8; 4096];
        for _ in 0..2 {
            client
                .write_all(b"GET /nothing HTTP/1.1\r\nHost: test\r\n\r\n")
                .await
                .unwrap();
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the second response");
            let text = String::from_utf8_lossy(&buf[..n]).to_lowercase();
            assert!(text.starts_with("http/1.1 404"));
            assert!(!text.contains("connection: close"));
        }

        drop(client);
        task.await.unwrap();
    }
}
