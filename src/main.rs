use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use blitz::config::{self, Config};
use blitz::filecache::FileCache;
use blitz::logger;
use blitz::server::signal::{start_signal_handler, ShutdownSignal};
use blitz::server::{create_reusable_listener, run_accept_loop, tls};
use blitz::site::SiteHooks;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    // TLS is all-or-nothing: a configured HTTPS port with an unloadable
    // certificate must abort startup, not come up HTTP-only
    let acceptor = if cfg.tls_enabled() {
        match tls::build_acceptor(&cfg.tls.cert_file, &cfg.tls.key_file) {
            Ok(acceptor) => Some(acceptor),
            Err(e) => {
                logger::log_error(&format!("Cert Load: {e}"));
                return Err(e.into());
            }
        }
    } else {
        None
    };

    let system_ram = config::detect_system_ram();
    let cache_budget = cfg.cache_budget();

    let http_addr = cfg.http_socket_addr()?;
    let http_listener = create_reusable_listener(http_addr)?;

    let https = match &acceptor {
        Some(_) => {
            let addr = cfg.https_socket_addr()?;
            Some((addr, create_reusable_listener(addr)?))
        }
        None => None,
    };

    logger::log_server_start(
        &http_addr,
        https.as_ref().map(|(addr, _)| addr),
        &cfg,
        system_ram,
        cache_budget,
    );

    let hooks = Arc::new(SiteHooks::new(&cfg));
    let shutdown_grace = cfg.performance.shutdown_grace;
    let state = Arc::new(config::AppState::new(
        cfg,
        hooks,
        FileCache::new(cache_budget),
    ));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let shutdown = Arc::new(ShutdownSignal::new(Arc::clone(&state.shutdown)));
    start_signal_handler(Arc::clone(&shutdown));

    let https_task = https.map(|(_, listener)| {
        let state = Arc::clone(&state);
        let counter = Arc::clone(&active_connections);
        let notify = Arc::clone(&state.shutdown);
        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            run_accept_loop(listener, state, counter, acceptor, notify, "HTTPS").await;
        })
    });

    run_accept_loop(
        http_listener,
        Arc::clone(&state),
        Arc::clone(&active_connections),
        None,
        Arc::clone(&state.shutdown),
        "HTTP",
    )
    .await;

    if let Some(task) = https_task {
        let _ = task.await;
    }

    // Accept loops are closed; give in-flight connections a bounded window
    let remaining =
        blitz::server::run::drain_connections(&active_connections, shutdown_grace).await;
    logger::log_shutdown_complete(remaining);
    state.cache.log_stats();

    Ok(())
}
