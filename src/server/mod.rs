// Server module entry point
// Listener setup, connection handling, TLS, signals, and the accept loop

pub mod conn;
pub mod listener;
pub mod run;
pub mod signal;
pub mod tls;

pub use listener::create_reusable_listener;
pub use run::run_accept_loop;
