//! Request handler module
//!
//! Routes each request through the hook pipeline and the static file
//! handler.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
