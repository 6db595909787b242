//! HTTP protocol layer module
//!
//! Protocol-level building blocks shared by the static file handler and the
//! site hooks: MIME detection, ETag/cache policy helpers, Range parsing,
//! and response builders.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used items
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_403_response, build_404_response, build_405_response,
    build_413_response, build_416_response, build_options_response, build_redirect_308,
    build_text_response,
};
