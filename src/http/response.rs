//! HTTP response builders
//!
//! Builders for the status responses the server produces. None of these set
//! `Cache-Control`; that header belongs to the site hooks, which run after
//! the response is built and have the last word on headers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Build 304 Not Modified
#[must_use]
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 403 Forbidden (pre-request hook denial)
#[must_use]
pub fn build_403_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::FORBIDDEN, "403 Forbidden", false)
}

/// Build 404 Not Found
#[must_use]
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found", false)
}

/// Build 405 Method Not Allowed
#[must_use]
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build OPTIONS response (preflight request)
#[must_use]
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 413 Payload Too Large
#[must_use]
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large", false)
}

/// Build 416 Range Not Satisfiable
#[must_use]
pub fn build_416_response(resource_size: usize) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain")
        .header("Content-Range", format!("bytes */{resource_size}"))
        .body(Full::new(Bytes::from("Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::from("Range Not Satisfiable")))
        })
}

/// Build 308 Permanent Redirect with a closed connection
///
/// Used for the plain-HTTP to HTTPS upgrade; the body is fixed-length so
/// the reply never uses chunked transfer encoding.
#[must_use]
pub fn build_redirect_308(target: &str) -> Response<Full<Bytes>> {
    let body = Bytes::from("Redirecting...");
    Response::builder()
        .status(StatusCode::PERMANENT_REDIRECT)
        .header("Location", target)
        .header("Content-Type", "text/plain")
        .header("Content-Length", body.len())
        .header("Connection", "close")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("308", &e);
            Response::new(Full::new(Bytes::from("Redirecting...")))
        })
}

/// Build a plain-text response with an explicit Content-Length
///
/// `close` adds `Connection: close`, dropping the keep-alive connection
/// once the reply is flushed.
#[must_use]
pub fn build_text_response(
    status: StatusCode,
    body: impl Into<Bytes>,
    close: bool,
) -> Response<Full<Bytes>> {
    let body = body.into();
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", body.len());
    if close {
        builder = builder.header("Connection", "close");
    }
    builder.body(Full::new(body.clone())).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        Response::new(Full::new(body))
    })
}

/// Build a 200 response for cacheable content with ETag and range support
#[must_use]
pub fn build_content_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Accept-Ranges", "bytes")
        .header("ETag", etag)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a 206 Partial Content response
#[must_use]
pub fn build_partial_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    start: usize,
    end: usize,
    total_size: usize,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = end - start + 1;
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Content-Range", format!("bytes {start}-{end}/{total_size}"))
        .header("Accept-Ranges", "bytes")
        .header("ETag", etag)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("206", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
