//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. Runs the hook pipeline in its
//! fixed order around method validation and the static file handler:
//! pre-request, on-request, set-headers, post-request (read-custom fires
//! inside the file cache on the static path).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Method, Request, Response};

use crate::config::AppState;
use crate::handler::static_files;
use crate::hooks::{Handled, HookAction, RequestInfo, ResponseInfo};
use crate::http;
use crate::logger;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
    secure: bool,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let received_at = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let is_head = method == Method::HEAD;

    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);
    if access_log {
        logger::log_request(&method, req.uri(), req.version());
    }

    let info = RequestInfo {
        method: method.clone(),
        path,
        query: req.uri().query().map(ToString::to_string),
        version: version_string(req.version()),
        peer: peer_addr,
        secure,
        host: header_string(req.headers(), "host"),
        referer: header_string(req.headers(), "referer"),
        user_agent: header_string(req.headers(), "user-agent"),
        received_at,
    };

    // 1. Pre-request hook (IP bans and the like)
    if state.hooks.pre_request(peer_addr, &method, &info.path) == HookAction::Deny {
        logger::log_warning(&format!("Request from {peer_addr} denied by pre-request hook"));
        let response = http::build_403_response();
        return Ok(finish(&state, &info, Handled::new(response)));
    }

    // 2. Method validation
    if let Some(response) = check_http_method(&method, state.config.http.enable_cors) {
        return Ok(finish(&state, &info, Handled::new(response)));
    }

    // 3. Body size limit
    if let Some(response) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(finish(&state, &info, Handled::new(response)));
    }

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 4. On-request hook: custom routes short-circuit the static handler
    if let Some(handled) = state.hooks.on_request(&info) {
        return Ok(finish(&state, &info, handled));
    }

    // 5. Static files from the web root
    let if_none_match = header_string(req.headers(), "if-none-match");
    let range_header = header_string(req.headers(), "range");
    let response = static_files::serve(
        &info,
        is_head,
        if_none_match.as_deref(),
        range_header.as_deref(),
        &state,
    )
    .await;

    Ok(finish(&state, &info, Handled::new(response)))
}

/// Apply the set-headers hook, stamp the Server header, and fire the
/// post-request hook
fn finish(state: &Arc<AppState>, info: &RequestInfo, handled: Handled) -> Response<Full<Bytes>> {
    let Handled {
        mut response,
        quiet,
        log_label,
    } = handled;

    if let Ok(server) = state.config.http.server_name.parse() {
        response.headers_mut().insert("Server", server);
    }
    state.hooks.set_headers(info, response.headers_mut());

    let body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
        .unwrap_or(usize::MAX);
    let res_info = ResponseInfo {
        status: response.status().as_u16(),
        body_bytes,
        quiet,
        log_label,
    };
    state.hooks.post_request(info, &res_info);

    response
}

/// Non-GET/HEAD methods get an immediate response
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length and return 413 when it exceeds the limit
fn check_body_size(
    req: &Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let size_str = req.headers().get("content-length")?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_string(version: hyper::Version) -> String {
    match version {
        hyper::Version::HTTP_10 => "1.0".to_string(),
        hyper::Version::HTTP_2 => "2".to_string(),
        _ => "1.1".to_string(),
    }
}
