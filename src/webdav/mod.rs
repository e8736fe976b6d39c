//! The HTTP front end ([MODULE K]): a read-only WebDAV Class 1 surface over
//! a single [`Backend`](crate::backend::Backend).
//!
//! axum's `MethodFilter` only covers the eight standard HTTP verbs, so it
//! cannot name PROPFIND directly. Rather than fight the router for methods
//! it was never meant to carry, everything funnels through one
//! `fallback(handler)` route and dispatches on `req.method()` by hand.

mod dump;
mod propfind;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::{Backend, BackendError, ResourceInfo};
use crate::path::{self, Segments};

const ALLOWED_METHODS: &str = "OPTIONS, GET, HEAD, PROPFIND";

pub type SharedBackend = Arc<dyn Backend>;

/// Build the router for a mounted backend.
pub fn router(backend: SharedBackend) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}

async fn handle(State(backend): State<SharedBackend>, req: Request) -> Response {
    let method = req.method().clone();
    match method.as_str() {
        "OPTIONS" => handle_options(),
        "GET" => handle_get_or_head(&backend, &req, true).await,
        "HEAD" => handle_get_or_head(&backend, &req, false).await,
        "PROPFIND" => handle_propfind(&backend, req).await,
        _ => method_not_allowed(),
    }
}

fn method_not_allowed() -> Response {
    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    response.headers_mut().insert(
        header::ALLOW,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    response
}

fn handle_options() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert("DAV", HeaderValue::from_static("1"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    (StatusCode::OK, headers).into_response()
}

fn backend_error_response(err: BackendError) -> Response {
    match err {
        BackendError::NotFound(path) => (StatusCode::NOT_FOUND, format!("Not found: {path}")).into_response(),
        BackendError::Backend(msg) => {
            tracing::error!(error = %msg, "backend error");
            (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
        }
    }
}

/// Dump format requested via query string. `json` wins if both `json` and
/// `zip` are present.
enum DumpKind {
    None,
    Json,
    Zip,
}

fn dump_kind(query: Option<&str>) -> DumpKind {
    let Some(query) = query else {
        return DumpKind::None;
    };
    let mut has_json = false;
    let mut has_zip = false;
    for pair in query.split('&') {
        let key = pair.split('=').next().unwrap_or("");
        match key {
            "json" => has_json = true,
            "zip" => has_zip = true,
            _ => {}
        }
    }
    if has_json {
        DumpKind::Json
    } else if has_zip {
        DumpKind::Zip
    } else {
        DumpKind::None
    }
}

async fn handle_get_or_head(backend: &SharedBackend, req: &Request, send_body: bool) -> Response {
    let segments = path::decode_segments(req.uri().path());

    let info = match backend.info(&segments) {
        Ok(info) => info,
        Err(err) => return backend_error_response(err),
    };

    match dump_kind(req.uri().query()) {
        DumpKind::Json => match dump::json_dump(backend.as_ref(), &segments) {
            Ok(bytes) => respond(
                StatusCode::OK,
                "application/json; charset=utf-8",
                bytes,
                send_body,
            ),
            Err(err) => backend_error_response(err),
        },
        DumpKind::Zip => match dump::zip_dump(backend.as_ref(), &segments) {
            Ok(bytes) => respond(StatusCode::OK, "application/zip", bytes, send_body),
            Err(err) => backend_error_response(err),
        },
        DumpKind::None if info.is_dir => directory_listing(backend, &segments, send_body),
        DumpKind::None => match backend.get(&segments) {
            Ok(bytes) => respond(StatusCode::OK, &info.content_type, bytes, send_body),
            Err(err) => backend_error_response(err),
        },
    }
}

fn respond(status: StatusCode, content_type: &str, bytes: Vec<u8>, send_body: bool) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    let body = if send_body {
        Body::from(Bytes::from(bytes))
    } else {
        Body::empty()
    };
    (status, headers, body).into_response()
}

fn directory_listing(backend: &SharedBackend, segments: &Segments, send_body: bool) -> Response {
    let children = match backend.list(segments) {
        Ok(names) => names,
        Err(err) => return backend_error_response(err),
    };

    let current_path = path::to_string(segments);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&current_path)));
    html.push_str("<ul>\n");
    if !segments.is_empty() {
        html.push_str("<li><a href=\"../\">..</a></li>\n");
    }
    for name in &children {
        let child = path::join(segments, name);
        let is_dir = backend.info(&child).map(|info| info.is_dir).unwrap_or(false);
        let href = path::encode_segment(name) + if is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{href}\">{}</a></li>\n",
            html_escape(name)
        ));
    }
    html.push_str("</ul>\n</body></html>\n");

    respond(StatusCode::OK, "text/html; charset=utf-8", html.into_bytes(), send_body)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

async fn handle_propfind(backend: &SharedBackend, req: Request) -> Response {
    let depth = propfind::Depth::parse(
        req.headers()
            .get("Depth")
            .and_then(|v| v.to_str().ok()),
    );
    let segments = path::decode_segments(req.uri().path());

    let body = match axum::body::to_bytes(req.into_body(), 1 << 20).await {
        Ok(bytes) => bytes,
        Err(_) => Bytes::new(),
    };
    let parsed = propfind::parse_request(&body);

    let info: ResourceInfo = match backend.info(&segments) {
        Ok(info) => info,
        Err(err) => return backend_error_response(err),
    };

    let entries = propfind::collect(backend.as_ref(), &segments, info, depth);
    let xml = propfind::render(&entries, &parsed);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    (StatusCode::MULTI_STATUS, headers, xml).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_wins_when_both_present_in_query() {
        assert!(matches!(dump_kind(Some("json&zip")), DumpKind::Json));
        assert!(matches!(dump_kind(Some("zip&json")), DumpKind::Json));
    }

    #[test]
    fn zip_alone_is_recognized() {
        assert!(matches!(dump_kind(Some("zip")), DumpKind::Zip));
    }

    #[test]
    fn absent_query_is_none() {
        assert!(matches!(dump_kind(None), DumpKind::None));
    }
}
