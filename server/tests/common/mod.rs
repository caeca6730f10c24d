#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use fetch_proxy_server::models::ProxySource;
use fetch_proxy_server::{ProxyConfig, ProxyHandler};
use futures_util::StreamExt;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const PAGE: &str = "<html><head><title>Hello</title></head><body>hello</body></html>";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
pub const SLOW_DELAY: Duration = Duration::from_secs(5);
pub const SHORT_DELAY: Duration = Duration::from_secs(1);

/// Starts a local site for the proxy to fetch from.
pub async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/page", get(page))
        .route("/untyped", get(untyped))
        .route("/binary", get(binary))
        .route("/missing", get(missing))
        .route("/redirect", get(|| async { Redirect::temporary("/page") }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }))
        .route("/truncated", get(truncated))
        .route("/slow", get(slow))
        .route("/delayed", get(delayed))
        .route("/headers", get(echo_headers));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn handler(source: ProxySource, config: ProxyConfig) -> Arc<ProxyHandler> {
    Arc::new(ProxyHandler::new(&config, source).unwrap())
}

pub fn short_timeout_config() -> ProxyConfig {
    ProxyConfig {
        upstream_timeout: Duration::from_millis(300),
        ..ProxyConfig::default()
    }
}

pub fn fetch_body(url: &str) -> String {
    json!({ "url": url }).to_string()
}

async fn page() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], PAGE)
}

async fn untyped() -> Response {
    Response::new(Body::from(PAGE))
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

async fn missing() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        "<h1>gone</h1>",
    )
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(SLOW_DELAY).await;
    ([(header::CONTENT_TYPE, "text/html")], PAGE)
}

async fn delayed() -> impl IntoResponse {
    tokio::time::sleep(SHORT_DELAY).await;
    ([(header::CONTENT_TYPE, "text/html")], PAGE)
}

/// Sends the start of a page, then fails mid-body.
async fn truncated() -> Response {
    let chunks = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"<html><body>partial")),
        Err(std::io::Error::other("upstream went away")),
    ])
    .then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        chunk
    });
    let mut response = Response::new(Body::from_stream(chunks));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
    response
}

async fn echo_headers(headers: HeaderMap) -> Json<serde_json::Value> {
    let get = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    Json(json!({
        "user_agent": get(header::USER_AGENT),
        "accept": get(header::ACCEPT),
        "accept_language": get(header::ACCEPT_LANGUAGE),
        "connection": get(header::CONNECTION),
    }))
}
