//! Per-request timing middleware: request counter, latency histogram and
//! one structured log line per request under the `request` target.
//!
//! The `path` label is the matched route template, so label cardinality is
//! bounded by the route table. Requests no route matched share `unmatched`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;

const UNMATCHED: &str = "unmatched";

fn method_label(m: &Method) -> &'static str {
    const KNOWN: [&str; 7] = ["GET", "POST", "HEAD", "PUT", "DELETE", "OPTIONS", "PATCH"];
    KNOWN.into_iter().find(|k| *k == m.as_str()).unwrap_or("OTHER")
}

pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = method_label(req.method());
    let uri_path = req.uri().path().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let resp = next.run(req).await;

    let elapsed = start.elapsed();
    let status = resp.status().as_u16().to_string();
    let metrics = state.metrics();
    metrics
        .http_requests
        .inc(&[("method", method), ("path", &path), ("status", &status)]);
    metrics.http_duration.observe(&[], elapsed);

    tracing::info!(
        target: "request",
        method = %method,
        path = %uri_path,
        route = %path,
        status = %status,
        duration_s = elapsed.as_secs_f64(),
        client = client.as_deref().unwrap_or("-"),
        "request"
    );
    resp
}
