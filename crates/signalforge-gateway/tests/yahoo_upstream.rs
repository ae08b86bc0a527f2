#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! Market data client against a local stand-in for the Yahoo chart API.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use signalforge_core::market::{Interval, SyntheticMode};
use signalforge_gateway::config::DataSection;
use signalforge_gateway::data::{CandleProvider, MarketDataClient, YahooChartProvider};
use signalforge_gateway::obs::metrics::ServiceMetrics;

async fn chart(Path(sym): Path<String>) -> impl IntoResponse {
    match sym.as_str() {
        "LIMIT" => (StatusCode::TOO_MANY_REQUESTS, Json(json!({}))).into_response(),
        "BROKEN" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response(),
        "SLOW" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({})).into_response()
        }
        _ => Json(json!({
            "chart": {"result": [{
                "timestamp": [1700000000, 1700000300, 1700000600, 1700000900],
                "indicators": {"quote": [{
                    "open":   [10.0, 10.5, null, 11.0],
                    "high":   [11.0, 11.0, 11.5, 11.5],
                    "low":    [9.5, 10.0, 10.5, 10.5],
                    "close":  [10.5, 10.8, 11.0, 11.2],
                    "volume": [100, null, 300, 400]
                }]}
            }]}
        }))
        .into_response(),
    }
}

async fn fake_yahoo() -> String {
    let app = Router::new().route("/v8/finance/chart/:sym", get(chart));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, ttl_sec: u64) -> (MarketDataClient, Arc<ServiceMetrics>) {
    client_with_timeout(base_url, ttl_sec, 2000)
}

fn client_with_timeout(base_url: &str, ttl_sec: u64, timeout_ms: u64) -> (MarketDataClient, Arc<ServiceMetrics>) {
    let cfg = DataSection {
        base_url: base_url.to_string(),
        ttl_sec,
        timeout_ms,
        ..DataSection::default()
    };
    let metrics = Arc::new(ServiceMetrics::default());
    let provider: Arc<dyn CandleProvider> =
        Arc::new(YahooChartProvider::new(&cfg.base_url, Duration::from_millis(cfg.timeout_ms)).unwrap());
    (MarketDataClient::new(Some(provider), &cfg, Arc::clone(&metrics)), metrics)
}

#[tokio::test]
async fn chart_rows_are_normalised_and_trimmed() {
    let base = fake_yahoo().await;
    let (c, _) = client(&base, 15);
    let s = c.fetch("aapl", Interval::M5, 2, false, SyntheticMode::Flat).await.unwrap();
    assert_eq!(s.symbol, "AAPL");
    // row 2 has a null open and is dropped; the newest two of the rest remain
    assert_eq!(s.candles.len(), 2);
    assert_eq!(s.candles[0].ts, 1700000300);
    assert_eq!(s.candles[0].volume, 0);
    assert_eq!(s.candles[1].ts, 1700000900);
}

#[tokio::test]
async fn rate_limit_falls_back_to_synthetic() {
    let base = fake_yahoo().await;
    let (c, metrics) = client(&base, 15);
    let s = c.fetch("LIMIT", Interval::M5, 40, false, SyntheticMode::Up).await.unwrap();
    assert_eq!(s.candles.len(), 40);
    assert_eq!(metrics.data_fallbacks.get(&[("reason", "rate_limited")]), 1);

    // second call is served from cache
    c.fetch("LIMIT", Interval::M5, 40, false, SyntheticMode::Up).await.unwrap();
    assert_eq!(metrics.data_fallbacks.get(&[("reason", "rate_limited")]), 1);
    assert_eq!(metrics.cache_hits.get(&[]), 1);
}

#[tokio::test]
async fn server_error_is_upstream_error() {
    let base = fake_yahoo().await;
    let (c, _) = client(&base, 15);
    let err = c
        .fetch("BROKEN", Interval::M5, 40, false, SyntheticMode::Flat)
        .await
        .unwrap_err();
    assert_eq!(err.client_code().as_str(), "UPSTREAM_ERROR");
}

#[tokio::test]
async fn unreachable_upstream_falls_back() {
    // bind then drop to get a port nobody listens on
    let addr = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let (c, metrics) = client(&format!("http://{addr}"), 0);
    let s = c.fetch("AAPL", Interval::M1, 25, false, SyntheticMode::Down).await.unwrap();
    assert_eq!(s.candles.len(), 25);
    assert_eq!(metrics.data_fallbacks.get(&[("reason", "transport")]), 1);
}

#[tokio::test]
async fn slow_upstream_times_out_to_synthetic() {
    let base = fake_yahoo().await;
    let (c, metrics) = client_with_timeout(&base, 0, 100);
    let started = std::time::Instant::now();
    let s = c.fetch("SLOW", Interval::M5, 30, false, SyntheticMode::Up).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(s.symbol, "SLOW");
    assert_eq!(s.candles.len(), 30);
    assert_eq!(metrics.data_fallbacks.get(&[("reason", "timeout")]), 1);
    assert_eq!(metrics.data_fallbacks.get(&[("reason", "transport")]), 0);
}
