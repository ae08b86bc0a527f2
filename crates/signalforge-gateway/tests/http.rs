#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::path::Path;

use serde_json::{json, Value};

use signalforge_core::features::FEATURE_NAMES;
use signalforge_core::model::artifacts::save_artifacts;
use signalforge_core::model::{ArtifactPaths, LogisticModel, ModelMeta, StandardScaler};
use signalforge_gateway::app_state::AppState;
use signalforge_gateway::config::{ProviderKind, SignalForgeConfig};
use signalforge_gateway::router;

fn write_artifacts(dir: &Path) {
    let n = FEATURE_NAMES.len();
    let mut coef = vec![0.0; n];
    coef[0] = 50.0; // ret_1
    let model = LogisticModel::new(coef, 0.0);
    let scaler = StandardScaler {
        mean: vec![0.0; n],
        scale: vec![1.0; n],
    };
    let meta = ModelMeta {
        model_version: Some("test-model".into()),
        dataset_version: Some("v0".into()),
        threshold: Some(0.5),
        feature_names: Some(FEATURE_NAMES.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    };
    save_artifacts(&ArtifactPaths::in_dir(dir), &model, &scaler, &meta).unwrap();
}

fn config(model_dir: &Path) -> SignalForgeConfig {
    let mut cfg = SignalForgeConfig::default();
    cfg.model.dir = model_dir.display().to_string();
    cfg.data.provider = ProviderKind::SyntheticOnly;
    cfg
}

async fn spawn(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router::build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_with_model() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let state = AppState::with_provider(config(dir.path()), None);
    let base = spawn(state).await;
    (dir, base)
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post_json(url: &str, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new().post(url).json(body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_and_version_with_model() {
    let (_dir, base) = spawn_with_model().await;

    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "signalforge");
    assert_eq!(body["model_file"], true);

    let (_, body) = get_json(&format!("{base}/version")).await;
    assert!(body["service"].as_str().unwrap().starts_with("signalforge:"));
    assert_eq!(body["model_version"], "test-model");
    assert_eq!(body["commit"], "local");

    let (status, body) = get_json(&format!("{base}/api/v1/version")).await;
    assert_eq!(status, 200);
    assert_eq!(body["feature_count"], 9);
    assert_eq!(body["dataset_version"], "v0");
    assert_eq!(body["artifact_hashes"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn degraded_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn(AppState::with_provider(config(dir.path()), None)).await;

    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "degraded");

    let (_, body) = get_json(&format!("{base}/version")).await;
    assert_eq!(body["model_version"], "unloaded");

    let (status, body) = get_json(&format!("{base}/api/v1/version")).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
    assert!(body["error"]["hint"].is_string());

    let (status, body) = post_json(
        &format!("{base}/api/v1/score"),
        &json!({"symbol": "AAPL", "interval": "5m", "synthetic": 1}),
    )
    .await;
    assert_eq!(status, 503);
    assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
}

#[tokio::test]
async fn reload_picks_up_new_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_provider(config(dir.path()), None);
    assert!(!state.model_loaded());
    assert!(state.reload_model().is_err());

    write_artifacts(dir.path());
    let p = state.reload_model().unwrap();
    assert_eq!(p.meta().model_version.as_deref(), Some("test-model"));
    assert!(state.model_loaded());
    assert_eq!(state.metrics().model_loaded.get(&[]), 1);
}

#[tokio::test]
async fn score_synthetic_series() {
    let (_dir, base) = spawn_with_model().await;

    let (status, body) = post_json(
        &format!("{base}/api/v1/score"),
        &json!({"symbol": "aapl", "interval": "5m", "limit": 120, "synthetic": 1, "threshold": 0.5}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["interval"], "5m");
    assert_eq!(body["threshold"], 0.5);
    assert_eq!(body["model_version"], "test-model");
    let rows = body["n_rows_scored"].as_u64().unwrap();
    assert!(rows > 0 && rows < 120);
    let counts = &body["counts"];
    assert_eq!(
        counts["pred_0"].as_u64().unwrap() + counts["pred_1"].as_u64().unwrap(),
        rows
    );
    let proba = body["last"]["proba"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&proba));
    assert!(body["last"]["time"].is_string());
}

#[tokio::test]
async fn score_errors_use_the_envelope() {
    let (_dir, base) = spawn_with_model().await;
    let url = format!("{base}/api/v1/score");

    let (status, body) = post_json(&url, &json!({"symbol": "AAPL", "interval": "7m", "synthetic": 1})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INTERVAL");

    let (status, body) = post_json(&url, &json!({"symbol": "AAPL", "interval": "5m", "limit": 10, "synthetic": 1})).await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_DATA");

    let (status, body) = post_json(&url, &json!({"symbol": "AAPL", "interval": "5m", "limit": 0})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let resp = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn backtest_replays_prefixes() {
    let (_dir, base) = spawn_with_model().await;
    let (status, body) = post_json(
        &format!("{base}/api/v1/backtest"),
        &json!({"window": 60, "steps": 5, "step_size": 2, "synthetic": true, "threshold": 0.5}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["n_steps"], 5);
    assert_eq!(body["params"]["symbol"], "AAPL");
    assert_eq!(body["params"]["synthetic_mode"], "flat");
    let records = body["records"].as_array().unwrap();
    let limits: Vec<u64> = records.iter().map(|r| r["limit"].as_u64().unwrap()).collect();
    assert_eq!(limits, vec![60, 62, 64, 66, 68]);
    assert!(records.iter().all(|r| r["error"].is_null()));
    let s = &body["summary"];
    assert_eq!(s["last_pred_0"].as_u64().unwrap() + s["last_pred_1"].as_u64().unwrap(), 5);
    assert_eq!(body["artifact_hashes"].as_object().unwrap().len(), 3);
    assert!(body["runtime"]["started_at"].is_string());
}

#[tokio::test]
async fn synthetic_mode_accepts_any_casing_and_unknown_names() {
    let (_dir, base) = spawn_with_model().await;

    for mode in ["UP", "random"] {
        let (status, body) = post_json(
            &format!("{base}/api/v1/score"),
            &json!({"symbol": "AAPL", "interval": "5m", "limit": 80, "synthetic": 1, "synthetic_mode": mode}),
        )
        .await;
        assert_eq!(status, 200, "{mode}: {body}");
        assert!(body["n_rows_scored"].as_u64().unwrap() > 0);
    }

    let (status, body) = post_json(
        &format!("{base}/api/v1/backtest"),
        &json!({"window": 60, "steps": 2, "synthetic": true, "synthetic_mode": "UP"}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["params"]["synthetic_mode"], "up");

    let (status, body) = post_json(
        &format!("{base}/api/v1/backtest"),
        &json!({"window": 60, "steps": 2, "synthetic": true, "synthetic_mode": "random"}),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["params"]["synthetic_mode"], "flat");
}

#[tokio::test]
async fn backtest_rejects_zero_window() {
    let (_dir, base) = spawn_with_model().await;
    let (status, body) = post_json(&format!("{base}/api/v1/backtest"), &json!({"window": 0})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn stream_emits_bounded_sse_frames() {
    let (_dir, base) = spawn_with_model().await;
    let resp = reqwest::get(format!(
        "{base}/api/v1/stream?synthetic=yes&limit=80&refresh_sec=0.1&max_events=2"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let ct = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(ct.starts_with("text/event-stream"));

    let text = resp.text().await.unwrap();
    let frames: Vec<Value> = text
        .lines()
        .filter_map(|l| l.strip_prefix("data: "))
        .map(|d| serde_json::from_str(d).unwrap())
        .collect();
    assert_eq!(frames.len(), 2);
    for f in &frames {
        assert_eq!(f["symbol"], "AAPL");
        assert!(f["last"]["proba"].is_number());
    }
}

#[tokio::test]
async fn stream_reports_tick_errors_in_band() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn(AppState::with_provider(config(dir.path()), None)).await;
    let text = reqwest::get(format!("{base}/api/v1/stream?synthetic=1&refresh_sec=0.1&max_events=1"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let data = text.lines().find_map(|l| l.strip_prefix("data: ")).unwrap();
    let v: Value = serde_json::from_str(data).unwrap();
    assert!(v["error"].as_str().unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn baseline_signal_on_synthetic_ramp() {
    let (_dir, base) = spawn_with_model().await;
    let (status, body) = get_json(&format!("{base}/signal/?symbol=msft&synthetic=1&synthetic_mode=down")).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["symbol"], "MSFT");
    assert_eq!(body["limit"], 200);
    assert_eq!(body["meta"]["source"], "baseline_v1");
    assert_eq!(body["meta"]["data_source"], "synthetic:down");
    assert_eq!(body["features"]["crossover"], "bearish");
    assert_eq!(body["features"]["rsi_state"], "oversold");
    // fast < slow but RSI is not above 35
    assert_eq!(body["features"]["decision"], "HOLD");

    let (status, body) = get_json(&format!("{base}/signal/?symbol=msft&limit=5")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = get_json(&format!("{base}/signal/?interval=5m")).await;
    assert_eq!(status, 400, "symbol is required");
}

#[tokio::test]
async fn metrics_count_requests() {
    let (_dir, base) = spawn_with_model().await;
    reqwest::get(format!("{base}/health")).await.unwrap();
    reqwest::get(format!("{base}/health")).await.unwrap();

    let text = reqwest::get(format!("{base}/metrics")).await.unwrap().text().await.unwrap();
    assert!(text.contains(r#"sf_http_requests_total{method="GET",path="/health",status="200"} 2"#));
    assert!(text.contains("# TYPE sf_http_request_duration_seconds histogram"));
    assert!(text.contains("sf_model_loaded 1"));
}

#[tokio::test]
async fn metrics_labels_use_route_templates() {
    let (_dir, base) = spawn_with_model().await;
    for i in 0..50 {
        reqwest::get(format!("{base}/junk/{i}")).await.unwrap();
    }
    for sym in ["aapl", "msft", "tsla"] {
        reqwest::get(format!("{base}/signal/?symbol={sym}&synthetic=1")).await.unwrap();
    }

    let text = reqwest::get(format!("{base}/metrics")).await.unwrap().text().await.unwrap();
    assert!(!text.contains("/junk/"), "{text}");
    assert!(text.contains(r#"sf_http_requests_total{method="GET",path="/signal/",status="200"} 3"#));
    let series = text
        .lines()
        .filter(|l| l.starts_with("sf_http_requests_total{"))
        .count();
    assert!(series <= 3, "{text}");
}
