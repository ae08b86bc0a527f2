#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use signalforge_core::backtest::{replay, summarize, BacktestRequest};
use signalforge_core::features::{build_features, FEATURE_NAMES};
use signalforge_core::market::{synthetic_bars, Interval, Series, SyntheticMode};
use signalforge_core::model::artifacts::save_artifacts;
use signalforge_core::model::dataset::{build_dataset, DatasetConfig};
use signalforge_core::model::train::{train_and_evaluate, TrainParams};
use signalforge_core::model::{ArtifactPaths, Predictor};
use signalforge_core::scoring::score_series;

fn series(seed: u64, n: usize) -> Series {
    let candles = synthetic_bars(
        &mut StdRng::seed_from_u64(seed),
        "AAPL",
        Interval::M5,
        n,
        SyntheticMode::Up,
        Utc::now(),
    );
    Series {
        symbol: "AAPL".into(),
        interval: Interval::M5,
        as_of: Utc::now().to_rfc3339(),
        candles,
    }
}

fn trained_predictor(dir: &std::path::Path) -> Predictor {
    let s = series(11, 600);
    let cfg = DatasetConfig {
        symbol: "AAPL".into(),
        interval: Interval::M5,
        lookahead_n: 3,
        up_threshold: 0.0005,
        dataset_version: "v0".into(),
    };
    let ds = build_dataset(&s.candles, cfg, &FEATURE_NAMES).expect("dataset");
    let params = TrainParams {
        max_iter: 200,
        ..TrainParams::default()
    };
    let out = train_and_evaluate(&ds, "in-memory", params, "0.1.0-test").expect("train");
    assert_eq!(out.report.features.len(), FEATURE_NAMES.len());

    let paths = ArtifactPaths::in_dir(dir);
    save_artifacts(&paths, &out.model, &out.scaler, &out.meta).expect("save");
    Predictor::load(paths).expect("load")
}

#[test]
fn trained_artifacts_score_a_fresh_series() {
    let dir = tempfile::tempdir().unwrap();
    let p = trained_predictor(dir.path());
    assert_eq!(p.feature_names().unwrap().len(), 9);
    assert_eq!(p.meta().model_version.as_deref(), Some("0.1.0-test"));

    let s = series(99, 300);
    let report = score_series(&s, &p, None).expect("score");
    let frame = build_features(&s.candles);
    assert_eq!(report.n_rows_scored, frame.len());
    assert_eq!(report.counts.pred_0 + report.counts.pred_1, frame.len());
    assert_eq!(report.threshold, 0.5);
    assert!((0.0..=1.0).contains(&report.last.proba));
    assert_eq!(report.last.time.as_deref(), Some(frame.last().unwrap().time.as_str()));
    assert_eq!(report.artifact_hashes.len(), 3);
}

#[test]
fn scoring_is_deterministic_for_identical_input() {
    let dir = tempfile::tempdir().unwrap();
    let p = trained_predictor(dir.path());
    let s = series(5, 200);
    let a = score_series(&s, &p, Some(0.3)).unwrap();
    let b = score_series(&s, &p, Some(0.3)).unwrap();
    assert_eq!(a.last, b.last);
    assert_eq!(a.counts, b.counts);
}

#[test]
fn too_short_series_is_insufficient_data() {
    let dir = tempfile::tempdir().unwrap();
    let p = trained_predictor(dir.path());
    let err = score_series(&series(1, 10), &p, None).unwrap_err();
    assert_eq!(err.client_code().as_str(), "INSUFFICIENT_DATA");
}

#[test]
fn replay_scores_growing_prefixes_and_records_warmup_errors() {
    let dir = tempfile::tempdir().unwrap();
    let p = trained_predictor(dir.path());

    let req = BacktestRequest {
        window: 10,
        steps: 30,
        step_size: 2,
        ..BacktestRequest::default()
    };
    let s = series(21, req.total_bars());
    let (records, hashes) = replay(&s, &p, &req, || false);

    assert_eq!(records.len(), 30);
    assert_eq!(records[0].limit, 10);
    assert_eq!(records[29].limit, 68);
    // 10 bars cannot warm up a 20-bar SMA
    assert!(records[0].error.is_some());
    assert!(records[0].last.is_none());
    assert!(records[29].error.is_none());
    assert!(hashes.is_some());

    let summary = summarize(&records);
    let scored = records.iter().filter(|r| r.last.is_some()).count();
    assert_eq!(summary.last_pred_0 + summary.last_pred_1, scored);
}

#[test]
fn replay_stops_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let p = trained_predictor(dir.path());
    let req = BacktestRequest {
        window: 60,
        steps: 10,
        ..BacktestRequest::default()
    };
    let s = series(2, req.total_bars());
    let mut polls = 0;
    let (records, _) = replay(&s, &p, &req, || {
        polls += 1;
        polls > 4
    });
    assert_eq!(records.len(), 4);
}
