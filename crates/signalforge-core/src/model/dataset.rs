//! Offline training dataset: feature rows labelled with a forward-looking
//! "price rose by at least `up_threshold` within N bars" target.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalForgeError};
use crate::features::{build_features, FeatureRow};
use crate::market::{Bar, Interval};

use super::artifacts::{read_json, write_json};

pub const TARGET: &str = "target_up_next_N";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub symbol: String,
    pub interval: Interval,
    /// Bars ahead the label looks (>= 1).
    pub lookahead_n: usize,
    /// Minimum relative rise for a positive label (>= 0).
    pub up_threshold: f64,
    pub dataset_version: String,
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookahead_n == 0 {
            return Err(SignalForgeError::BadRequest("lookahead_n must be >= 1".into()));
        }
        if !self.up_threshold.is_finite() || self.up_threshold < 0.0 {
            return Err(SignalForgeError::BadRequest("up_threshold must be >= 0".into()));
        }
        Ok(())
    }
}

/// One training example: features, the label, and the next-bar return used by
/// the toy profit metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabeledRow {
    pub ts: i64,
    pub time: String,
    pub close: f64,
    pub features: Vec<f64>,
    pub target: u8,
    pub ret_next: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub config: DatasetConfig,
    pub feature_names: Vec<String>,
    pub target: String,
    pub created_utc: String,
    pub rows: Vec<LabeledRow>,
}

fn project(row: &FeatureRow, names: &[&str]) -> Vec<f64> {
    names.iter().filter_map(|n| row.get(n)).collect()
}

/// Build labelled rows. The label compares the close `lookahead_n` bars
/// ahead in the raw series; rows that would need bars past the end are dropped.
pub fn build_dataset(bars: &[Bar], cfg: DatasetConfig, names: &[&str]) -> Result<Dataset> {
    cfg.validate()?;
    let mut sorted: Vec<&Bar> = bars.iter().collect();
    sorted.sort_by_key(|b| b.ts);
    let index: HashMap<i64, usize> = sorted.iter().enumerate().map(|(i, b)| (b.ts, i)).collect();

    let frame = build_features(bars);
    let n = cfg.lookahead_n;

    let mut out = Vec::new();
    for row in &frame.rows {
        let Some(&i) = index.get(&row.ts) else {
            continue;
        };
        let (Some(future), Some(next)) = (sorted.get(i + n), sorted.get(i + 1)) else {
            break;
        };
        let target = u8::from(future.close >= row.close * (1.0 + cfg.up_threshold));
        out.push(LabeledRow {
            ts: row.ts,
            time: row.time.clone(),
            close: row.close,
            features: project(row, names),
            target,
            ret_next: next.close / row.close - 1.0,
        });
    }
    if out.is_empty() {
        return Err(SignalForgeError::InsufficientData(format!(
            "{} bars produced no labelled rows",
            bars.len()
        )));
    }

    Ok(Dataset {
        config: cfg,
        feature_names: names.iter().map(|s| s.to_string()).collect(),
        target: TARGET.to_string(),
        created_utc: Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
        rows: out,
    })
}

/// Write `dataset_<sym>_<interval>_<version>_<stamp>.json` plus a small
/// sibling meta file; returns the dataset path.
pub fn save_dataset(ds: &Dataset, out_dir: &Path) -> Result<PathBuf> {
    let name = format!(
        "dataset_{}_{}_{}_{}",
        ds.config.symbol, ds.config.interval, ds.config.dataset_version, ds.created_utc
    );
    let path = out_dir.join(format!("{name}.json"));
    write_json(&path, ds)?;

    let positives = ds.rows.iter().filter(|r| r.target == 1).count();
    let meta = serde_json::json!({
        "created_utc": ds.created_utc,
        "symbol": ds.config.symbol,
        "interval": ds.config.interval,
        "dataset_version": ds.config.dataset_version,
        "lookahead_n": ds.config.lookahead_n,
        "up_threshold": ds.config.up_threshold,
        "rows": ds.rows.len(),
        "cols": ds.feature_names.len() + 1,
        "positives": positives,
    });
    write_json(&out_dir.join(format!("{name}.meta.json")), &meta)?;
    tracing::info!(path = %path.display(), rows = ds.rows.len(), positives, "dataset written");
    Ok(path)
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    read_json(path).map_err(|e| SignalForgeError::BadRequest(e.to_string()))
}

/// Newest dataset file in `dir` (names sort by timestamp suffix).
pub fn latest_dataset(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SignalForgeError::BadRequest(format!("read {} failed: {e}", dir.display())))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("dataset_") && n.ends_with(".json") && !n.ends_with(".meta.json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files.pop().ok_or_else(|| {
        SignalForgeError::BadRequest(format!(
            "no dataset found in {}; run `sfctl build-dataset` first",
            dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::market::{synthetic_bars, SyntheticMode};

    fn cfg() -> DatasetConfig {
        DatasetConfig {
            symbol: "AAPL".into(),
            interval: Interval::M5,
            lookahead_n: 3,
            up_threshold: 0.001,
            dataset_version: "v0".into(),
        }
    }

    fn bars() -> Vec<Bar> {
        synthetic_bars(&mut StdRng::seed_from_u64(3), "AAPL", Interval::M5, 200, SyntheticMode::Up, Utc::now())
    }

    #[test]
    fn labels_look_ahead_and_tail_is_dropped() {
        let b = bars();
        let frame = build_features(&b);
        let ds = build_dataset(&b, cfg(), &FEATURE_NAMES).unwrap();
        assert_eq!(ds.rows.len(), frame.len() - 3);
        for r in &ds.rows {
            let i = b.iter().position(|bar| bar.ts == r.ts).unwrap();
            let expect = b[i + 3].close >= b[i].close * 1.001;
            assert_eq!(r.target == 1, expect);
            assert_eq!(r.features.len(), FEATURE_NAMES.len());
            assert!((r.ret_next - (b[i + 1].close / b[i].close - 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_zero_lookahead() {
        let mut c = cfg();
        c.lookahead_n = 0;
        assert!(build_dataset(&bars(), c, &FEATURE_NAMES).is_err());
    }

    #[test]
    fn save_then_find_latest() {
        let dir = tempfile::tempdir().unwrap();
        let ds = build_dataset(&bars(), cfg(), &FEATURE_NAMES).unwrap();
        let path = save_dataset(&ds, dir.path()).unwrap();
        assert_eq!(latest_dataset(dir.path()).unwrap(), path);
        let back = load_dataset(&path).unwrap();
        assert_eq!(back.rows.len(), ds.rows.len());
        assert_eq!(back.feature_names, ds.feature_names);
        assert!(back.rows.iter().zip(&ds.rows).all(|(a, b)| a.ts == b.ts && a.target == b.target));
    }
}
