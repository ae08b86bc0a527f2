//! On-disk model artifacts (JSON).
//!
//! Three files live side by side in the model directory:
//! - `model.json`: logistic regression weights
//! - `scaler.json`: per-feature mean and scale
//! - `model_meta.json`: versions, decision threshold, feature order

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SignalForgeError};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const META_FILE: &str = "model_meta.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub meta_path: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join(MODEL_FILE),
            scaler_path: dir.join(SCALER_FILE),
            meta_path: dir.join(META_FILE),
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

pub const LOGISTIC_KIND: &str = "logistic_regression";

fn default_kind() -> String {
    LOGISTIC_KIND.to_string()
}

/// Binary logistic regression: `p = sigmoid(coef . x + intercept)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default = "default_kind")]
    pub kind: String,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Self {
        Self {
            kind: default_kind(),
            coef,
            intercept,
        }
    }

    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    pub fn decision(&self, x: &[f64]) -> f64 {
        self.coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.intercept
    }

    pub fn proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision(x))
    }
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Per-feature standardisation fitted on the training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows; zero-variance columns get scale 1.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(SignalForgeError::InsufficientData("cannot fit scaler on 0 rows".into()));
        };
        let d = first.len();
        let n = rows.len() as f64;
        let mut mean = vec![0.0; d];
        for r in rows {
            for (m, v) in mean.iter_mut().zip(r) {
                *m += v / n;
            }
        }
        let mut var = vec![0.0; d];
        for r in rows {
            for ((s, v), m) in var.iter_mut().zip(r).zip(&mean) {
                *s += (v - m) * (v - m) / n;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| if v > 0.0 { v.sqrt() } else { 1.0 })
            .collect();
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                (v - m) / s
            })
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

/// Model metadata. Unknown keys are kept so older/newer trainers round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub dataset_version: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Older trainers wrote the column list under `features`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelMeta {
    /// Training-time column order, if the meta records one.
    pub fn feature_order(&self) -> Option<&[String]> {
        self.feature_names
            .as_deref()
            .filter(|f| !f.is_empty())
            .or_else(|| self.features.as_deref().filter(|f| !f.is_empty()))
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .map_err(|e| SignalForgeError::ModelUnavailable(format!("read {} failed: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SignalForgeError::ModelUnavailable(format!("parse {} failed: {e}", path.display())))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| SignalForgeError::Internal(format!("create {} failed: {e}", dir.display())))?;
    }
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| SignalForgeError::Internal(format!("json encode failed: {e}")))?;
    fs::write(path, s).map_err(|e| SignalForgeError::Internal(format!("write {} failed: {e}", path.display())))
}

/// Short (16 hex chars) SHA-256 of a file, for logs and version payloads.
pub fn short_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|e| SignalForgeError::ModelUnavailable(format!("read {} failed: {e}", path.display())))?;
    let digest = Sha256::digest(&bytes);
    let mut h = hex::encode(digest);
    h.truncate(16);
    Ok(h)
}

/// Persist a trained model, its scaler and metadata.
pub fn save_artifacts(
    paths: &ArtifactPaths,
    model: &LogisticModel,
    scaler: &StandardScaler,
    meta: &ModelMeta,
) -> Result<()> {
    write_json(&paths.model_path, model)?;
    write_json(&paths.scaler_path, scaler)?;
    write_json(&paths.meta_path, meta)?;
    tracing::info!(dir = %paths.model_path.parent().map(|p| p.display().to_string()).unwrap_or_default(), "saved model artifacts");
    Ok(())
}
