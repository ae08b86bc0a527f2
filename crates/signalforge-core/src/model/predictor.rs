use std::collections::BTreeMap;

use crate::error::{Result, SignalForgeError};
use crate::features::{FeatureFrame, Matrix};

use super::artifacts::{
    read_json, short_sha256, ArtifactPaths, LogisticModel, ModelMeta, StandardScaler, LOGISTIC_KIND,
    META_FILE, MODEL_FILE, SCALER_FILE,
};

const DEFAULT_THRESHOLD: f64 = 0.5;

/// Loaded classifier: scaler + model + metadata, plus short artifact hashes.
///
/// Immutable after load; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: LogisticModel,
    scaler: StandardScaler,
    meta: ModelMeta,
    artifact_hashes: BTreeMap<String, String>,
}

impl Predictor {
    /// Load all three artifacts. Any missing or unreadable file is
    /// `ModelUnavailable`; inconsistent dimensions are rejected up front.
    pub fn load(paths: ArtifactPaths) -> Result<Self> {
        let scaler: StandardScaler = read_json(&paths.scaler_path)?;
        let model: LogisticModel = read_json(&paths.model_path)?;
        let meta: ModelMeta = read_json(&paths.meta_path)?;

        if model.kind != LOGISTIC_KIND {
            return Err(SignalForgeError::ModelUnavailable(format!(
                "unsupported model kind: {}",
                model.kind
            )));
        }
        if scaler.mean.len() != scaler.scale.len() || scaler.n_features() != model.n_features() {
            return Err(SignalForgeError::ModelUnavailable(format!(
                "scaler has {} features but model has {}",
                scaler.n_features(),
                model.n_features()
            )));
        }
        if let Some(names) = meta.feature_order() {
            if names.len() != model.n_features() {
                return Err(SignalForgeError::ModelUnavailable(format!(
                    "model_meta lists {} features but model has {}",
                    names.len(),
                    model.n_features()
                )));
            }
        }

        let mut artifact_hashes = BTreeMap::new();
        artifact_hashes.insert(MODEL_FILE.to_string(), short_sha256(&paths.model_path)?);
        artifact_hashes.insert(SCALER_FILE.to_string(), short_sha256(&paths.scaler_path)?);
        artifact_hashes.insert(META_FILE.to_string(), short_sha256(&paths.meta_path)?);

        tracing::info!(
            model_version = meta.model_version.as_deref().unwrap_or("unknown"),
            n_features = model.n_features(),
            "model artifacts loaded"
        );

        Ok(Self {
            model,
            scaler,
            meta,
            artifact_hashes,
        })
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn artifact_hashes(&self) -> &BTreeMap<String, String> {
        &self.artifact_hashes
    }

    /// Training-time feature order, when the metadata carries one.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.meta.feature_order()
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// Threshold used when the caller does not pass one.
    pub fn default_threshold(&self) -> f64 {
        self.meta.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Project a feature frame onto the model's columns. Without recorded
    /// feature names the canonical order is used and only the width is checked.
    pub fn prepare(&self, frame: &FeatureFrame) -> Result<Matrix> {
        match self.feature_names() {
            Some(names) => frame.select(names),
            None => frame.select(&crate::features::FEATURE_NAMES),
        }
    }

    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<f64>> {
        let expected = self.n_features();
        if let Some(bad) = x.iter().find(|r| r.len() != expected) {
            return Err(SignalForgeError::BadRequest(format!(
                "feature dimension mismatch: expected {expected} features, got {}. \
                 Tip: add 'feature_names' to model_meta.json to lock column order.",
                bad.len()
            )));
        }
        Ok(x
            .iter()
            .map(|r| self.model.proba(&self.scaler.transform_row(r)))
            .collect())
    }

    /// Class labels (`proba >= threshold`). `threshold` falls back to the
    /// metadata threshold, then 0.5.
    pub fn predict(&self, x: &Matrix, threshold: Option<f64>) -> Result<Vec<u8>> {
        let thr = threshold.unwrap_or_else(|| self.default_threshold());
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= thr))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifacts::save_artifacts;

    fn write_model(dir: &std::path::Path, names: Option<Vec<String>>) -> ArtifactPaths {
        let paths = ArtifactPaths::in_dir(dir);
        let model = LogisticModel::new(vec![2.0, 0.0], 0.0);
        let scaler = StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        let meta = ModelMeta {
            model_version: Some("m1".into()),
            threshold: Some(0.6),
            feature_names: names,
            ..Default::default()
        };
        save_artifacts(&paths, &model, &scaler, &meta).unwrap();
        paths
    }

    #[test]
    fn load_hashes_and_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let p = Predictor::load(write_model(dir.path(), Some(vec!["ret_1".into(), "ret_3".into()]))).unwrap();
        assert_eq!(p.artifact_hashes().len(), 3);
        assert!(p.artifact_hashes().values().all(|h| h.len() == 16));

        let x = vec![vec![0.0, 9.0], vec![1.0, 0.0]];
        let proba = p.predict_proba(&x).unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-12);
        assert!(proba[1] > 0.8);
        // meta threshold 0.6
        assert_eq!(p.predict(&x, None).unwrap(), vec![0, 1]);
        assert_eq!(p.predict(&x, Some(0.5)).unwrap(), vec![1, 1]);
    }

    #[test]
    fn dimension_mismatch_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let p = Predictor::load(write_model(dir.path(), None)).unwrap();
        let err = p.predict_proba(&vec![vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }

    #[test]
    fn missing_files_are_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Predictor::load(ArtifactPaths::in_dir(dir.path())).unwrap_err();
        assert_eq!(err.client_code().as_str(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn meta_width_must_match_model() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_model(dir.path(), Some(vec!["ret_1".into()]));
        assert!(Predictor::load(paths).is_err());
    }
}
