//! Shared application state.
//!
//! The predictor is loaded once at startup. A failed load is not fatal: the
//! service starts degraded and model-backed routes answer `MODEL_UNAVAILABLE`
//! until [`AppState::reload_model`] succeeds.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{SecondsFormat, Utc};

use signalforge_core::error::{Result, SignalForgeError};
use signalforge_core::model::{ArtifactPaths, Predictor};

use crate::config::SignalForgeConfig;
use crate::data::{CandleProvider, MarketDataClient};
use crate::obs::metrics::ServiceMetrics;

const UNLOADED: &str = "unloaded";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: SignalForgeConfig,
    metrics: Arc<ServiceMetrics>,
    data: MarketDataClient,
    artifacts: ArtifactPaths,
    predictor: RwLock<Option<Arc<Predictor>>>,
    startup_model_version: String,
    build_time: String,
}

impl AppState {
    /// Build state with the provider named in config.
    pub fn new(cfg: SignalForgeConfig) -> Result<Self> {
        let metrics = Arc::new(ServiceMetrics::default());
        let data = MarketDataClient::from_config(&cfg.data, Arc::clone(&metrics))?;
        Ok(Self::assemble(cfg, metrics, data))
    }

    /// Build state around a caller-supplied provider (`None` = synthetic only).
    pub fn with_provider(cfg: SignalForgeConfig, provider: Option<Arc<dyn CandleProvider>>) -> Self {
        let metrics = Arc::new(ServiceMetrics::default());
        let data = MarketDataClient::new(provider, &cfg.data, Arc::clone(&metrics));
        Self::assemble(cfg, metrics, data)
    }

    fn assemble(cfg: SignalForgeConfig, metrics: Arc<ServiceMetrics>, data: MarketDataClient) -> Self {
        let artifacts = ArtifactPaths::in_dir(&cfg.model.dir);
        let predictor = match Predictor::load(artifacts.clone()) {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                tracing::warn!(dir = %cfg.model.dir, error = %e, "model not loaded; starting degraded");
                None
            }
        };
        metrics.model_loaded.set(&[], i64::from(predictor.is_some()));

        let startup_model_version = predictor
            .as_ref()
            .and_then(|p| p.meta().model_version.clone())
            .unwrap_or_else(|| UNLOADED.to_string());

        tracing::info!(
            provider = data.provider_name(),
            model_version = %startup_model_version,
            "app state ready"
        );

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                data,
                artifacts,
                predictor: RwLock::new(predictor),
                startup_model_version,
                build_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        }
    }

    pub fn cfg(&self) -> &SignalForgeConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn data(&self) -> &MarketDataClient {
        &self.inner.data
    }

    pub fn artifacts(&self) -> &ArtifactPaths {
        &self.inner.artifacts
    }

    /// Model version read from metadata at startup (`"unloaded"` otherwise).
    pub fn startup_model_version(&self) -> &str {
        &self.inner.startup_model_version
    }

    pub fn build_time(&self) -> &str {
        &self.inner.build_time
    }

    pub fn model_loaded(&self) -> bool {
        self.current_predictor().is_some()
    }

    fn current_predictor(&self) -> Option<Arc<Predictor>> {
        let guard = self.inner.predictor.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// The loaded predictor, or `MODEL_UNAVAILABLE`.
    pub fn predictor(&self) -> Result<Arc<Predictor>> {
        self.current_predictor().ok_or_else(|| {
            SignalForgeError::ModelUnavailable(format!(
                "no model artifacts loaded from {}",
                artifact_dir(&self.inner.artifacts)
            ))
        })
    }

    /// Re-read artifacts from disk and swap them in. On failure the previous
    /// predictor (if any) stays in place.
    pub fn reload_model(&self) -> Result<Arc<Predictor>> {
        let p = Arc::new(Predictor::load(self.inner.artifacts.clone())?);
        {
            let mut guard = self.inner.predictor.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(Arc::clone(&p));
        }
        self.inner.metrics.model_loaded.set(&[], 1);
        tracing::info!(
            model_version = p.meta().model_version.as_deref().unwrap_or("unknown"),
            "model reloaded"
        );
        Ok(p)
    }
}

fn artifact_dir(paths: &ArtifactPaths) -> String {
    paths
        .model_path
        .parent()
        .map(Path::display)
        .map(|d| d.to_string())
        .unwrap_or_default()
}
