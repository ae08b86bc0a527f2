//! Service config loader (strict parsing, then env overrides).

pub mod schema;

use std::fs;
use std::path::Path;

use signalforge_core::error::{Result, SignalForgeError};

pub use schema::{
    DataSection, LogFormat, LogSection, ModelSection, ProviderKind, ServerSection, SignalForgeConfig,
    StreamSection,
};

pub const DEFAULT_CONFIG_PATH: &str = "signalforge.yaml";

pub fn load_from_file(path: &str) -> Result<SignalForgeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SignalForgeError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SignalForgeConfig> {
    let cfg: SignalForgeConfig = serde_yaml::from_str(s)
        .map_err(|e| SignalForgeError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve config the way the binary does: `SF_CONFIG` (must exist) or
/// `signalforge.yaml` (optional), then environment overrides.
pub fn load() -> Result<SignalForgeConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<SignalForgeConfig> {
    let mut cfg = match env("SF_CONFIG") {
        Some(path) => load_from_file(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH)?,
        None => SignalForgeConfig::default(),
    };
    apply_overrides(&mut cfg, &env)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `SF_*` overrides on top of a parsed config.
pub fn apply_overrides(cfg: &mut SignalForgeConfig, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = env("SF_LISTEN") {
        cfg.server.listen = v;
    }
    if let Some(v) = env("SF_COMMIT") {
        cfg.server.commit = v;
    }
    if let Some(v) = env("SF_MODEL_DIR") {
        cfg.model.dir = v;
    }
    if let Some(v) = env("SF_PROVIDER") {
        cfg.data.provider = ProviderKind::parse(&v)?;
    }
    if let Some(v) = env("SF_DATA_TTL_SEC") {
        // Accept "15" as well as "15.0".
        let secs: f64 = v
            .trim()
            .parse()
            .map_err(|_| SignalForgeError::BadRequest(format!("SF_DATA_TTL_SEC must be a number, got {v:?}")))?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(SignalForgeError::BadRequest("SF_DATA_TTL_SEC must be >= 0".into()));
        }
        cfg.data.ttl_sec = secs.round() as u64;
    }
    Ok(())
}
