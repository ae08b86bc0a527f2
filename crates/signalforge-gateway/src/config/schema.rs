use serde::Deserialize;
use signalforge_core::error::{Result, SignalForgeError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalForgeConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub data: DataSection,

    #[serde(default)]
    pub stream: StreamSection,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for SignalForgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            model: ModelSection::default(),
            data: DataSection::default(),
            stream: StreamSection::default(),
            log: LogSection::default(),
        }
    }
}

impl SignalForgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SignalForgeError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.data.validate()?;
        self.stream.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_service_version")]
    pub service_version: String,

    /// Build commit shown on `/version`.
    #[serde(default = "default_commit")]
    pub commit: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            service_version: default_service_version(),
            commit: default_commit(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(SignalForgeError::BadRequest(format!(
                "server.listen must be a socket address, got {:?}",
                self.listen
            )));
        }
        if self.service_version.trim().is_empty() {
            return Err(SignalForgeError::BadRequest("server.service_version must not be empty".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8010".into()
}
fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_commit() -> String {
    "local".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Directory holding `model.json`, `scaler.json` and `model_meta.json`.
    #[serde(default = "default_model_dir")]
    pub dir: String,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self { dir: default_model_dir() }
    }
}

fn default_model_dir() -> String {
    "data".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    YahooChart,
    SyntheticOnly,
}

impl ProviderKind {
    /// Accepts `yahoo_chart` / `YAHOO_CHART` and friends.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "yahoo_chart" | "yahoo" => Ok(ProviderKind::YahooChart),
            "synthetic_only" | "synthetic" => Ok(ProviderKind::SyntheticOnly),
            other => Err(SignalForgeError::BadRequest(format!("unsupported provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Cache entry lifetime; 0 disables caching.
    #[serde(default = "default_ttl_sec")]
    pub ttl_sec: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            ttl_sec: default_ttl_sec(),
            cache_max_entries: default_cache_max_entries(),
            timeout_ms: default_timeout_ms(),
            base_url: default_base_url(),
        }
    }
}

impl DataSection {
    pub fn validate(&self) -> Result<()> {
        if self.ttl_sec > 3600 {
            return Err(SignalForgeError::BadRequest("data.ttl_sec must be between 0 and 3600".into()));
        }
        if !(1..=4096).contains(&self.cache_max_entries) {
            return Err(SignalForgeError::BadRequest(
                "data.cache_max_entries must be between 1 and 4096".into(),
            ));
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(SignalForgeError::BadRequest(
                "data.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SignalForgeError::BadRequest("data.base_url must be an http(s) URL".into()));
        }
        Ok(())
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::YahooChart
}
fn default_ttl_sec() -> u64 {
    15
}
fn default_cache_max_entries() -> usize {
    16
}
fn default_timeout_ms() -> u64 {
    10000
}
fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamSection {
    #[serde(default = "default_refresh_sec")]
    pub default_refresh_sec: f64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            default_refresh_sec: default_refresh_sec(),
        }
    }
}

impl StreamSection {
    pub fn validate(&self) -> Result<()> {
        if !(0.1..=60.0).contains(&self.default_refresh_sec) {
            return Err(SignalForgeError::BadRequest(
                "stream.default_refresh_sec must be between 0.1 and 60".into(),
            ));
        }
        Ok(())
    }
}

fn default_refresh_sec() -> f64 {
    2.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default)]
    pub format: LogFormat,
}
