//! Market data client: upstream provider, synthetic fallback and a short
//! TTL cache in front of both.

pub mod cache;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use signalforge_core::error::Result;
use signalforge_core::market::{normalize_symbol, synthetic_bars, Bar, Interval, Series, SyntheticMode};

use crate::config::{DataSection, ProviderKind};
use crate::obs::metrics::ServiceMetrics;

pub use cache::TtlCache;
pub use provider::{CandleProvider, FetchOutcome, YahooChartProvider};

/// `(symbol, interval, "limit:synthetic:mode")`
pub type CacheKey = (String, Interval, String);

pub struct MarketDataClient {
    provider: Option<Arc<dyn CandleProvider>>,
    cache: TtlCache<CacheKey, Series>,
    metrics: Arc<ServiceMetrics>,
}

impl MarketDataClient {
    /// Build the client described by the `data` config section.
    pub fn from_config(cfg: &DataSection, metrics: Arc<ServiceMetrics>) -> Result<Self> {
        let provider: Option<Arc<dyn CandleProvider>> = match cfg.provider {
            ProviderKind::YahooChart => Some(Arc::new(YahooChartProvider::new(
                &cfg.base_url,
                Duration::from_millis(cfg.timeout_ms),
            )?)),
            ProviderKind::SyntheticOnly => None,
        };
        Ok(Self::new(provider, cfg, metrics))
    }

    /// `provider = None` serves synthetic data for every request.
    pub fn new(
        provider: Option<Arc<dyn CandleProvider>>,
        cfg: &DataSection,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            provider,
            cache: TtlCache::new(Duration::from_secs(cfg.ttl_sec), cfg.cache_max_entries),
            metrics,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.as_ref().map(|p| p.name()).unwrap_or("synthetic_only")
    }

    /// Fetch up to `limit` bars, oldest first.
    pub async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
        synthetic: bool,
        mode: SyntheticMode,
    ) -> Result<Series> {
        let symbol = normalize_symbol(symbol)?;
        let key: CacheKey = (
            symbol.clone(),
            interval,
            format!("{limit}:{}:{}", u8::from(synthetic), mode.as_str()),
        );
        if let Some(hit) = self.cache.get(&key) {
            self.metrics.cache_hits.inc(&[]);
            tracing::debug!(%symbol, %interval, limit, "market data cache hit");
            return Ok(hit);
        }

        let candles = match (&self.provider, synthetic) {
            (Some(p), false) => match p.fetch(&symbol, interval).await? {
                FetchOutcome::Bars(bars) => bars,
                FetchOutcome::Fallback { reason } => {
                    self.metrics.data_fallbacks.inc(&[("reason", reason)]);
                    tracing::warn!(%symbol, %interval, reason, "upstream unavailable, serving synthetic bars");
                    generate(&symbol, interval, limit, mode)
                }
            },
            _ => generate(&symbol, interval, limit, mode),
        };

        let series = Series {
            symbol,
            interval,
            as_of: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            candles,
        }
        .keep_last(limit);
        self.cache.insert(key, series.clone());
        Ok(series)
    }
}

fn generate(symbol: &str, interval: Interval, limit: usize, mode: SyntheticMode) -> Vec<Bar> {
    synthetic_bars(&mut rand::thread_rng(), symbol, interval, limit, mode, Utc::now())
}
