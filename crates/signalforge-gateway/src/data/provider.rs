//! Upstream candle providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use signalforge_core::error::{Result, SignalForgeError};
use signalforge_core::market::{normalize_yahoo_chart, Bar, Interval};

/// What an upstream fetch produced.
#[derive(Debug)]
pub enum FetchOutcome {
    Bars(Vec<Bar>),
    /// Upstream unusable in a recoverable way; serve synthetic data instead.
    Fallback { reason: &'static str },
}

#[async_trait]
pub trait CandleProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, symbol: &str, interval: Interval) -> Result<FetchOutcome>;
}

/// Yahoo v8 chart endpoint (unofficial; rate limits are common).
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("signalforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SignalForgeError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chart_url(&self, symbol: &str, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{}?interval={}&range=1d&includePrePost=false",
            self.base_url, symbol, interval
        )
    }
}

#[async_trait]
impl CandleProvider for YahooChartProvider {
    fn name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch(&self, symbol: &str, interval: Interval) -> Result<FetchOutcome> {
        let resp = self
            .http
            .get(self.chart_url(symbol, interval))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                tracing::warn!(%symbol, error = %e, "yahoo request timed out");
                return Ok(FetchOutcome::Fallback { reason: "timeout" });
            }
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "yahoo transport error");
                return Ok(FetchOutcome::Fallback { reason: "transport" });
            }
        };

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(%symbol, "yahoo rate limited");
            return Ok(FetchOutcome::Fallback { reason: "rate_limited" });
        }
        if !status.is_success() {
            return Err(SignalForgeError::Upstream(format!("yahoo chart returned {status}")));
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) if e.is_timeout() => {
                tracing::warn!(%symbol, error = %e, "yahoo body timed out");
                return Ok(FetchOutcome::Fallback { reason: "timeout" });
            }
            Err(e) => return Err(SignalForgeError::Upstream(format!("yahoo chart decode failed: {e}"))),
        };
        let bars = normalize_yahoo_chart(&body, symbol);
        tracing::debug!(%symbol, interval = %interval, bars = bars.len(), "yahoo chart fetched");
        Ok(FetchOutcome::Bars(bars))
    }
}
