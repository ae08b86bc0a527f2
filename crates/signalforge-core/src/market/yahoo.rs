//! Yahoo v8 chart response normalisation.
//!
//! Expected shape:
//! `chart.result[0].timestamp` (epoch seconds) and
//! `chart.result[0].indicators.quote[0].{open,high,low,close,volume}` arrays,
//! where individual entries may be `null` for halted minutes.

use serde::Deserialize;
use serde_json::Value;

use super::bar::{validate_bar, Bar, RawBar};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Convert a chart response into validated bars. Any structural mismatch
/// yields an empty list rather than an error.
pub fn normalize_yahoo_chart(resp: &Value, symbol: &str) -> Vec<Bar> {
    let Ok(parsed) = ChartResponse::deserialize(resp) else {
        return Vec::new();
    };
    let Some(result) = parsed.chart.result.and_then(|r| r.into_iter().next()) else {
        return Vec::new();
    };
    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result.indicators.and_then(|i| i.quote.into_iter().next()) else {
        return Vec::new();
    };

    let n = [
        timestamps.len(),
        quote.open.len(),
        quote.high.len(),
        quote.low.len(),
        quote.close.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or(0);

    (0..n)
        .filter_map(|i| {
            let raw = RawBar {
                ts: timestamps[i],
                open: quote.open[i],
                high: quote.high[i],
                low: quote.low[i],
                close: quote.close[i],
                volume: quote.volume.get(i).copied().flatten(),
            };
            validate_bar(&raw, symbol)
        })
        .collect()
}
