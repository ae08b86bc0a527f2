//! Synthetic series used when `synthetic=1` or as the upstream fallback.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use super::bar::{validate_bar, Bar, RawBar};
use super::interval::Interval;

/// Drift direction of the random walk.
///
/// Deserializes through [`SyntheticMode::parse`], so request bodies accept
/// any casing and unknown names fall back to `flat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntheticMode {
    Up,
    Down,
    #[default]
    Flat,
}

impl<'de> Deserialize<'de> for SyntheticMode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

impl SyntheticMode {
    /// Lenient parse: anything unrecognised behaves as `flat`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "up" => SyntheticMode::Up,
            "down" => SyntheticMode::Down,
            _ => SyntheticMode::Flat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyntheticMode::Up => "up",
            SyntheticMode::Down => "down",
            SyntheticMode::Flat => "flat",
        }
    }

    fn drift(self) -> f64 {
        match self {
            SyntheticMode::Up => 0.04,
            SyntheticMode::Down => -0.04,
            SyntheticMode::Flat => 0.0,
        }
    }
}

const START_PRICE: f64 = 100.0;
const STEP_SIGMA: f64 = 0.5;
const WICK_MAX: f64 = 0.3;
const MIN_PRICE: f64 = 1.0;

/// Box-Muller normal sample.
fn gauss<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Generate `limit` validated bars ending at `now`, spaced by `interval`.
pub fn synthetic_bars<R: Rng + ?Sized>(
    rng: &mut R,
    symbol: &str,
    interval: Interval,
    limit: usize,
    mode: SyntheticMode,
    now: DateTime<Utc>,
) -> Vec<Bar> {
    let step_minutes = interval.minutes();
    let mut price = START_PRICE;
    let mut bars = Vec::with_capacity(limit);

    for i in 0..limit {
        let close = (price + gauss(rng, mode.drift(), STEP_SIGMA)).max(MIN_PRICE);
        let open = price;
        let high = open.max(close) + rng.gen::<f64>() * WICK_MAX;
        let low = open.min(close) - rng.gen::<f64>() * WICK_MAX;
        let volume = rng.gen_range(1000..=5000) as f64;
        let back = step_minutes * (limit - 1 - i) as i64;
        let ts = (now - Duration::minutes(back)).timestamp();

        let raw = RawBar {
            ts,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        };
        if let Some(bar) = validate_bar(&raw, symbol) {
            bars.push(bar);
        }
        price = close;
    }
    bars
}

/// Deterministic close-only ramp for the baseline signal.
pub fn ramp_closes(limit: usize, mode: SyntheticMode) -> Vec<f64> {
    (0..limit)
        .map(|i| match mode {
            SyntheticMode::Up => START_PRICE + i as f64 * 0.3,
            SyntheticMode::Down => START_PRICE - i as f64 * 0.3,
            SyntheticMode::Flat => START_PRICE,
        })
        .collect()
}
