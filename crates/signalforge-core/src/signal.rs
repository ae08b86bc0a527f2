//! Rule-based baseline signal (SMA crossover gated by RSI).
//!
//! Works on closes only, so it runs on any series including the close-only
//! synthetic ramps.

use serde::Serialize;

use crate::error::{Result, SignalForgeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiState {
    Unknown,
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineFeatures {
    pub ok: bool,
    pub latest_close: f64,
    pub sma_fast_p: usize,
    pub sma_slow_p: usize,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub rsi14: Option<f64>,
    pub crossover: Crossover,
    pub rsi_state: RsiState,
    pub decision: Decision,
    pub num_candles: usize,
}

/// Mean of the last `period` values.
fn tail_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// RSI from plain sums of the trailing changes.
///
/// Sums the last `period - 1` changes but averages over `period`, so the
/// oldest change in a `period + 1` close window never counts.
fn tail_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let (mut gains, mut losses) = (0.0, 0.0);
    for i in closes.len() - period + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

pub fn compute_baseline(closes: &[f64], sma_fast_p: usize, sma_slow_p: usize) -> Result<BaselineFeatures> {
    let Some(&latest_close) = closes.last() else {
        return Err(SignalForgeError::InsufficientData("no_candles".into()));
    };

    let sma_fast = tail_sma(closes, sma_fast_p);
    let sma_slow = tail_sma(closes, sma_slow_p);
    let rsi14 = tail_rsi(closes, 14);

    let crossover = match (sma_fast, sma_slow) {
        (Some(f), Some(s)) if f > s => Crossover::Bullish,
        (Some(f), Some(s)) if f < s => Crossover::Bearish,
        _ => Crossover::None,
    };

    let rsi_state = match rsi14 {
        None => RsiState::Unknown,
        Some(r) if r >= 70.0 => RsiState::Overbought,
        Some(r) if r <= 30.0 => RsiState::Oversold,
        Some(_) => RsiState::Neutral,
    };

    let decision = match (sma_fast, sma_slow, rsi14) {
        (Some(f), Some(s), Some(r)) if f > s && r < 65.0 => Decision::Buy,
        (Some(f), Some(s), Some(r)) if f < s && r > 35.0 => Decision::Sell,
        _ => Decision::Hold,
    };

    Ok(BaselineFeatures {
        ok: true,
        latest_close,
        sma_fast_p,
        sma_slow_p,
        sma_fast,
        sma_slow,
        rsi14,
        crossover,
        rsi_state,
        decision,
        num_candles: closes.len(),
    })
}
