use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalForgeError};

/// Supported bar sizes (Yahoo chart granularity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "90m")]
    M90,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Normalise a user-provided interval. A bare `"5"` means five minutes.
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim().to_lowercase();
        let iv = match s.as_str() {
            "1m" => Interval::M1,
            "2m" => Interval::M2,
            "5m" | "5" => Interval::M5,
            "15m" => Interval::M15,
            "30m" => Interval::M30,
            "60m" => Interval::M60,
            "90m" => Interval::M90,
            "1h" => Interval::H1,
            "1d" => Interval::D1,
            _ => return Err(SignalForgeError::InvalidInterval(s)),
        };
        Ok(iv)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M2 => "2m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::M60 => "60m",
            Interval::M90 => "90m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
        }
    }

    /// Bar length in minutes.
    pub fn minutes(self) -> i64 {
        match self {
            Interval::M1 => 1,
            Interval::M2 => 2,
            Interval::M5 => 5,
            Interval::M15 => 15,
            Interval::M30 => 30,
            Interval::M60 | Interval::H1 => 60,
            Interval::M90 => 90,
            Interval::D1 => 1440,
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = SignalForgeError;

    fn try_from(s: String) -> Result<Self> {
        Interval::parse(&s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-case and check a ticker. Allows index/FX style punctuation (`^GSPC`,
/// `EURUSD=X`, `BRK.B`).
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let sym = raw.trim().to_uppercase();
    let ok_len = (1..=15).contains(&sym.len());
    let ok_chars = sym
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'));
    if !ok_len || !ok_chars {
        return Err(SignalForgeError::InvalidSymbol(raw.to_string()));
    }
    Ok(sym)
}
