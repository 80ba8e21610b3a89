use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PnlError;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite direction.
    pub fn inverted(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(PnlError::InvalidArgument(format!("unknown side: {}", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// NormalizedTrade — Typed closed position, the persisted unit
// ---------------------------------------------------------------------------

/// A closed position with coerced fields and derived metrics.
///
/// `side` is the direction of the original position (the inverse of the
/// closing order's side reported by the exchange). Any field that failed to
/// coerce is `None`. Serializes with the same camelCase column names used by
/// the `trades` table, timestamps as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTrade {
    pub symbol: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub closed_size: Option<f64>,
    #[serde(default)]
    pub cum_entry_value: Option<f64>,
    #[serde(default)]
    pub avg_entry_price: Option<f64>,
    #[serde(default)]
    pub avg_exit_price: Option<f64>,
    #[serde(default)]
    pub closed_pnl: Option<f64>,
    #[serde(default)]
    pub fill_count: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invested_capital: Option<f64>,
    #[serde(default)]
    pub pct: Option<f64>,
    #[serde(default)]
    pub trade_duration_minutes: Option<f64>,
}

impl NormalizedTrade {
    pub fn is_win(&self) -> bool {
        self.closed_pnl.is_some_and(|p| p > 0.0)
    }
}
