use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AggregateBucket — One row per day / ISO week / calendar month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    /// Bucket start (UTC midnight of the day, ISO-week Monday, or first of month).
    pub start: DateTime<Utc>,
    pub trades: usize,
    pub fill_count: i64,
    pub closed_pnl: f64,
    /// Percentage of trades with a strictly positive PNL.
    pub win_rate: f64,
    pub duration_total_minutes: f64,
    pub duration_avg_minutes: f64,
    /// Capital-weighted return: summed PNL over summed invested capital, in percent.
    pub pct: Option<f64>,
}

// ---------------------------------------------------------------------------
// Summary — Headline statistics for a trade set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_pnl: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
}

// ---------------------------------------------------------------------------
// PnlPoint — One point of a chart series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlPoint {
    pub time: DateTime<Utc>,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}
