//! Dashboard-facing helpers: period presets, headline statistics, and chart series.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::PnlError;
use crate::models::{AggregateBucket, NormalizedTrade, PnlPoint, Summary};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Lookback presets offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    SevenDays,
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    YearToDate,
    All,
}

impl Period {
    pub const ALL: [Period; 7] = [
        Period::SevenDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::YearToDate,
        Period::All,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::SevenDays => "7D",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::SixMonths => "6M",
            Period::OneYear => "1Y",
            Period::YearToDate => "YTD",
            Period::All => "All",
        }
    }

    /// Start of the period ending at `now`; `None` for [`Period::All`].
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Period::SevenDays => 7,
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::OneYear => 365,
            Period::YearToDate => {
                return NaiveDate::from_ymd_opt(now.year(), 1, 1)
                    .map(|d| d.and_time(NaiveTime::MIN).and_utc());
            }
            Period::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| PnlError::InvalidArgument(format!("unknown period: {}", s)))
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Total and average PNL, trade count and win rate over `trades`.
pub fn summarize(trades: &[NormalizedTrade]) -> Summary {
    if trades.is_empty() {
        return Summary::default();
    }
    let pnls: Vec<f64> = trades.iter().filter_map(|t| t.closed_pnl).collect();
    let total_pnl: f64 = pnls.iter().sum();
    let wins = trades.iter().filter(|t| t.is_win()).count();

    Summary {
        total_pnl,
        total_trades: trades.len(),
        win_rate: wins as f64 / trades.len() as f64 * 100.0,
        avg_pnl: if pnls.is_empty() {
            0.0
        } else {
            total_pnl / pnls.len() as f64
        },
    }
}

/// Render minutes as `"Xh Ym"`; unknown durations render as `"0m"`.
pub fn format_duration(minutes: Option<f64>) -> String {
    match minutes {
        Some(m) if m.is_finite() => {
            let hours = (m / 60.0).floor() as i64;
            let mins = m.rem_euclid(60.0).floor() as i64;
            format!("{}h {}m", hours, mins)
        }
        _ => "0m".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// Per-trade PNL with running total, oldest first. Trades without `updatedTime` are skipped.
pub fn detailed_series(trades: &[NormalizedTrade]) -> Vec<PnlPoint> {
    let mut dated: Vec<(DateTime<Utc>, f64)> = trades
        .iter()
        .filter_map(|t| t.updated_time.map(|u| (u, t.closed_pnl.unwrap_or(0.0))))
        .collect();
    dated.sort_by_key(|(time, _)| *time);
    running_total(dated)
}

/// Per-bucket PNL with running total.
pub fn aggregated_series(buckets: &[AggregateBucket]) -> Vec<PnlPoint> {
    running_total(buckets.iter().map(|b| (b.start, b.closed_pnl)).collect())
}

fn running_total(points: Vec<(DateTime<Utc>, f64)>) -> Vec<PnlPoint> {
    let mut cumulative = 0.0;
    points
        .into_iter()
        .map(|(time, pnl)| {
            cumulative += pnl;
            PnlPoint {
                time,
                pnl,
                cumulative_pnl: cumulative,
            }
        })
        .collect()
}
