//! Calendar bucketing of normalized trades.
//!
//! Buckets are keyed on `updatedTime` in UTC: calendar day, ISO week
//! (Monday 00:00), or calendar month. Buckets without trades are omitted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::PnlError;
use crate::models::{AggregateBucket, NormalizedTrade};
use crate::normalize::round2;

// ---------------------------------------------------------------------------
// Granularity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Dashboard timeframe code (`1d`, `1w`, `1M`).
    pub fn code(&self) -> &'static str {
        match self {
            Granularity::Day => "1d",
            Granularity::Week => "1w",
            Granularity::Month => "1M",
        }
    }

    /// Start of the bucket containing `t`.
    pub fn bucket_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = t.date_naive();
        let start: NaiveDate = match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        };
        start.and_time(NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Granularity {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // case sensitive: "1M" is a month, "1m" is not a supported code
        match s.trim() {
            "1d" | "D" | "day" => Ok(Granularity::Day),
            "1w" | "W" | "week" => Ok(Granularity::Week),
            "1M" | "M" | "month" => Ok(Granularity::Month),
            other => Err(PnlError::InvalidArgument(format!(
                "unsupported timeframe: {}",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Acc {
    trades: usize,
    wins: usize,
    fill_count: i64,
    closed_pnl: f64,
    invested: f64,
    duration_total: f64,
    duration_n: usize,
}

/// Bucket `trades` by `granularity`, optionally keeping only one symbol.
///
/// Trades without an `updatedTime` can't be placed and are skipped. The
/// bucket `pct` is capital weighted (Σ PNL / Σ invested capital), which
/// differs from the mean of per-trade percentages whenever sizes differ.
pub fn aggregate(
    trades: &[NormalizedTrade],
    granularity: Granularity,
    symbol: Option<&str>,
) -> Vec<AggregateBucket> {
    let mut buckets: BTreeMap<DateTime<Utc>, Acc> = BTreeMap::new();

    for trade in trades {
        if symbol.is_some_and(|s| s != trade.symbol) {
            continue;
        }
        let Some(updated) = trade.updated_time else {
            continue;
        };

        let acc = buckets.entry(granularity.bucket_start(updated)).or_default();
        acc.trades += 1;
        if trade.is_win() {
            acc.wins += 1;
        }
        acc.fill_count += trade.fill_count.unwrap_or(0);
        acc.closed_pnl += trade.closed_pnl.unwrap_or(0.0);
        acc.invested += trade.invested_capital.unwrap_or(0.0);
        if let Some(d) = trade.trade_duration_minutes {
            acc.duration_total += d;
            acc.duration_n += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(start, acc)| AggregateBucket {
            start,
            trades: acc.trades,
            fill_count: acc.fill_count,
            closed_pnl: acc.closed_pnl,
            win_rate: acc.wins as f64 / acc.trades as f64 * 100.0,
            duration_total_minutes: acc.duration_total,
            duration_avg_minutes: if acc.duration_n > 0 {
                acc.duration_total / acc.duration_n as f64
            } else {
                0.0
            },
            pct: if acc.invested != 0.0 {
                Some(round2(acc.closed_pnl / acc.invested * 100.0))
            } else {
                None
            },
        })
        .collect()
}
