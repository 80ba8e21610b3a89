//! Raw API records -> typed [`NormalizedTrade`]s.
//!
//! Coercion is permissive: a field that doesn't parse becomes `None` and the
//! record is kept.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{NormalizedTrade, RawTradeRecord, Side};

/// Normalize a batch of raw records. Empty input gives empty output.
pub fn normalize(records: &[RawTradeRecord]) -> Vec<NormalizedTrade> {
    records.iter().map(normalize_record).collect()
}

pub fn normalize_record(raw: &RawTradeRecord) -> NormalizedTrade {
    let closed_size = parse_f64(raw.closed_size.as_deref());
    let avg_entry_price = parse_f64(raw.avg_entry_price.as_deref());
    let closed_pnl = parse_f64(raw.closed_pnl.as_deref());
    let created_time = parse_epoch_ms(raw.created_time.as_deref());
    let updated_time = parse_epoch_ms(raw.updated_time.as_deref());

    let invested_capital = match (closed_size, avg_entry_price) {
        (Some(size), Some(price)) => Some(size * price),
        _ => None,
    };

    let trade_duration_minutes = match (created_time, updated_time) {
        (Some(created), Some(updated)) => {
            if updated < created {
                debug!(
                    symbol = %raw.symbol,
                    %created,
                    %updated,
                    "closed position updated before it was created"
                );
            }
            Some((updated - created).num_milliseconds() as f64 / 60_000.0)
        }
        _ => None,
    };

    NormalizedTrade {
        symbol: raw.symbol.clone(),
        side: position_side(raw.side.as_deref()),
        closed_size,
        cum_entry_value: parse_f64(raw.cum_entry_value.as_deref()),
        avg_entry_price,
        avg_exit_price: parse_f64(raw.avg_exit_price.as_deref()),
        closed_pnl,
        fill_count: parse_i64(raw.fill_count.as_deref()),
        created_time,
        updated_time,
        invested_capital,
        pct: pct_return(closed_pnl, invested_capital),
        trade_duration_minutes,
    }
}

/// Direction of the position that was closed.
///
/// The exchange reports the side of the closing order, so a long position
/// closes with a `Sell`. Inverting yields the position's own direction.
pub fn position_side(closing_side: Option<&str>) -> Option<Side> {
    closing_side
        .and_then(|s| s.parse::<Side>().ok())
        .map(Side::inverted)
}

/// `pnl / invested * 100` rounded to two decimals; `None` for zero or unknown capital.
pub fn pct_return(pnl: Option<f64>, invested: Option<f64>) -> Option<f64> {
    match (pnl, invested) {
        (Some(pnl), Some(invested)) if invested != 0.0 => Some(round2(pnl / invested * 100.0)),
        _ => None,
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn parse_f64(text: Option<&str>) -> Option<f64> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_i64(text: Option<&str>) -> Option<i64> {
    let s = text.map(str::trim).filter(|s| !s.is_empty())?;
    s.parse::<i64>()
        .ok()
        .or_else(|| parse_f64(Some(s)).map(|v| v as i64))
}

fn parse_epoch_ms(text: Option<&str>) -> Option<DateTime<Utc>> {
    parse_i64(text).and_then(DateTime::from_timestamp_millis)
}
