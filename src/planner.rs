//! Splits a date range into windows the closed-PNL endpoint will accept.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::{PnlError, Result};

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Truncate an instant to 00:00:00 UTC of its day.
pub fn floor_to_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Plan consecutive, gapless intervals covering `[floor(start), floor(end) + 1 day)`.
///
/// `end` is inclusive of its whole calendar day. Each interval spans at most
/// `max_span_days` days; keep this below the API's hard window so rounding at
/// the boundaries can't push a request over the limit.
///
/// Returns an empty plan when `start >= end`.
pub fn plan_intervals(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span_days: i64,
) -> Result<Vec<Interval>> {
    if max_span_days <= 0 {
        return Err(PnlError::InvalidArgument(format!(
            "max_span_days must be positive, got {}",
            max_span_days
        )));
    }
    if start >= end {
        return Ok(Vec::new());
    }

    let span = Duration::days(max_span_days);
    let range_end = floor_to_day(end) + Duration::days(1);

    let mut intervals = Vec::new();
    let mut cursor = floor_to_day(start);
    while cursor < range_end {
        let next = (cursor + span).min(range_end);
        intervals.push(Interval::new(cursor, next));
        cursor = next;
    }

    Ok(intervals)
}
