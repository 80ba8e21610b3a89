//! Drives the planner and fetcher over a full date range.
//!
//! Intervals are fetched strictly one after another. A consecutive-failure
//! circuit breaker stops the run early; whatever was collected up to that
//! point is still returned.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use crate::client::ClosedPnlApi;
use crate::config;
use crate::error::{PnlError, Result};
use crate::fetcher::{fetch_all, FetchFilters};
use crate::models::RawTradeRecord;
use crate::planner::{plan_intervals, Interval};

/// Result of one retrieval run.
#[derive(Debug, Default)]
pub struct Retrieval {
    /// Records from every attempted interval, in interval order.
    pub records: Vec<RawTradeRecord>,
    pub intervals_planned: usize,
    pub intervals_attempted: usize,
    /// Intervals whose fetch ended with an error.
    pub failed_intervals: Vec<Interval>,
    /// True when the breaker tripped and the run stopped early.
    pub circuit_open: bool,
    pub warnings: Vec<String>,
}

impl Retrieval {
    pub fn is_complete(&self) -> bool {
        self.failed_intervals.is_empty() && !self.circuit_open
    }
}

/// Retrieval settings. See [`Retriever::retrieve`].
#[derive(Debug, Clone)]
pub struct Retriever {
    span_days: i64,
    failure_threshold: usize,
    request_pause: Duration,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            span_days: config::DEFAULT_SPAN_DAYS,
            failure_threshold: config::CIRCUIT_BREAKER_THRESHOLD,
            request_pause: Duration::from_millis(100),
        }
    }
}

impl Retriever {
    /// Create a retriever with the given interval span.
    ///
    /// The span must be at least one day and strictly below the API's
    /// maximum window.
    pub fn new(span_days: i64, request_pause: Duration) -> Result<Self> {
        if span_days < 1 || span_days >= config::API_MAX_WINDOW_DAYS {
            return Err(PnlError::Config(format!(
                "interval span must be between 1 and {} days, got {}",
                config::API_MAX_WINDOW_DAYS - 1,
                span_days
            )));
        }
        Ok(Self {
            span_days,
            request_pause,
            ..Self::default()
        })
    }

    pub fn span_days(&self) -> i64 {
        self.span_days
    }

    /// Fetch all closed PNL between `start` and `end` (inclusive of `end`'s day).
    ///
    /// `end` defaults to now and `start` to one year before `end`. Never fails:
    /// request errors are reported through [`Retrieval::failed_intervals`]
    /// and [`Retrieval::warnings`].
    pub fn retrieve<A: ClosedPnlApi>(
        &self,
        api: &A,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filters: &FetchFilters,
    ) -> Retrieval {
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or(end - ChronoDuration::days(365));

        let plan = match plan_intervals(start, end, self.span_days) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "could not plan retrieval intervals");
                return Retrieval {
                    warnings: vec![e.to_string()],
                    ..Retrieval::default()
                };
            }
        };
        info!(
            %start,
            %end,
            intervals = plan.len(),
            symbol = filters.symbol.as_deref().unwrap_or("*"),
            "retrieving closed pnl"
        );
        self.retrieve_intervals(api, &plan, filters)
    }

    /// Fetch an explicit list of intervals in the given order.
    ///
    /// Identical intervals are fetched once. Useful for retrying
    /// [`Retrieval::failed_intervals`] from an earlier run.
    pub fn retrieve_intervals<A: ClosedPnlApi>(
        &self,
        api: &A,
        plan: &[Interval],
        filters: &FetchFilters,
    ) -> Retrieval {
        let mut out = Retrieval {
            intervals_planned: plan.len(),
            ..Retrieval::default()
        };

        let mut seen: HashSet<Interval> = HashSet::new();
        let mut consecutive_failures = 0usize;

        for &interval in plan {
            if !seen.insert(interval) {
                debug!(start = %interval.start, end = %interval.end, "skipping duplicate interval");
                continue;
            }

            out.intervals_attempted += 1;
            let outcome = fetch_all(api, &interval, filters, self.request_pause);
            let fetched = outcome.records.len();
            out.records.extend(outcome.records);

            match outcome.error {
                None => consecutive_failures = 0,
                Some(e) => {
                    // an interval that yielded pages before failing still resets the breaker
                    if fetched > 0 {
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures += 1;
                    }
                    out.failed_intervals.push(interval);
                    out.warnings.push(format!(
                        "failed to fetch {} - {}: {}",
                        interval.start, interval.end, e
                    ));
                }
            }

            if consecutive_failures >= self.failure_threshold {
                let msg = format!(
                    "stopped after {} consecutive failed intervals; returning {} records retrieved so far",
                    consecutive_failures,
                    out.records.len()
                );
                warn!(failures = consecutive_failures, records = out.records.len(), "{}", msg);
                out.warnings.push(msg);
                out.circuit_open = true;
                break;
            }
        }

        info!(
            records = out.records.len(),
            attempted = out.intervals_attempted,
            failed = out.failed_intervals.len(),
            "retrieval finished"
        );
        out
    }
}
