//! Drains the closed-PNL cursor chain for one planned interval.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{ClosedPnlApi, ClosedPnlRequest};
use crate::config;
use crate::error::PnlError;
use crate::models::RawTradeRecord;
use crate::planner::Interval;

/// Optional request filters shared by every page of a retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchFilters {
    pub symbol: Option<String>,
}

impl FetchFilters {
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
        }
    }
}

/// Records gathered for one interval, plus the error that cut it short, if any.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawTradeRecord>,
    /// Number of requests issued, including a failed one.
    pub requests: usize,
    pub error: Option<PnlError>,
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetch every page of closed PNL inside `interval`.
///
/// Pages are appended in response order. Paging stops when a page comes back
/// empty or without a cursor. A failed request ends this interval only: the
/// records already collected are returned with the error attached.
///
/// `pause` is slept between consecutive requests to stay under the account's
/// rate limit.
pub fn fetch_all<A: ClosedPnlApi>(
    api: &A,
    interval: &Interval,
    filters: &FetchFilters,
    pause: Duration,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let mut cursor: Option<String> = None;

    loop {
        if outcome.requests > 0 && !pause.is_zero() {
            thread::sleep(pause);
        }

        let request = ClosedPnlRequest {
            category: config::CATEGORY_LINEAR.to_string(),
            limit: config::MAX_PAGE_LIMIT,
            cursor: cursor.take(),
            start_time: Some(interval.start.timestamp_millis()),
            // The API treats endTime as inclusive; stop 1 ms short so adjacent
            // intervals never share a boundary instant.
            end_time: Some(interval.end.timestamp_millis() - 1),
            symbol: filters.symbol.clone(),
        };
        outcome.requests += 1;

        let page = match api.list_closed_pnl(&request) {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    start = %interval.start,
                    end = %interval.end,
                    collected = outcome.records.len(),
                    error = %e,
                    "closed-pnl request failed; abandoning interval"
                );
                outcome.error = Some(e);
                break;
            }
        };

        if page.list.is_empty() {
            break;
        }

        let next = page.cursor().map(str::to_string);
        debug!(
            start = %interval.start,
            page = outcome.requests,
            records = page.list.len(),
            has_next = next.is_some(),
            "fetched closed-pnl page"
        );
        outcome.records.extend(page.list);

        match next {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    outcome
}
