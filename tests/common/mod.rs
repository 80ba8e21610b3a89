//! Shared fixtures for the integration tests.
//!
//! Provides raw/normalized trade builders, an in-memory trade store, and two
//! `ClosedPnlApi` fakes: a scripted page queue and a small in-process
//! exchange that filters and pages a fixed record set like the real endpoint.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use bybit_pnl::{
    ClosedPnlApi, ClosedPnlRequest, Connection, NormalizedTrade, PnlError, RawTradeRecord,
    Result, TradeStore,
};
use bybit_pnl::models::ClosedPnlPage;
use chrono::{DateTime, TimeZone, Utc};

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// A raw record as the API would send it. `closing_side` is the exchange's side.
pub fn raw_trade(
    symbol: &str,
    closing_side: &str,
    size: f64,
    entry: f64,
    pnl: f64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
) -> RawTradeRecord {
    RawTradeRecord {
        symbol: symbol.to_string(),
        side: Some(closing_side.to_string()),
        closed_size: Some(size.to_string()),
        cum_entry_value: Some((size * entry).to_string()),
        avg_entry_price: Some(entry.to_string()),
        avg_exit_price: Some((entry + pnl / size).to_string()),
        closed_pnl: Some(pnl.to_string()),
        fill_count: Some("1".to_string()),
        created_time: Some(created.timestamp_millis().to_string()),
        updated_time: Some(updated.timestamp_millis().to_string()),
        order_id: Some(format!("order-{}-{}", symbol, updated.timestamp_millis())),
        order_type: Some("Market".to_string()),
        exec_type: Some("Trade".to_string()),
        leverage: Some("5".to_string()),
    }
}

/// A normalized trade with the given PNL and invested capital.
pub fn trade(symbol: &str, pnl: f64, invested: f64, updated: DateTime<Utc>) -> NormalizedTrade {
    NormalizedTrade {
        symbol: symbol.to_string(),
        side: Some(bybit_pnl::Side::Buy),
        closed_size: Some(1.0),
        cum_entry_value: Some(invested),
        avg_entry_price: Some(invested),
        avg_exit_price: Some(invested + pnl),
        closed_pnl: Some(pnl),
        fill_count: Some(1),
        created_time: Some(updated - chrono::Duration::minutes(30)),
        updated_time: Some(updated),
        invested_capital: Some(invested),
        pct: bybit_pnl::normalize::pct_return(Some(pnl), Some(invested)),
        trade_duration_minutes: Some(30.0),
    }
}

pub fn page(records: Vec<RawTradeRecord>, cursor: Option<&str>) -> ClosedPnlPage {
    ClosedPnlPage {
        category: Some("linear".to_string()),
        list: records,
        next_page_cursor: cursor.map(str::to_string),
    }
}

/// An in-memory connection with the `trades` table created.
pub fn setup_store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    TradeStore::new(&conn).ensure_schema().unwrap();
    conn
}

// ---------------------------------------------------------------------------
// ScriptedApi — Returns queued responses in order
// ---------------------------------------------------------------------------

/// Replays queued responses; once exhausted, answers with empty pages.
#[derive(Default)]
pub struct ScriptedApi {
    responses: RefCell<VecDeque<Result<ClosedPnlPage>>>,
    pub calls: RefCell<Vec<ClosedPnlRequest>>,
}

impl ScriptedApi {
    pub fn new(responses: Vec<Result<ClosedPnlPage>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ClosedPnlApi for ScriptedApi {
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage> {
        self.calls.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(page(Vec::new(), None)))
    }
}

// ---------------------------------------------------------------------------
// FnApi — Answers with a closure
// ---------------------------------------------------------------------------

pub struct FnApi<F> {
    f: F,
    pub calls: Cell<usize>,
}

impl<F> FnApi<F>
where
    F: Fn(&ClosedPnlRequest) -> Result<ClosedPnlPage>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            calls: Cell::new(0),
        }
    }
}

impl<F> ClosedPnlApi for FnApi<F>
where
    F: Fn(&ClosedPnlRequest) -> Result<ClosedPnlPage>,
{
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage> {
        self.calls.set(self.calls.get() + 1);
        (self.f)(request)
    }
}

pub fn transient_error() -> PnlError {
    PnlError::Api {
        ret_code: 10016,
        ret_msg: "Internal server error".to_string(),
    }
}

// ---------------------------------------------------------------------------
// FakeExchange — Filters by window and symbol, pages with an offset cursor
// ---------------------------------------------------------------------------

pub struct FakeExchange {
    records: Vec<RawTradeRecord>,
    pub calls: Cell<usize>,
}

impl FakeExchange {
    pub fn new(records: Vec<RawTradeRecord>) -> Self {
        Self {
            records,
            calls: Cell::new(0),
        }
    }
}

impl ClosedPnlApi for FakeExchange {
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage> {
        self.calls.set(self.calls.get() + 1);

        let matching: Vec<&RawTradeRecord> = self
            .records
            .iter()
            .filter(|r| {
                let updated: i64 = r.updated_time.as_deref().unwrap().parse().unwrap();
                request.start_time.map_or(true, |s| updated >= s)
                    && request.end_time.map_or(true, |e| updated <= e)
                    && request.symbol.as_deref().map_or(true, |s| s == r.symbol)
            })
            .collect();

        let offset: usize = request
            .cursor
            .as_deref()
            .map(|c| c.parse().unwrap())
            .unwrap_or(0);
        let limit = request.limit as usize;
        let list: Vec<RawTradeRecord> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|r| (*r).clone())
            .collect();
        let next = offset + list.len();
        let cursor = (next < matching.len()).then(|| next.to_string());

        Ok(page(list, cursor.as_deref()))
    }
}
