//! Bybit closed-PNL SDK for Rust.
//!
//! Fetches an account's closed-position history from the Bybit v5 REST API,
//! caches it in a per-account DuckDB file, and aggregates it into day, week,
//! or month buckets for reporting.
//!
//! # Quick start
//!
//! ```no_run
//! use bybit_pnl::{Granularity, Period, PnlSdk};
//!
//! let sdk = PnlSdk::builder().account("main").build().unwrap();
//!
//! // Fill the local cache on first run, then pull the last week again
//! sdk.ensure_initial_data().unwrap();
//! let report = sdk.refresh_recent(7).unwrap();
//! for warning in &report.warnings {
//!     eprintln!("{}", warning);
//! }
//!
//! // Weekly buckets over the last three months
//! let buckets = sdk.aggregate(Period::ThreeMonths, Granularity::Week, None).unwrap();
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod report;
pub mod retrieval;
pub mod sql_builder;
pub mod store;

pub use aggregate::{aggregate, Granularity};
pub use client::{BybitClient, ClosedPnlApi, ClosedPnlRequest};
pub use config::{AccountsConfig, Credentials};
pub use connection::Connection;
pub use error::{PnlError, Result};
pub use fetcher::{fetch_all, FetchFilters, FetchOutcome};
pub use models::{AggregateBucket, NormalizedTrade, PnlPoint, RawTradeRecord, Side, Summary};
pub use normalize::normalize;
pub use planner::{plan_intervals, Interval};
pub use report::Period;
pub use retrieval::{Retrieval, Retriever};
pub use sql_builder::SqlBuilder;
pub use store::TradeStore;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{info, info_span, warn};

// ---------------------------------------------------------------------------
// PnlSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`PnlSdk`] instance.
///
/// Use [`PnlSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](PnlSdkBuilder::build) to create the SDK.
pub struct PnlSdkBuilder {
    account: String,
    credentials: Option<Credentials>,
    accounts: Option<AccountsConfig>,
    data_dir: Option<PathBuf>,
    in_memory: bool,
    timeout: Duration,
    span_days: i64,
    request_pause: Duration,
    base_url: Option<String>,
}

impl Default for PnlSdkBuilder {
    fn default() -> Self {
        Self {
            account: config::DEFAULT_ACCOUNT.to_string(),
            credentials: None,
            accounts: None,
            data_dir: None,
            in_memory: false,
            timeout: Duration::from_secs(30),
            span_days: config::DEFAULT_SPAN_DAYS,
            request_pause: Duration::from_millis(100),
            base_url: None,
        }
    }
}

impl PnlSdkBuilder {
    /// Select the named account. Defaults to `"main"`.
    pub fn account(mut self, name: &str) -> Self {
        self.account = name.to_string();
        self
    }

    /// Use these credentials instead of looking the account up.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Resolve the account from this map instead of the environment.
    pub fn accounts(mut self, accounts: AccountsConfig) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Directory holding the per-account database files.
    ///
    /// Defaults to the platform data directory (e.g. `~/.local/share/bybit-pnl`).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep trades in an in-memory database instead of a file.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Days per API request window. Must be below the API's 7-day limit; defaults to 6.
    pub fn span_days(mut self, days: i64) -> Self {
        self.span_days = days;
        self
    }

    /// Pause between consecutive page requests. Defaults to 100 ms.
    pub fn request_pause(mut self, pause: Duration) -> Self {
        self.request_pause = pause;
        self
    }

    /// Override the REST base URL.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// Build the SDK with an authenticated [`BybitClient`].
    ///
    /// Unknown accounts, missing credentials, and invalid spans fail here,
    /// before any request is made.
    pub fn build(mut self) -> Result<PnlSdk<BybitClient>> {
        let credentials = match self.credentials.take() {
            Some(creds) => creds,
            None => {
                let accounts = self.accounts.take().unwrap_or_else(AccountsConfig::from_env);
                accounts.get(&self.account)?.clone()
            }
        };
        let client = BybitClient::new(credentials, self.timeout, self.base_url.take())?;
        self.build_with_api(client)
    }

    /// Build the SDK around any [`ClosedPnlApi`] implementation.
    pub fn build_with_api<A: ClosedPnlApi>(self, api: A) -> Result<PnlSdk<A>> {
        let retriever = Retriever::new(self.span_days, self.request_pause)?;

        let conn = if self.in_memory {
            Connection::open_in_memory()?
        } else {
            let dir = self.data_dir.unwrap_or_else(config::default_data_dir);
            Connection::open(dir.join(config::database_file_name(&self.account)))?
        };
        TradeStore::new(&conn).ensure_schema()?;

        Ok(PnlSdk {
            account: config::account_slug(&self.account),
            api,
            conn,
            retriever,
        })
    }
}

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

/// Outcome of a fetch: normalized trades plus how the retrieval went.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub trades: Vec<NormalizedTrade>,
    /// Rows written to the store, if the store was updated.
    pub stored: Option<usize>,
    pub intervals_attempted: usize,
    pub failed_intervals: Vec<Interval>,
    pub circuit_open: bool,
    pub warnings: Vec<String>,
}

impl SyncReport {
    /// Whether the fetched trades may overwrite stored ones.
    ///
    /// A tripped breaker leaves later intervals unfetched, so their stored
    /// trades cannot be told apart from trades that no longer exist.
    fn writable(&self) -> bool {
        !self.trades.is_empty() && !self.circuit_open
    }

    fn from_retrieval(retrieval: Retrieval) -> Self {
        Self {
            trades: normalize(&retrieval.records),
            stored: None,
            intervals_attempted: retrieval.intervals_attempted,
            failed_intervals: retrieval.failed_intervals,
            circuit_open: retrieval.circuit_open,
            warnings: retrieval.warnings,
        }
    }
}

/// Combine stored and freshly fetched trades for a replace-all.
///
/// - Stored trades updated before `keep_before` are kept.
/// - For an interval whose fetch failed, the stored trades in it are kept and
///   the partial fresh ones dropped; when nothing was stored there, the
///   partial fresh trades are used instead.
/// - Every other fresh trade is taken as is.
///
/// Stored trades without `updatedTime` are dropped.
fn merge_trades(
    stored: Vec<NormalizedTrade>,
    fresh: &[NormalizedTrade],
    failed: &[Interval],
    keep_before: Option<DateTime<Utc>>,
) -> Vec<NormalizedTrade> {
    let failed_interval = |t: &NormalizedTrade| -> Option<Interval> {
        let updated = t.updated_time?;
        failed.iter().copied().find(|iv| iv.contains(updated))
    };

    let stored_covers: HashSet<Interval> = stored.iter().filter_map(failed_interval).collect();

    let mut merged: Vec<NormalizedTrade> = stored
        .into_iter()
        .filter(|t| {
            let before = match (t.updated_time, keep_before) {
                (Some(updated), Some(cutoff)) => updated < cutoff,
                _ => false,
            };
            before || failed_interval(t).is_some()
        })
        .collect();

    merged.extend(
        fresh
            .iter()
            .filter(|&t| failed_interval(t).map_or(true, |iv| !stored_covers.contains(&iv)))
            .cloned(),
    );
    merged
}

// ---------------------------------------------------------------------------
// PnlSdk
// ---------------------------------------------------------------------------

/// One account context: an API client and the account's trade database.
///
/// Both are released when the SDK is dropped.
pub struct PnlSdk<A: ClosedPnlApi = BybitClient> {
    account: String,
    api: A,
    conn: Connection,
    retriever: Retriever,
}

impl PnlSdk<BybitClient> {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> PnlSdkBuilder {
        PnlSdkBuilder::default()
    }
}

impl<A: ClosedPnlApi> PnlSdk<A> {
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Access the trade store.
    pub fn store(&self) -> TradeStore<'_> {
        TradeStore::new(&self.conn)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // -- Retrieval ---------------------------------------------------------

    /// Fetch raw closed-PNL records; see [`Retriever::retrieve`].
    pub fn retrieve(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Retrieval {
        let _span = info_span!("account", name = %self.account).entered();
        let filters = FetchFilters {
            symbol: symbol.map(str::to_string),
        };
        self.retriever.retrieve(&self.api, start, end, &filters)
    }

    /// Fetch and normalize, without touching the store.
    pub fn fetch_trades(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> SyncReport {
        SyncReport::from_retrieval(self.retrieve(start, end, symbol))
    }

    // -- Sync workflows ----------------------------------------------------

    /// Populate an empty store with the last 7 days.
    ///
    /// Returns whether the store holds any trades afterwards.
    pub fn ensure_initial_data(&self) -> Result<bool> {
        let store = self.store();
        if !store.is_empty()? {
            return Ok(true);
        }
        let _span = info_span!("account", name = %self.account).entered();
        info!("no stored trades; loading the last 7 days");

        let end = Utc::now();
        let report = self.fetch_trades(Some(end - ChronoDuration::days(7)), Some(end), None);
        if report.trades.is_empty() {
            warn!("no closed pnl returned for the initial load");
            return Ok(false);
        }
        store.replace_all(&report.trades)?;
        Ok(true)
    }

    /// Re-fetch the last `days` days and merge them into the store.
    ///
    /// The fetch window starts at UTC midnight `days` days ago. Stored trades
    /// updated before it are kept; everything inside it is replaced by the
    /// fresh data, except in intervals whose fetch failed, where the stored
    /// trades win (see [`merge_trades`]). Nothing is written when the fetch
    /// returns no trades or the circuit breaker tripped.
    pub fn refresh_recent(&self, days: i64) -> Result<SyncReport> {
        let end = Utc::now();
        let window_start = planner::floor_to_day(end - ChronoDuration::days(days));
        let mut report = self.fetch_trades(Some(window_start), Some(end), None);

        let _span = info_span!("account", name = %self.account).entered();
        if !report.writable() {
            warn!(days, "refresh incomplete or empty; store left unchanged");
            return Ok(report);
        }

        let store = self.store();
        let merged = merge_trades(
            store.load_all()?,
            &report.trades,
            &report.failed_intervals,
            Some(window_start),
        );
        report.stored = Some(store.replace_all(&merged)?);
        info!(
            stored = merged.len(),
            fresh = report.trades.len(),
            failed_intervals = report.failed_intervals.len(),
            "merged refreshed trades"
        );
        Ok(report)
    }

    /// Fetch the last `days` days and replace the store with them.
    ///
    /// Stored trades inside intervals whose fetch failed are carried over.
    /// The store is left unchanged when the fetch returns no trades or the
    /// circuit breaker tripped.
    pub fn load_history(&self, days: i64) -> Result<SyncReport> {
        let end = Utc::now();
        let mut report = self.fetch_trades(Some(end - ChronoDuration::days(days)), Some(end), None);
        if !report.writable() {
            warn!(account = %self.account, days, "history load incomplete or empty; store left unchanged");
            return Ok(report);
        }

        let store = self.store();
        let trades = if report.failed_intervals.is_empty() {
            report.trades.clone()
        } else {
            merge_trades(store.load_all()?, &report.trades, &report.failed_intervals, None)
        };
        report.stored = Some(store.replace_all(&trades)?);
        Ok(report)
    }

    // -- Reporting ---------------------------------------------------------

    /// Stored trades within `period` (ending now), oldest first.
    pub fn trades_in(&self, period: Period, symbol: Option<&str>) -> Result<Vec<NormalizedTrade>> {
        let now = Utc::now();
        self.store().query(symbol, period.start(now), Some(now))
    }

    /// Bucketed statistics over stored trades within `period`.
    pub fn aggregate(
        &self,
        period: Period,
        granularity: Granularity,
        symbol: Option<&str>,
    ) -> Result<Vec<AggregateBucket>> {
        let trades = self.trades_in(period, None)?;
        Ok(aggregate(&trades, granularity, symbol))
    }

    /// Headline statistics over stored trades within `period`.
    pub fn summary(&self, period: Period) -> Result<Summary> {
        Ok(report::summarize(&self.trades_in(period, None)?))
    }

    /// Consume the SDK and release the HTTP client and database connection.
    pub fn close(self) {
        drop(self);
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl<A: ClosedPnlApi> fmt::Display for PnlSdk<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let db = self
            .conn
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        write!(
            f,
            "PnlSdk(account={}, db={}, span_days={})",
            self.account,
            db,
            self.retriever.span_days()
        )
    }
}
