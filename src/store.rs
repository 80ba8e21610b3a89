//! Persistence of normalized trades in the per-account `trades` table.

use chrono::{DateTime, Utc};
use duckdb::params;
use tracing::info;

use crate::connection::Connection;
use crate::error::Result;
use crate::models::NormalizedTrade;
use crate::sql_builder::SqlBuilder;

pub const TRADES_TABLE: &str = "trades";

const COLUMNS: [&str; 13] = [
    "\"symbol\"",
    "\"side\"",
    "\"closedSize\"",
    "\"cumEntryValue\"",
    "\"avgEntryPrice\"",
    "\"avgExitPrice\"",
    "\"closedPnl\"",
    "\"fillCount\"",
    "\"createdTime\"",
    "\"updatedTime\"",
    "\"investedCapital\"",
    "\"pct\"",
    "\"tradeDurationMinutes\"",
];

const CREATE_TRADES: &str = r#"
    CREATE TABLE IF NOT EXISTS trades (
        "symbol" VARCHAR NOT NULL,
        "side" VARCHAR,
        "closedSize" DOUBLE,
        "cumEntryValue" DOUBLE,
        "avgEntryPrice" DOUBLE,
        "avgExitPrice" DOUBLE,
        "closedPnl" DOUBLE,
        "fillCount" BIGINT,
        "createdTime" BIGINT,
        "updatedTime" BIGINT,
        "investedCapital" DOUBLE,
        "pct" DOUBLE,
        "tradeDurationMinutes" DOUBLE
    )
"#;

/// Load / replace / range-query interface over the `trades` table.
///
/// Timestamps are stored as BIGINT epoch milliseconds.
pub struct TradeStore<'a> {
    conn: &'a Connection,
}

impl<'a> TradeStore<'a> {
    /// Create a new `TradeStore` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the `trades` table if it doesn't exist.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_TRADES)
    }

    /// Every stored trade, in insertion order.
    pub fn load_all(&self) -> Result<Vec<NormalizedTrade>> {
        let (sql, params) = SqlBuilder::new(TRADES_TABLE)
            .select(&COLUMNS)
            .order_by(&["rowid ASC"])
            .build();
        self.conn.execute_into(&sql, &params)
    }

    /// Overwrite the table with `trades`.
    ///
    /// Runs in a single transaction: on any failure the previous contents
    /// are left untouched.
    pub fn replace_all(&self, trades: &[NormalizedTrade]) -> Result<usize> {
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TRADES_TABLE,
            COLUMNS.join(", "),
            vec!["?"; COLUMNS.len()].join(", ")
        );

        let written = self.conn.in_transaction(|conn| {
            conn.execute_batch(&format!("DELETE FROM {}", TRADES_TABLE))?;
            let mut stmt = conn.raw().prepare(&insert)?;
            for t in trades {
                stmt.execute(params![
                    t.symbol,
                    t.side.map(|s| s.as_str()),
                    t.closed_size,
                    t.cum_entry_value,
                    t.avg_entry_price,
                    t.avg_exit_price,
                    t.closed_pnl,
                    t.fill_count,
                    t.created_time.map(|d| d.timestamp_millis()),
                    t.updated_time.map(|d| d.timestamp_millis()),
                    t.invested_capital,
                    t.pct,
                    t.trade_duration_minutes,
                ])?;
            }
            Ok(trades.len())
        })?;

        info!(
            trades = written,
            db = %self.conn.path().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".into()),
            "saved trades"
        );
        Ok(written)
    }

    /// Trades whose `updatedTime` falls within the inclusive bounds, oldest first.
    ///
    /// `None` leaves that side of the range open.
    pub fn query_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<NormalizedTrade>> {
        self.query(None, start, end)
    }

    /// Like [`query_by_time_range`](Self::query_by_time_range), optionally restricted to one symbol.
    pub fn query(
        &self,
        symbol: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<NormalizedTrade>> {
        let mut qb = SqlBuilder::new(TRADES_TABLE);
        qb.select(&COLUMNS);
        if let Some(sym) = symbol {
            qb.where_eq("\"symbol\"", sym);
        }
        qb.where_between_ms(
            "\"updatedTime\"",
            start.map(|t| t.timestamp_millis()),
            end.map(|t| t.timestamp_millis()),
        );
        qb.order_by(&["\"updatedTime\" ASC", "rowid ASC"]);

        let (sql, params) = qb.build();
        self.conn.execute_into(&sql, &params)
    }

    /// Number of stored trades.
    pub fn count(&self) -> Result<usize> {
        let value = self
            .conn
            .execute_scalar(&format!("SELECT COUNT(*) FROM {}", TRADES_TABLE), &[])?;
        Ok(value.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Distinct symbols, sorted.
    pub fn symbols(&self) -> Result<Vec<String>> {
        let rows = self.conn.execute(
            &format!(
                "SELECT DISTINCT \"symbol\" FROM {} ORDER BY \"symbol\"",
                TRADES_TABLE
            ),
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("symbol").and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }
}
