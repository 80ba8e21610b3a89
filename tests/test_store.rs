//! Trade store integration tests: round trip, range queries, and atomic replace.

mod common;

use bybit_pnl::normalize::normalize;
use bybit_pnl::{Connection, PnlError, TradeStore};
use common::{at, raw_trade, setup_store, trade};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn replace_then_load_round_trips_normalized_trades() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);

    let raw = vec![
        raw_trade("BTCUSDT", "Sell", 0.5, 60000.0, 120.5, at(2024, 5, 1, 0), at(2024, 5, 1, 3)),
        raw_trade("ETHUSDT", "Buy", 2.0, 3000.0, -45.25, at(2024, 5, 2, 8), at(2024, 5, 2, 9)),
    ];
    let trades = normalize(&raw);

    assert_eq!(store.replace_all(&trades).unwrap(), 2);
    let loaded = store.load_all().unwrap();

    assert_eq!(loaded, trades);
}

#[test]
fn missing_fields_round_trip_as_none() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);

    let mut raw = raw_trade("BTCUSDT", "Sell", 1.0, 100.0, 1.0, at(2024, 5, 1, 0), at(2024, 5, 1, 1));
    raw.side = None;
    raw.closed_pnl = Some("n/a".to_string());
    raw.created_time = None;
    let trades = normalize(&[raw]);

    store.replace_all(&trades).unwrap();
    let loaded = store.load_all().unwrap();

    assert_eq!(loaded[0].side, None);
    assert_eq!(loaded[0].closed_pnl, None);
    assert_eq!(loaded[0].created_time, None);
    assert_eq!(loaded[0].trade_duration_minutes, None);
    assert_eq!(loaded, trades);
}

#[test]
fn load_all_preserves_insertion_order() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    let trades = vec![
        trade("ETHUSDT", 1.0, 100.0, at(2024, 5, 3, 0)),
        trade("BTCUSDT", 2.0, 100.0, at(2024, 5, 1, 0)),
    ];

    store.replace_all(&trades).unwrap();

    let symbols: Vec<String> = store.load_all().unwrap().into_iter().map(|t| t.symbol).collect();
    assert_eq!(symbols, ["ETHUSDT", "BTCUSDT"]);
}

// ---------------------------------------------------------------------------
// Replace semantics
// ---------------------------------------------------------------------------

#[test]
fn replace_all_overwrites_previous_contents() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);

    store
        .replace_all(&[
            trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0)),
            trade("BTCUSDT", 2.0, 100.0, at(2024, 5, 2, 0)),
        ])
        .unwrap();
    store
        .replace_all(&[trade("ETHUSDT", 3.0, 100.0, at(2024, 5, 3, 0))])
        .unwrap();

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.symbols().unwrap(), ["ETHUSDT"]);
}

#[test]
fn replace_with_empty_clears_table() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    store
        .replace_all(&[trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0))])
        .unwrap();

    assert_eq!(store.replace_all(&[]).unwrap(), 0);
    assert!(store.is_empty().unwrap());
}

#[test]
fn failed_transaction_leaves_table_untouched() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    store
        .replace_all(&[
            trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0)),
            trade("ETHUSDT", 2.0, 100.0, at(2024, 5, 2, 0)),
        ])
        .unwrap();

    let result: bybit_pnl::Result<()> = conn.in_transaction(|c| {
        c.execute_batch("DELETE FROM trades")?;
        Err(PnlError::InvalidArgument("abort".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(store.count().unwrap(), 2);
}

// ---------------------------------------------------------------------------
// Range queries
// ---------------------------------------------------------------------------

#[test]
fn time_range_bounds_are_inclusive() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    store
        .replace_all(&[
            trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0)),
            trade("BTCUSDT", 2.0, 100.0, at(2024, 5, 2, 0)),
            trade("BTCUSDT", 3.0, 100.0, at(2024, 5, 3, 0)),
            trade("BTCUSDT", 4.0, 100.0, at(2024, 5, 4, 0)),
        ])
        .unwrap();

    let hits = store
        .query_by_time_range(Some(at(2024, 5, 2, 0)), Some(at(2024, 5, 3, 0)))
        .unwrap();

    let pnls: Vec<f64> = hits.iter().filter_map(|t| t.closed_pnl).collect();
    assert_eq!(pnls, vec![2.0, 3.0]);
}

#[test]
fn open_ended_range_and_ordering() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    store
        .replace_all(&[
            trade("BTCUSDT", 3.0, 100.0, at(2024, 5, 3, 0)),
            trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0)),
            trade("BTCUSDT", 2.0, 100.0, at(2024, 5, 2, 0)),
        ])
        .unwrap();

    let all = store.query_by_time_range(None, None).unwrap();
    let pnls: Vec<f64> = all.iter().filter_map(|t| t.closed_pnl).collect();
    assert_eq!(pnls, vec![1.0, 2.0, 3.0]);

    let since = store.query_by_time_range(Some(at(2024, 5, 2, 0)), None).unwrap();
    assert_eq!(since.len(), 2);
}

#[test]
fn query_filters_by_symbol() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    store
        .replace_all(&[
            trade("BTCUSDT", 1.0, 100.0, at(2024, 5, 1, 0)),
            trade("ETHUSDT", 2.0, 100.0, at(2024, 5, 1, 1)),
            trade("BTCUSDT", 3.0, 100.0, at(2024, 5, 1, 2)),
        ])
        .unwrap();

    let btc = store.query(Some("BTCUSDT"), None, None).unwrap();
    assert_eq!(btc.len(), 2);
    assert!(btc.iter().all(|t| t.symbol == "BTCUSDT"));
    assert_eq!(store.symbols().unwrap(), ["BTCUSDT", "ETHUSDT"]);
}

#[test]
fn empty_store_queries() {
    let conn = setup_store();
    let store = TradeStore::new(&conn);
    assert!(store.is_empty().unwrap());
    assert!(store.load_all().unwrap().is_empty());
    assert!(store.symbols().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// File-backed databases
// ---------------------------------------------------------------------------

#[test]
fn file_database_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("main_trades.duckdb");
    let trades = vec![trade("BTCUSDT", 7.5, 150.0, at(2024, 5, 1, 0))];

    {
        let conn = Connection::open(&path).unwrap();
        let store = TradeStore::new(&conn);
        store.ensure_schema().unwrap();
        store.replace_all(&trades).unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(conn.path(), Some(path.as_path()));
    let store = TradeStore::new(&conn);
    store.ensure_schema().unwrap();
    assert_eq!(store.load_all().unwrap(), trades);
}
