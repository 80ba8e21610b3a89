//! SqlBuilder tests for the query shapes the trade store issues.

use bybit_pnl::SqlBuilder;

#[test]
fn bare_builder_selects_everything() {
    let (sql, params) = SqlBuilder::new("trades").build();
    assert_eq!(sql, "SELECT *\nFROM trades");
    assert!(params.is_empty());
}

#[test]
fn symbol_and_window_query() {
    let (sql, params) = SqlBuilder::new("trades")
        .select(&["\"symbol\"", "\"closedPnl\""])
        .where_eq("\"symbol\"", "ETHUSDT")
        .where_between_ms("\"updatedTime\"", Some(1_000), Some(2_000))
        .order_by(&["\"updatedTime\" ASC", "rowid ASC"])
        .build();

    assert_eq!(
        sql,
        "SELECT \"symbol\", \"closedPnl\"\n\
         FROM trades\n\
         WHERE \"symbol\" = ? AND \"updatedTime\" >= CAST(? AS BIGINT) AND \"updatedTime\" <= CAST(? AS BIGINT)\n\
         ORDER BY \"updatedTime\" ASC, rowid ASC"
    );
    assert_eq!(params, vec!["ETHUSDT", "1000", "2000"]);
}

#[test]
fn open_window_sides_add_no_condition() {
    let (sql, params) = SqlBuilder::new("trades")
        .where_between_ms("\"updatedTime\"", None, Some(2_000))
        .build();
    assert!(!sql.contains(">="));
    assert_eq!(params, vec!["2000"]);

    let (sql, params) = SqlBuilder::new("trades")
        .where_between_ms("\"updatedTime\"", None, None)
        .build();
    assert!(!sql.contains("WHERE"));
    assert!(params.is_empty());
}

#[test]
fn values_are_bound_not_interpolated() {
    let (sql, params) = SqlBuilder::new("trades")
        .where_eq("\"symbol\"", "x'; DROP TABLE trades; --")
        .build();
    assert!(!sql.contains("DROP"));
    assert_eq!(params.len(), 1);
}
