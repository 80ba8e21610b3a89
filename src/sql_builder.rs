//! SQL builder with parameterized query construction.
//!
//! All caller-supplied values go through DuckDB's parameter binding (`?` placeholders),
//! never through string interpolation. Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use bybit_pnl::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("trades")
//!     .where_eq("symbol", "BTCUSDT")
//!     .where_between_ms("\"updatedTime\"", Some(1_700_000_000_000), None)
//!     .order_by(&["\"updatedTime\" ASC"])
//!     .build();
//! ```

/// Builds parameterized SQL queries safely.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_by_cols: Vec<String>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add an equality condition: `{column} = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", column));
        self.params.push(value.to_string());
        self
    }

    /// Inclusive bounds on an epoch-millisecond BIGINT column. `None` leaves that side open.
    pub fn where_between_ms(
        &mut self,
        column: &str,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    ) -> &mut Self {
        if let Some(from) = from_ms {
            self.where_clauses
                .push(format!("{} >= CAST(? AS BIGINT)", column));
            self.params.push(from.to_string());
        }
        if let Some(to) = to_ms {
            self.where_clauses
                .push(format!("{} <= CAST(? AS BIGINT)", column));
            self.params.push(to.to_string());
        }
        self
    }

    /// Add ORDER BY clauses (e.g. `"symbol ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<String>) {
        let mut parts = vec![
            format!("SELECT {}", self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        (parts.join("\n"), self.params.clone())
    }
}
