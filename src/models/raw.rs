use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// RawTradeRecord — One closed-PNL entry as returned by the API
// ---------------------------------------------------------------------------

/// A closed position event exactly as reported by `GET /v5/position/closed-pnl`.
///
/// Numeric and timestamp fields arrive as strings (occasionally as JSON
/// numbers) and are kept in textual form; coercion happens in
/// [`normalize`](crate::normalize).
///
/// ```json
/// {
///     "symbol": "ETHUSDT",
///     "orderType": "Market",
///     "leverage": "3",
///     "updatedTime": "1672214887236",
///     "side": "Sell",
///     "orderId": "5a373bfe-188d-4913-9c81-d57ab5be8068",
///     "closedPnl": "-47.4065323",
///     "avgEntryPrice": "1194.97516667",
///     "qty": "3",
///     "cumEntryValue": "3584.9255",
///     "createdTime": "1672214887231",
///     "orderPrice": "1122.95",
///     "closedSize": "3",
///     "avgExitPrice": "1180.59833333",
///     "execType": "Trade",
///     "fillCount": "4",
///     "cumExitValue": "3541.795"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTradeRecord {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub closed_size: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub cum_entry_value: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub avg_entry_price: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub avg_exit_price: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub closed_pnl: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub fill_count: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub created_time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub updated_time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub order_type: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub exec_type: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub leverage: Option<String>,
}

/// Accept a string, number, bool or null and keep its textual form.
fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

// ---------------------------------------------------------------------------
// ClosedPnlPage — One page of the cursor chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPnlPage {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub list: Vec<RawTradeRecord>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

impl ClosedPnlPage {
    /// Cursor for the next page, if the API returned a non-empty one.
    pub fn cursor(&self) -> Option<&str> {
        self.next_page_cursor
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }
}
