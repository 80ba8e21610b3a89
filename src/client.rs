//! Remote API boundary: the closed-PNL endpoint and its Bybit v5 implementation.
//!
//! Requests are signed per the v5 scheme: `HMAC_SHA256(secret, timestamp +
//! api_key + recv_window + query_string)`, hex encoded, sent alongside the key,
//! timestamp and receive window headers.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use crate::config::{self, Credentials};
use crate::error::{PnlError, Result};
use crate::models::ClosedPnlPage;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// ClosedPnlRequest
// ---------------------------------------------------------------------------

/// Parameters of one `list closed PNL` call. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedPnlRequest {
    pub category: String,
    pub limit: u32,
    pub cursor: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub symbol: Option<String>,
}

impl Default for ClosedPnlRequest {
    fn default() -> Self {
        Self {
            category: config::CATEGORY_LINEAR.to_string(),
            limit: config::MAX_PAGE_LIMIT,
            cursor: None,
            start_time: None,
            end_time: None,
            symbol: None,
        }
    }
}

impl ClosedPnlRequest {
    /// Query pairs in the order they are sent and signed. `limit` is clamped to 1..=100.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("category", self.category.clone()),
            (
                "limit",
                self.limit.clamp(1, config::MAX_PAGE_LIMIT).to_string(),
            ),
        ];
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        if let Some(start) = self.start_time {
            pairs.push(("startTime", start.to_string()));
        }
        if let Some(end) = self.end_time {
            pairs.push(("endTime", end.to_string()));
        }
        if let Some(symbol) = &self.symbol {
            pairs.push(("symbol", symbol.clone()));
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// ClosedPnlApi
// ---------------------------------------------------------------------------

/// Source of closed-PNL pages.
///
/// Implemented by [`BybitClient`]; tests substitute scripted implementations.
pub trait ClosedPnlApi {
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage>;
}

impl<T: ClosedPnlApi + ?Sized> ClosedPnlApi for &T {
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage> {
        (**self).list_closed_pnl(request)
    }
}

// ---------------------------------------------------------------------------
// BybitClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<ClosedPnlPage>,
}

/// Authenticated blocking client for the Bybit v5 REST API.
pub struct BybitClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
    recv_window_ms: u64,
}

impl BybitClient {
    /// Build a client for the given credentials.
    ///
    /// `base_url` overrides the mainnet/testnet URL implied by the credentials.
    pub fn new(credentials: Credentials, timeout: Duration, base_url: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        let base_url = base_url.unwrap_or_else(|| credentials.base_url().to_string());
        Ok(Self {
            http,
            credentials,
            base_url,
            recv_window_ms: config::DEFAULT_RECV_WINDOW_MS,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sign(&self, timestamp: i64, query: &str) -> Result<String> {
        sign_request(
            &self.credentials.api_secret,
            timestamp,
            &self.credentials.api_key,
            self.recv_window_ms,
            query,
        )
    }
}

impl ClosedPnlApi for BybitClient {
    fn list_closed_pnl(&self, request: &ClosedPnlRequest) -> Result<ClosedPnlPage> {
        let endpoint = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            config::CLOSED_PNL_PATH
        );
        let url = Url::parse_with_params(&endpoint, request.query_pairs())
            .map_err(|e| PnlError::InvalidArgument(format!("bad URL {}: {}", endpoint, e)))?;
        let query = url.query().unwrap_or("").to_string();

        let timestamp = Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, &query)?;

        debug!(%url, "GET closed-pnl");
        let resp = self
            .http
            .get(url)
            .header("X-BAPI-API-KEY", &self.credentials.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.recv_window_ms.to_string())
            .header("X-BAPI-SIGN", signature)
            .send()?
            .error_for_status()?;

        let body = resp.text()?;
        parse_envelope(&body)
    }
}

/// Hex HMAC-SHA256 of `timestamp + api_key + recv_window + payload`.
pub fn sign_request(
    secret: &str,
    timestamp: i64,
    api_key: &str,
    recv_window_ms: u64,
    payload: &str,
) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PnlError::Config(format!("invalid API secret: {}", e)))?;
    mac.update(format!("{}{}{}{}", timestamp, api_key, recv_window_ms, payload).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Decode a v5 response body, mapping a non-zero `retCode` to [`PnlError::Api`].
pub fn parse_envelope(body: &str) -> Result<ClosedPnlPage> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.ret_code != 0 {
        return Err(PnlError::Api {
            ret_code: envelope.ret_code,
            ret_msg: envelope.ret_msg,
        });
    }
    Ok(envelope.result.unwrap_or_default())
}
