use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::error::{PnlError, Result};

pub const MAINNET_URL: &str = "https://api.bybit.com";
pub const TESTNET_URL: &str = "https://api-testnet.bybit.com";
pub const CLOSED_PNL_PATH: &str = "/v5/position/closed-pnl";

/// Market category for USDT/USDC perpetual and futures contracts.
pub const CATEGORY_LINEAR: &str = "linear";

pub const MAX_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

/// Hard maximum `endTime - startTime` window accepted by the closed-PNL endpoint.
pub const API_MAX_WINDOW_DAYS: i64 = 7;
/// Planner chunk size; one day below the API window to absorb rounding at the edges.
pub const DEFAULT_SPAN_DAYS: i64 = 6;
pub const CIRCUIT_BREAKER_THRESHOLD: usize = 3;

pub const DEFAULT_ACCOUNT: &str = "main";
pub const DEFAULT_TIMEFRAME: &str = "1d";
pub const SUPPORTED_TIMEFRAMES: [&str; 3] = ["1d", "1w", "1M"];

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("bybit-pnl")
    } else {
        PathBuf::from(".bybit-pnl-data")
    }
}

/// Normalize an account name for use in a file name (`"Sub Account"` -> `"sub_account"`).
pub fn account_slug(account: &str) -> String {
    account.trim().to_lowercase().replace(' ', "_")
}

/// File name of the per-account trade database.
pub fn database_file_name(account: &str) -> String {
    format!("{}_trades.duckdb", account_slug(account))
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API key pair for one Bybit (sub-)account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>, testnet: bool) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            testnet,
        }
    }

    pub fn base_url(&self) -> &'static str {
        if self.testnet {
            TESTNET_URL
        } else {
            MAINNET_URL
        }
    }

    fn validate(&self, account: &str) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PnlError::Config(format!(
                "missing API key for account '{}'",
                account
            )));
        }
        if self.api_secret.trim().is_empty() {
            return Err(PnlError::Config(format!(
                "missing API secret for account '{}'",
                account
            )));
        }
        Ok(())
    }
}

// Never print the secret.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("testnet", &self.testnet)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AccountsConfig
// ---------------------------------------------------------------------------

/// Named credential sets, one per (sub-)account.
///
/// Loaded from the environment (and a `.env` file when present):
///
/// * `BYBIT_API_KEY`, `BYBIT_API_SECRET`, `BYBIT_TESTNET` define the `main` account.
/// * `BYBIT_ACCOUNTS=scalping,swing` lists extra accounts, each read from
///   `BYBIT_<NAME>_API_KEY`, `BYBIT_<NAME>_API_SECRET` and `BYBIT_<NAME>_TESTNET`.
#[derive(Debug, Clone, Default)]
pub struct AccountsConfig {
    accounts: BTreeMap<String, Credentials>,
}

impl AccountsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env` (if any) and build the account map from the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build the account map from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut config = Self::new();

        if let Some(creds) = read_credentials(&vars, "BYBIT") {
            config.insert(DEFAULT_ACCOUNT, creds);
        }

        if let Some(names) = vars.get("BYBIT_ACCOUNTS") {
            for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let prefix = format!("BYBIT_{}", account_slug(name).to_uppercase());
                if let Some(creds) = read_credentials(&vars, &prefix) {
                    config.insert(name, creds);
                }
            }
        }

        config
    }

    pub fn insert(&mut self, account: &str, credentials: Credentials) -> &mut Self {
        self.accounts.insert(account_slug(account), credentials);
        self
    }

    /// Credentials for `account`, validated.
    ///
    /// Unknown accounts and empty keys are configuration errors.
    pub fn get(&self, account: &str) -> Result<&Credentials> {
        let creds = self.accounts.get(&account_slug(account)).ok_or_else(|| {
            PnlError::Config(format!(
                "unknown account '{}' (configured: [{}])",
                account,
                self.names().join(", ")
            ))
        })?;
        creds.validate(account)?;
        Ok(creds)
    }

    pub fn names(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn read_credentials(vars: &HashMap<String, String>, prefix: &str) -> Option<Credentials> {
    let api_key = vars.get(&format!("{}_API_KEY", prefix))?;
    let api_secret = vars
        .get(&format!("{}_API_SECRET", prefix))
        .cloned()
        .unwrap_or_default();
    let testnet = vars
        .get(&format!("{}_TESTNET", prefix))
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Some(Credentials::new(api_key.clone(), api_secret, testnet))
}
