use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    // Durable state
    pub state_file: PathBuf,

    // Cache time-to-live per concern
    pub price_cache_ttl: Duration,     // 10s
    pub statement_cache_ttl: Duration, // 1h
    pub snapshot_cache_ttl: Duration,  // 5min

    // FinMind
    pub finmind_token: Option<String>,
    pub finmind_start_date: NaiveDate,
    pub institutional_lookback_days: i64, // 40

    // HTTP
    pub yahoo_rate_limit: usize,   // requests per minute
    pub finmind_rate_limit: usize, // requests per minute
    pub http_timeout: Duration,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: &str| -> Result<Duration> {
            let value: u64 = var(key, default)
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", key))?;
            Ok(Duration::from_secs(value))
        };

        Ok(Self {
            state_file: PathBuf::from(var("DASHBOARD_STATE_FILE", "portfolio_db.json")),

            price_cache_ttl: secs("PRICE_CACHE_TTL_SECS", "10")?,
            statement_cache_ttl: secs("STATEMENT_CACHE_TTL_SECS", "3600")?,
            snapshot_cache_ttl: secs("SNAPSHOT_CACHE_TTL_SECS", "300")?,

            finmind_token: lookup("FINMIND_API_TOKEN").filter(|t| !t.trim().is_empty()),
            finmind_start_date: NaiveDate::parse_from_str(
                &var("FINMIND_START_DATE", "2021-01-01"),
                "%Y-%m-%d",
            )
            .context("FINMIND_START_DATE must be YYYY-MM-DD")?,
            institutional_lookback_days: var("INSTITUTIONAL_LOOKBACK_DAYS", "40")
                .parse()
                .context("INSTITUTIONAL_LOOKBACK_DAYS must be a number of days")?,

            yahoo_rate_limit: var("YAHOO_RATE_LIMIT", "120")
                .parse()
                .context("YAHOO_RATE_LIMIT must be requests per minute")?,
            finmind_rate_limit: var("FINMIND_RATE_LIMIT", "10")
                .parse()
                .context("FINMIND_RATE_LIMIT must be requests per minute")?,
            http_timeout: secs("HTTP_TIMEOUT_SECS", "30")?,
        })
    }
}
