use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Exchange wall-clock time with the zone stripped, as charts expect it.
    pub fn local_time(&self, market: Market) -> NaiveDateTime {
        self.timestamp.with_timezone(&market.timezone()).naive_local()
    }
}

/// Market a ticker trades in. Decides symbol suffixes, time zone and which
/// statement provider is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Taiwan,
    Us,
}

impl Market {
    /// All-digit tickers are Taiwan listings; everything else is treated as US.
    pub fn infer(ticker: &str) -> Self {
        let ticker = ticker.trim();
        if !ticker.is_empty() && ticker.chars().all(|c| c.is_ascii_digit()) {
            Market::Taiwan
        } else {
            Market::Us
        }
    }

    pub fn timezone(&self) -> Tz {
        match self {
            Market::Taiwan => chrono_tz::Asia::Taipei,
            Market::Us => chrono_tz::America::New_York,
        }
    }

    /// Symbol as the Yahoo endpoints expect it.
    pub fn yahoo_symbol(&self, ticker: &str) -> String {
        let ticker = ticker.trim().to_uppercase();
        match self {
            Market::Taiwan if ticker.chars().all(|c| c.is_ascii_digit()) => {
                format!("{}.TW", ticker)
            }
            _ => ticker,
        }
    }

    /// Stock id as FinMind expects it (digits only).
    pub fn finmind_id(ticker: &str) -> String {
        ticker.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Taiwan => "TW",
            Market::Us => "US",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tw" | "taiwan" => Ok(Market::Taiwan),
            "us" | "usa" => Ok(Market::Us),
            other => Err(format!("unknown market '{}'", other)),
        }
    }
}

/// Chart time scale selectable by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceRange {
    Today,
    FiveDays,
    OneMonth,
    OneYear,
    FiveYears,
}

impl PriceRange {
    /// Provider range parameter
    pub fn range(&self) -> &'static str {
        match self {
            PriceRange::Today => "1d",
            PriceRange::FiveDays => "5d",
            PriceRange::OneMonth => "1mo",
            PriceRange::OneYear => "1y",
            PriceRange::FiveYears => "5y",
        }
    }

    /// Provider bar interval parameter
    pub fn interval(&self) -> &'static str {
        match self {
            PriceRange::Today => "1m",
            PriceRange::FiveDays => "5m",
            PriceRange::OneMonth => "60m",
            PriceRange::OneYear | PriceRange::FiveYears => "1d",
        }
    }

    /// Intraday scales skip overnight gaps on the chart axis.
    pub fn is_intraday(&self) -> bool {
        matches!(self, PriceRange::Today | PriceRange::FiveDays | PriceRange::OneMonth)
    }
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "1d" => Ok(PriceRange::Today),
            "5d" => Ok(PriceRange::FiveDays),
            "1mo" | "1m" => Ok(PriceRange::OneMonth),
            "1y" => Ok(PriceRange::OneYear),
            "5y" => Ok(PriceRange::FiveYears),
            other => Err(format!("unknown price range '{}'", other)),
        }
    }
}

/// One provider-local statement value before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStatementRow {
    pub field: String,
    pub period: String,
    pub value: f64,
}

/// Statement payloads tagged by the provider that produced them. Each tag
/// carries its own field-name mapping into the canonical vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementPayload {
    /// FinMind financial statements for Taiwan listings
    TaiwanFilings(Vec<RawStatementRow>),
    /// Yahoo quarterly fundamentals time series
    UsQuarterly(Vec<RawStatementRow>),
}

impl StatementPayload {
    pub fn rows(&self) -> &[RawStatementRow] {
        match self {
            StatementPayload::TaiwanFilings(rows) | StatementPayload::UsQuarterly(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

/// A normalized (ticker, period, line item, value) fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub ticker: String,
    pub period: String,
    /// Canonical line-item name, or the provider's own name when unmapped
    pub item: String,
    pub value: f64,
}

/// Flat valuation snapshot (P/E, margins, ...) keyed by provider field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioSnapshot {
    pub symbol: String,
    pub fields: HashMap<String, f64>,
}

impl RatioSnapshot {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Daily buy/sell of one institutional investor class (Taiwan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalFlow {
    pub date: NaiveDate,
    pub investor: String,
    pub buy: f64,
    pub sell: f64,
}

/// Reported institutional holder (US).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalHolder {
    pub organization: String,
    pub pct_held: Option<f64>,
    pub shares: Option<f64>,
    pub value: Option<f64>,
    pub report_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstitutionalActivity {
    Flows(Vec<InstitutionalFlow>),
    Holders(Vec<InstitutionalHolder>),
}

impl InstitutionalActivity {
    pub fn is_empty(&self) -> bool {
        match self {
            InstitutionalActivity::Flows(rows) => rows.is_empty(),
            InstitutionalActivity::Holders(rows) => rows.is_empty(),
        }
    }

    /// Empty activity of the shape the given market reports.
    pub fn empty_for(market: Market) -> Self {
        match market {
            Market::Taiwan => InstitutionalActivity::Flows(Vec::new()),
            Market::Us => InstitutionalActivity::Holders(Vec::new()),
        }
    }
}
