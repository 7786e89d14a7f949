use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{Bar, DashboardError, InstitutionalActivity, Market, RatioSnapshot, StatementPayload};

/// Source of OHLC price bars
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn price_history(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Bar>, DashboardError>;
}

/// Source of quarterly statement line items
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn statements(&self, ticker: &str, market: Market) -> Result<StatementPayload, DashboardError>;
}

/// Source of valuation ratios and quote fields
#[async_trait]
pub trait RatioProvider: Send + Sync {
    async fn ratio_snapshot(&self, symbol: &str) -> Result<RatioSnapshot, DashboardError>;
}

/// Source of institutional buy/sell flows or holder lists
#[async_trait]
pub trait InstitutionalProvider: Send + Sync {
    async fn institutional_activity(
        &self,
        ticker: &str,
        market: Market,
        since: NaiveDate,
    ) -> Result<InstitutionalActivity, DashboardError>;
}
