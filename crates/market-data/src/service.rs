//! Market-aware data access with TTL caching.
//!
//! Every fetch comes in two forms: `try_*` returns the typed error, the plain
//! form logs it and degrades to an empty value so callers can always render.

use crate::{FinMindClient, TtlCache, YahooClient};
use chrono::{Duration as ChronoDuration, Utc};
use dashboard_core::{
    Bar, DashboardError, FundamentalsProvider, InstitutionalActivity, InstitutionalProvider, Market,
    PriceHistoryProvider, PriceRange, RatioProvider, RatioSnapshot, StatementPayload,
    StatementRecord,
};
use financial_store::{normalize, FinancialTable};
use std::sync::Arc;
use std::time::Duration;

/// Providers consulted per concern. Statements and institutional activity
/// are routed by market.
#[derive(Clone)]
pub struct Providers {
    pub prices: Arc<dyn PriceHistoryProvider>,
    pub ratios: Arc<dyn RatioProvider>,
    pub us_statements: Arc<dyn FundamentalsProvider>,
    pub tw_statements: Arc<dyn FundamentalsProvider>,
    pub us_institutional: Arc<dyn InstitutionalProvider>,
    pub tw_institutional: Arc<dyn InstitutionalProvider>,
}

impl Providers {
    /// Yahoo for prices, ratios and US data; FinMind for Taiwan statements
    /// and investor flows.
    pub fn live(yahoo: YahooClient, finmind: FinMindClient) -> Self {
        let yahoo = Arc::new(yahoo);
        let finmind = Arc::new(finmind);
        Self {
            prices: yahoo.clone(),
            ratios: yahoo.clone(),
            us_statements: yahoo.clone(),
            tw_statements: finmind.clone(),
            us_institutional: yahoo,
            tw_institutional: finmind,
        }
    }

    fn statements_for(&self, market: Market) -> &dyn FundamentalsProvider {
        match market {
            Market::Taiwan => self.tw_statements.as_ref(),
            Market::Us => self.us_statements.as_ref(),
        }
    }

    fn institutional_for(&self, market: Market) -> &dyn InstitutionalProvider {
        match market {
            Market::Taiwan => self.tw_institutional.as_ref(),
            Market::Us => self.us_institutional.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub price_ttl: Duration,
    pub statement_ttl: Duration,
    pub snapshot_ttl: Duration,
    pub institutional_lookback_days: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            price_ttl: Duration::from_secs(10),
            statement_ttl: Duration::from_secs(3600),
            snapshot_ttl: Duration::from_secs(300),
            institutional_lookback_days: 40,
        }
    }
}

pub struct MarketDataService {
    providers: Providers,
    lookback_days: i64,
    /// Bars per (ticker, range, market)
    price_cache: TtlCache<Vec<Bar>>,
    /// Raw statement payloads per (ticker, market)
    statement_cache: TtlCache<StatementPayload>,
    /// Ratio snapshots per Yahoo symbol
    snapshot_cache: TtlCache<RatioSnapshot>,
    /// Institutional activity per (ticker, market)
    institutional_cache: TtlCache<InstitutionalActivity>,
}

fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

impl MarketDataService {
    pub fn new(providers: Providers, settings: CacheSettings) -> Self {
        Self {
            providers,
            lookback_days: settings.institutional_lookback_days,
            price_cache: TtlCache::new(settings.price_ttl),
            statement_cache: TtlCache::new(settings.statement_ttl),
            snapshot_cache: TtlCache::new(settings.snapshot_ttl),
            institutional_cache: TtlCache::new(settings.statement_ttl),
        }
    }

    /// Price bars for the requested range. When today's session has fewer
    /// than two bars the last five days at 5-minute resolution are used.
    pub async fn try_price_history(
        &self,
        ticker: &str,
        range: PriceRange,
        market: Market,
    ) -> Result<Vec<Bar>, DashboardError> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("{}:{}:{}", ticker, range.range(), market);
        if let Some(bars) = self.price_cache.get(&cache_key) {
            return Ok(bars);
        }

        let symbol = market.yahoo_symbol(&ticker);
        let mut bars = self
            .providers
            .prices
            .price_history(&symbol, range.range(), range.interval())
            .await?;

        if range == PriceRange::Today && bars.len() < 2 {
            tracing::debug!(
                "Only {} bar(s) today for {}, falling back to 5d/5m",
                bars.len(),
                symbol
            );
            let fallback = PriceRange::FiveDays;
            bars = self
                .providers
                .prices
                .price_history(&symbol, fallback.range(), fallback.interval())
                .await?;
        }

        bars.retain(|b| {
            b.open.is_finite() && b.high.is_finite() && b.low.is_finite() && b.close.is_finite()
        });

        if bars.is_empty() {
            return Err(DashboardError::DataUnavailable(format!(
                "No price data for {}",
                symbol
            )));
        }

        self.price_cache.insert(cache_key, bars.clone());
        Ok(bars)
    }

    pub async fn price_history(&self, ticker: &str, range: PriceRange, market: Market) -> Vec<Bar> {
        match self.try_price_history(ticker, range, market).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", ticker, e);
                Vec::new()
            }
        }
    }

    pub async fn try_statement_records(
        &self,
        ticker: &str,
        market: Market,
    ) -> Result<Vec<StatementRecord>, DashboardError> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("{}:{}", ticker, market);

        let payload = match self.statement_cache.get(&cache_key) {
            Some(payload) => payload,
            None => {
                let payload = self
                    .providers
                    .statements_for(market)
                    .statements(&ticker, market)
                    .await?;
                if payload.is_empty() {
                    return Err(DashboardError::DataUnavailable(format!(
                        "No statements for {}",
                        ticker
                    )));
                }
                self.statement_cache.insert(cache_key, payload.clone());
                payload
            }
        };

        Ok(normalize(&ticker, &payload))
    }

    /// Normalized statement records; empty when the provider fails.
    pub async fn statement_records(&self, ticker: &str, market: Market) -> Vec<StatementRecord> {
        match self.try_statement_records(ticker, market).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Statements unavailable for {}: {}", ticker, e);
                Vec::new()
            }
        }
    }

    /// Statement table for one ticker, empty when nothing could be fetched.
    pub async fn financial_table(&self, ticker: &str, market: Market) -> FinancialTable {
        let ticker = normalize_ticker(ticker);
        let records = self.statement_records(&ticker, market).await;
        FinancialTable::from_records(&ticker, &records)
    }

    pub async fn try_ratio_snapshot(
        &self,
        ticker: &str,
        market: Market,
    ) -> Result<RatioSnapshot, DashboardError> {
        let symbol = market.yahoo_symbol(ticker);
        if let Some(snapshot) = self.snapshot_cache.get(&symbol) {
            return Ok(snapshot);
        }

        let snapshot = self.providers.ratios.ratio_snapshot(&symbol).await?;
        if snapshot.is_empty() {
            return Err(DashboardError::DataUnavailable(format!(
                "No ratios for {}",
                symbol
            )));
        }

        self.snapshot_cache.insert(symbol, snapshot.clone());
        Ok(snapshot)
    }

    pub async fn ratio_snapshot(&self, ticker: &str, market: Market) -> RatioSnapshot {
        match self.try_ratio_snapshot(ticker, market).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ratio snapshot unavailable for {}: {}", ticker, e);
                RatioSnapshot {
                    symbol: market.yahoo_symbol(ticker),
                    ..Default::default()
                }
            }
        }
    }

    pub async fn try_institutional_activity(
        &self,
        ticker: &str,
        market: Market,
    ) -> Result<InstitutionalActivity, DashboardError> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("{}:{}", ticker, market);
        if let Some(activity) = self.institutional_cache.get(&cache_key) {
            return Ok(activity);
        }

        let since = (Utc::now() - ChronoDuration::days(self.lookback_days)).date_naive();
        let activity = self
            .providers
            .institutional_for(market)
            .institutional_activity(&ticker, market, since)
            .await?;

        if activity.is_empty() {
            return Err(DashboardError::DataUnavailable(format!(
                "No institutional data for {}",
                ticker
            )));
        }

        self.institutional_cache.insert(cache_key, activity.clone());
        Ok(activity)
    }

    pub async fn institutional_activity(&self, ticker: &str, market: Market) -> InstitutionalActivity {
        match self.try_institutional_activity(ticker, market).await {
            Ok(activity) => activity,
            Err(e) => {
                tracing::warn!("Institutional data unavailable for {}: {}", ticker, e);
                InstitutionalActivity::empty_for(market)
            }
        }
    }
}
