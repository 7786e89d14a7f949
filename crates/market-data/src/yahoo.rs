//! Yahoo Finance client: price bars, quarterly fundamentals, valuation
//! snapshot and institutional holders.

use crate::RateLimiter;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashboard_core::{
    Bar, DashboardError, FundamentalsProvider, InstitutionalActivity, InstitutionalHolder,
    InstitutionalProvider, Market, PriceHistoryProvider, RatioProvider, RatioSnapshot,
    RawStatementRow, StatementPayload,
};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
/// Answers 404 but sets the session cookie the crumb is bound to.
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Quarterly series requested from the fundamentals endpoint. Alias fields
/// come before the primary field they share a line item with, so the primary
/// value wins when rows are pivoted.
const QUARTERLY_FIELDS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "NetIncomeCommonStockholders",
    "NetIncome",
    "DilutedEPS",
    "BasicEPS",
];

const SNAPSHOT_MODULES: &str = "summaryDetail,defaultKeyStatistics,financialData";
const HOLDER_MODULES: &str = "institutionOwnership";

/// Quarterly history window requested from the fundamentals endpoint.
const STATEMENT_HISTORY_DAYS: i64 = 5 * 365;

struct Endpoints {
    chart: String,
    quote_summary: String,
    timeseries: String,
    cookie: String,
    crumb: String,
}

impl Endpoints {
    fn yahoo() -> Self {
        Self {
            chart: CHART_URL.to_string(),
            quote_summary: QUOTE_SUMMARY_URL.to_string(),
            timeseries: TIMESERIES_URL.to_string(),
            cookie: COOKIE_URL.to_string(),
            crumb: CRUMB_URL.to_string(),
        }
    }
}

/// quoteSummary requires a crumb tied to the session cookie. The crumb is
/// fetched on first use and refreshed once when Yahoo answers 401.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
    endpoints: Arc<Endpoints>,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooClient {
    pub fn new(timeout: Duration, requests_per_minute: usize) -> Self {
        Self::with_endpoints(Endpoints::yahoo(), timeout, requests_per_minute)
    }

    fn with_endpoints(endpoints: Endpoints, timeout: Duration, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::per_minute("Yahoo Finance", requests_per_minute),
            endpoints: Arc::new(endpoints),
            crumb: Arc::new(Mutex::new(None)),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, DashboardError> {
        let response = self.send(url, query).await?;
        read_json(response).await
    }

    /// Send a request with rate limiting and automatic 429 retry. Any other
    /// status is returned to the caller.
    async fn send(&self, url: &str, query: &[(&str, String)]) -> Result<Response, DashboardError> {
        let request = self
            .client
            .get(url)
            .query(query)
            .build()
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| DashboardError::Api("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| DashboardError::Api(e.to_string()))?;

            let status = response.status();
            if status.as_u16() == 429 {
                let wait_secs = 5u64 * (attempt as u64 + 1);
                tracing::warn!(
                    "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                    wait_secs,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            return Ok(response);
        }

        Err(DashboardError::Api(
            "Rate limited by Yahoo Finance after 3 retries".to_string(),
        ))
    }

    /// Cached crumb, running the cookie and crumb handshake when none is held.
    async fn crumb(&self) -> Result<String, DashboardError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        self.rate_limiter.acquire().await;
        if let Err(e) = self.client.get(&self.endpoints.cookie).send().await {
            tracing::debug!("Yahoo cookie request failed: {}", e);
        }

        let response = self.send(&self.endpoints.crumb, &[]).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Api(e.to_string()))?;
        let crumb = body.trim();
        if !status.is_success() || !is_valid_crumb(crumb) {
            return Err(DashboardError::Api(format!(
                "Yahoo crumb request failed: HTTP {}",
                status
            )));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn quote_summary_request(&self, url: &str, modules: &str) -> Result<Response, DashboardError> {
        let crumb = self.crumb().await?;
        self.send(url, &[("modules", modules.to_string()), ("crumb", crumb)])
            .await
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<Value, DashboardError> {
        let url = format!("{}/{}", self.endpoints.quote_summary, symbol);
        let mut response = self.quote_summary_request(&url, modules).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Yahoo rejected the crumb for {}, refreshing", symbol);
            *self.crumb.lock().await = None;
            response = self.quote_summary_request(&url, modules).await?;
        }
        let json = read_json(response).await?;

        json.get("quoteSummary")
            .and_then(|v| v.get("result"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .cloned()
            .ok_or_else(|| DashboardError::DataUnavailable(format!("No quote summary for {}", symbol)))
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooClient {
    async fn price_history(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Bar>, DashboardError> {
        let url = format!("{}/{}", self.endpoints.chart, symbol);
        let json = self
            .get_json(
                &url,
                &[("range", range.to_string()), ("interval", interval.to_string())],
            )
            .await?;
        parse_chart(&json)
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    async fn statements(&self, ticker: &str, market: Market) -> Result<StatementPayload, DashboardError> {
        let symbol = market.yahoo_symbol(ticker);
        let url = format!("{}/{}", self.endpoints.timeseries, symbol);

        let now = Utc::now();
        let start = now - chrono::Duration::days(STATEMENT_HISTORY_DAYS);
        let types = QUARTERLY_FIELDS
            .iter()
            .map(|f| format!("quarterly{}", f))
            .collect::<Vec<_>>()
            .join(",");

        let json = self
            .get_json(
                &url,
                &[
                    ("type", types),
                    ("period1", start.timestamp().to_string()),
                    ("period2", now.timestamp().to_string()),
                ],
            )
            .await?;

        Ok(StatementPayload::UsQuarterly(parse_timeseries(&json)))
    }
}

#[async_trait]
impl RatioProvider for YahooClient {
    async fn ratio_snapshot(&self, symbol: &str) -> Result<RatioSnapshot, DashboardError> {
        let result = self.quote_summary(symbol, SNAPSHOT_MODULES).await?;
        Ok(parse_snapshot(symbol, &result))
    }
}

#[async_trait]
impl InstitutionalProvider for YahooClient {
    async fn institutional_activity(
        &self,
        ticker: &str,
        market: Market,
        _since: NaiveDate,
    ) -> Result<InstitutionalActivity, DashboardError> {
        let symbol = market.yahoo_symbol(ticker);
        let result = self.quote_summary(&symbol, HOLDER_MODULES).await?;
        Ok(InstitutionalActivity::Holders(parse_holders(&result)))
    }
}

async fn read_json(response: Response) -> Result<Value, DashboardError> {
    let status = response.status();
    if !status.is_success() {
        return Err(DashboardError::Api(format!(
            "HTTP {}: {}",
            status,
            response.text().await.unwrap_or_default()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| DashboardError::InvalidData(e.to_string()))
}

/// A consent or error page comes back as HTML instead of a bare token.
fn is_valid_crumb(crumb: &str) -> bool {
    !crumb.is_empty() && !crumb.starts_with('<') && !crumb.contains(char::is_whitespace)
}

/// Plain number, or a `{"raw": n, "fmt": ".."}` wrapper.
fn raw_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.get("raw").and_then(|v| v.as_f64()))
        .filter(|v| v.is_finite())
}

/// Parse a chart response into bars. Rows with any missing OHLC value are
/// dropped; a missing volume counts as zero.
pub(crate) fn parse_chart(json: &Value) -> Result<Vec<Bar>, DashboardError> {
    let chart = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| DashboardError::DataUnavailable("No chart data found".to_string()))?;

    // A valid symbol outside trading hours has no timestamps at all
    let timestamps = match chart.get("timestamp").and_then(|v| v.as_array()) {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };

    let quotes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| DashboardError::InvalidData("No quote data found".to_string()))?;

    let series = |name: &str| -> Vec<Value> {
        quotes
            .get(name)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    };
    let opens = series("open");
    let highs = series("high");
    let lows = series("low");
    let closes = series("close");
    let volumes = series("volume");

    fn at(values: &[Value], i: usize) -> Option<f64> {
        values.get(i).and_then(|v| v.as_f64())
    }

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        if let (Some(ts), Some(o), Some(h), Some(l), Some(c)) = (
            ts.as_i64(),
            at(&opens, i),
            at(&highs, i),
            at(&lows, i),
            at(&closes, i),
        ) {
            let timestamp = match DateTime::from_timestamp(ts, 0) {
                Some(t) => t,
                None => continue,
            };
            bars.push(Bar {
                timestamp,
                open: o,
                high: h,
                low: l,
                close: c,
                volume: at(&volumes, i).unwrap_or(0.0),
            });
        }
    }

    Ok(bars)
}

/// Flatten a fundamentals-timeseries response into raw statement rows,
/// ordered so that alias fields precede primary ones.
pub(crate) fn parse_timeseries(json: &Value) -> Vec<RawStatementRow> {
    let results = match json
        .get("timeseries")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
    {
        Some(results) => results,
        None => return Vec::new(),
    };

    let mut rows: Vec<(usize, RawStatementRow)> = Vec::new();

    for result in results {
        let series_type = match result
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.as_array())
            .and_then(|t| t.first())
            .and_then(|t| t.as_str())
        {
            Some(t) => t,
            None => continue,
        };
        let field = series_type.strip_prefix("quarterly").unwrap_or(series_type);
        let order = QUARTERLY_FIELDS
            .iter()
            .position(|f| *f == field)
            .unwrap_or(QUARTERLY_FIELDS.len());

        let points = match result.get(series_type).and_then(|v| v.as_array()) {
            Some(points) => points,
            None => continue,
        };

        for point in points {
            let period = point.get("asOfDate").and_then(|v| v.as_str());
            let value = point.get("reportedValue").and_then(raw_number);
            if let (Some(period), Some(value)) = (period, value) {
                rows.push((
                    order,
                    RawStatementRow {
                        field: field.to_string(),
                        period: period.to_string(),
                        value,
                    },
                ));
            }
        }
    }

    rows.sort_by_key(|(order, _)| *order);
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Merge every numeric field of the quote-summary modules into one flat map.
pub(crate) fn parse_snapshot(symbol: &str, result: &Value) -> RatioSnapshot {
    let mut fields = HashMap::new();

    if let Some(modules) = result.as_object() {
        for module in modules.values() {
            if let Some(entries) = module.as_object() {
                for (key, value) in entries {
                    if let Some(n) = raw_number(value) {
                        fields.insert(key.clone(), n);
                    }
                }
            }
        }
    }

    RatioSnapshot {
        symbol: symbol.to_string(),
        fields,
    }
}

pub(crate) fn parse_holders(result: &Value) -> Vec<InstitutionalHolder> {
    result
        .get("institutionOwnership")
        .and_then(|v| v.get("ownershipList"))
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let organization = entry.get("organization")?.as_str()?.to_string();
                    Some(InstitutionalHolder {
                        organization,
                        pct_held: entry.get("pctHeld").and_then(raw_number),
                        shares: entry.get("position").and_then(raw_number),
                        value: entry.get("value").and_then(raw_number),
                        report_date: entry
                            .get("reportDate")
                            .and_then(|d| d.get("fmt").or(Some(d)))
                            .and_then(|d| d.as_str())
                            .map(|d| d.to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
