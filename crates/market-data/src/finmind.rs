//! FinMind client for Taiwan listings: financial statements and daily
//! institutional investor flows.

use crate::RateLimiter;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashboard_core::{
    DashboardError, FundamentalsProvider, InstitutionalActivity, InstitutionalFlow,
    InstitutionalProvider, Market, RawStatementRow, StatementPayload,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";

const STATEMENTS_DATASET: &str = "TaiwanStockFinancialStatements";
const INSTITUTIONAL_DATASET: &str = "TaiwanStockInstitutionalInvestorsBuySell";

#[derive(Clone)]
pub struct FinMindClient {
    client: Client,
    token: Option<String>,
    start_date: NaiveDate,
    rate_limiter: RateLimiter,
}

impl FinMindClient {
    /// `start_date` bounds the statement history requested.
    pub fn new(
        token: Option<String>,
        start_date: NaiveDate,
        timeout: Duration,
        requests_per_minute: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            start_date,
            rate_limiter: RateLimiter::per_minute("FinMind", requests_per_minute),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        dataset: &str,
        stock_id: &str,
        start_date: NaiveDate,
    ) -> Result<Vec<T>, DashboardError> {
        if stock_id.is_empty() {
            return Err(DashboardError::UserInput(
                "FinMind needs a numeric stock id".to_string(),
            ));
        }

        self.rate_limiter.acquire().await;

        let start = start_date.format("%Y-%m-%d").to_string();
        let mut request = self.client.get(BASE_URL).query(&[
            ("dataset", dataset),
            ("data_id", stock_id),
            ("start_date", start.as_str()),
        ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: FinMindResponse<T> = response
            .json()
            .await
            .map_err(|e| DashboardError::InvalidData(e.to_string()))?;
        body.into_data()
    }
}

#[derive(Debug, Deserialize)]
struct FinMindResponse<T> {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> FinMindResponse<T> {
    fn into_data(self) -> Result<Vec<T>, DashboardError> {
        match self.status {
            Some(200) | None => Ok(self.data),
            Some(code) => Err(DashboardError::Api(format!(
                "FinMind status {}: {}",
                code,
                self.msg.unwrap_or_default()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatementRow {
    date: String,
    #[serde(rename = "type")]
    field: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct InstitutionalRow {
    date: String,
    name: String,
    #[serde(default)]
    buy: Option<f64>,
    #[serde(default)]
    sell: Option<f64>,
}

fn statement_rows(rows: Vec<StatementRow>) -> Vec<RawStatementRow> {
    rows.into_iter()
        .filter_map(|r| {
            Some(RawStatementRow {
                field: r.field,
                period: r.date,
                value: r.value?,
            })
        })
        .collect()
}

fn institutional_flows(rows: Vec<InstitutionalRow>) -> Vec<InstitutionalFlow> {
    rows.into_iter()
        .filter_map(|r| {
            let date = NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").ok()?;
            Some(InstitutionalFlow {
                date,
                investor: r.name,
                buy: r.buy.unwrap_or(0.0),
                sell: r.sell.unwrap_or(0.0),
            })
        })
        .collect()
}

#[async_trait]
impl FundamentalsProvider for FinMindClient {
    async fn statements(&self, ticker: &str, _market: Market) -> Result<StatementPayload, DashboardError> {
        let stock_id = Market::finmind_id(ticker);
        let rows: Vec<StatementRow> = self
            .fetch(STATEMENTS_DATASET, &stock_id, self.start_date)
            .await?;
        tracing::debug!("FinMind returned {} statement rows for {}", rows.len(), stock_id);
        Ok(StatementPayload::TaiwanFilings(statement_rows(rows)))
    }
}

#[async_trait]
impl InstitutionalProvider for FinMindClient {
    async fn institutional_activity(
        &self,
        ticker: &str,
        _market: Market,
        since: NaiveDate,
    ) -> Result<InstitutionalActivity, DashboardError> {
        let stock_id = Market::finmind_id(ticker);
        let rows: Vec<InstitutionalRow> = self
            .fetch(INSTITUTIONAL_DATASET, &stock_id, since)
            .await?;
        Ok(InstitutionalActivity::Flows(institutional_flows(rows)))
    }
}
