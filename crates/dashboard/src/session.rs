//! One user's dashboard session.

use crate::chart::{Chart, Series};
use crate::{metrics, ratios};
use crate::renderer::{
    institutional_chart, statement_chart, PeerComparison, PeerData, PriceChart, PriceSummary,
    TrendChart,
};
use app_state::{AppState, Holding};
use dashboard_core::{DashboardError, Market, PriceRange, RatioSnapshot};
use formula_engine::{try_evaluate, DerivedSeries, FormulaBuilder, FormulaToken};
use market_data::MarketDataService;

/// Outcome of one line of builder input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderStep {
    Continue,
    Saved(String),
    Quit,
}

/// Owns the durable state, the data service and the transient UI state
/// (active folder and formula buffer).
pub struct Session {
    state: AppState,
    service: MarketDataService,
    active_folder: Option<String>,
    builder: FormulaBuilder,
}

impl Session {
    pub fn new(state: AppState, service: MarketDataService) -> Self {
        Self {
            state,
            service,
            active_folder: None,
            builder: FormulaBuilder::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn builder(&self) -> &FormulaBuilder {
        &self.builder
    }

    pub fn active_folder(&self) -> Option<&str> {
        self.active_folder.as_deref()
    }

    fn resolve_market(ticker: &str, market: Option<Market>) -> Market {
        market.unwrap_or_else(|| Market::infer(ticker))
    }

    fn require_active(&self) -> Result<String, DashboardError> {
        self.active_folder
            .clone()
            .ok_or_else(|| DashboardError::UserInput("Select a folder first".to_string()))
    }

    pub fn select_folder(&mut self, name: &str) -> Result<(), DashboardError> {
        let name = name.trim();
        if !self.state.watchlists().contains(name) {
            return Err(DashboardError::UserInput(format!("No folder named '{}'", name)));
        }
        self.active_folder = Some(name.to_string());
        Ok(())
    }

    pub fn create_folder(&mut self, name: &str) -> Result<bool, DashboardError> {
        self.state.create_folder(name)
    }

    pub fn delete_folder(&mut self, name: &str) -> Result<bool, DashboardError> {
        let deleted = self.state.delete_folder(name)?;
        if deleted && self.active_folder.as_deref() == Some(name.trim()) {
            self.active_folder = None;
        }
        Ok(deleted)
    }

    pub fn add_ticker(&mut self, ticker: &str) -> Result<bool, DashboardError> {
        let folder = self.require_active()?;
        self.state.add_ticker(&folder, ticker)
    }

    pub fn remove_ticker(&mut self, ticker: &str) -> Result<bool, DashboardError> {
        let folder = self.require_active()?;
        self.state.remove_ticker(&folder, ticker)
    }

    pub fn set_holding(&mut self, ticker: &str, holding: Holding) -> Result<(), DashboardError> {
        let folder = self.require_active()?;
        self.state.set_holding(&folder, ticker, holding)
    }

    pub fn save_formula(&mut self, name: &str, expression: &str) -> Result<(), DashboardError> {
        self.state.save_formula(name, expression)
    }

    pub fn delete_formula(&mut self, name: &str) -> Result<bool, DashboardError> {
        self.state.delete_formula(name)
    }

    /// Apply one line of interactive builder input.
    pub fn builder_input(&mut self, line: &str) -> Result<BuilderStep, DashboardError> {
        let line = line.trim();
        match line {
            "" => return Ok(BuilderStep::Continue),
            "quit" | "q" => return Ok(BuilderStep::Quit),
            "<" => self.builder.backspace(),
            "C" => self.builder.clear(),
            _ => {
                if line == "save" || line.starts_with("save ") {
                    let name = line["save".len()..].trim();
                    self.state.save_built_formula(&mut self.builder, name)?;
                    return Ok(BuilderStep::Saved(name.to_string()));
                }

                if let Ok(token) = line.parse::<FormulaToken>() {
                    self.builder.append(token);
                } else if line.parse::<f64>().is_ok() {
                    self.builder.append_raw(line);
                } else {
                    return Err(DashboardError::UserInput(format!(
                        "'{}' is not a line item, operator or number",
                        line
                    )));
                }
            }
        }
        Ok(BuilderStep::Continue)
    }

    pub async fn quote(&self, ticker: &str, market: Option<Market>) -> PriceSummary {
        let market = Self::resolve_market(ticker, market);
        let bars = self
            .service
            .price_history(ticker, PriceRange::OneYear, market)
            .await;
        let snapshot = self.service.ratio_snapshot(ticker, market).await;
        PriceSummary::build(&ticker.trim().to_uppercase(), &bars, &snapshot)
    }

    pub async fn price(&self, ticker: &str, range: PriceRange, market: Option<Market>) -> PriceChart {
        let market = Self::resolve_market(ticker, market);
        PriceChart {
            ticker: ticker.trim().to_uppercase(),
            market,
            range,
            bars: self.service.price_history(ticker, range, market).await,
        }
    }

    pub async fn statement(&self, ticker: &str, market: Option<Market>) -> Chart {
        let market = Self::resolve_market(ticker, market);
        let table = self.service.financial_table(ticker, market).await;
        statement_chart(&table.statement_view())
    }

    pub async fn trend(&self, ticker: &str, metrics: &[String], market: Option<Market>) -> TrendChart {
        let market = Self::resolve_market(ticker, market);
        let table = self.service.financial_table(ticker, market).await;
        TrendChart::build(metrics, self.state.formulas(), &table)
    }

    /// Compare every ticker of the active folder. Tickers are fetched one
    /// after another, each on the market inferred from its own symbol.
    pub async fn compare(&self, metrics: &[String]) -> Result<PeerComparison, DashboardError> {
        let folder = self.require_active()?;
        let tickers: Vec<String> = self
            .state
            .watchlists()
            .get(&folder)
            .map(|w| w.tickers().to_vec())
            .unwrap_or_default();
        let needs_ratios = metrics.iter().any(|m| ratios::ratio_field(m).is_some());

        let mut peers = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let market = Market::infer(&ticker);
            let table = self.service.financial_table(&ticker, market).await;
            let snapshot = if needs_ratios {
                self.service.ratio_snapshot(&ticker, market).await
            } else {
                RatioSnapshot::default()
            };
            peers.push(PeerData {
                ticker,
                table,
                snapshot,
            });
        }

        Ok(PeerComparison::build(
            &folder,
            metrics,
            self.state.formulas(),
            &peers,
        ))
    }

    /// Line items, ratios and saved formulas that trend and compare accept.
    pub fn metrics(&self) -> Chart {
        metrics::catalog_chart(self.state.formulas())
    }

    /// Evaluate a saved formula against one ticker, surfacing the failure
    /// that trend views would otherwise flatten to zeros.
    pub async fn check_formula(
        &self,
        name: &str,
        ticker: &str,
        market: Option<Market>,
    ) -> Result<DerivedSeries, DashboardError> {
        let name = name.trim();
        let expression = self
            .state
            .formulas()
            .get(name)
            .ok_or_else(|| DashboardError::UserInput(format!("No formula named '{}'", name)))?;

        let market = Self::resolve_market(ticker, market);
        let table = self.service.financial_table(ticker, market).await;
        Ok(try_evaluate(expression, &table)?)
    }

    pub async fn formula_chart(
        &self,
        name: &str,
        ticker: &str,
        market: Option<Market>,
    ) -> Result<Chart, DashboardError> {
        let series = self.check_formula(name, ticker, market).await?;
        let title = format!("{} {}", ticker.trim().to_uppercase(), name.trim());
        if series.is_empty() {
            return Ok(Chart::Empty {
                title,
                message: "No data available".to_string(),
            });
        }
        Ok(Chart::Line {
            title,
            series: vec![Series {
                name: name.trim().to_string(),
                points: series.points(),
            }],
        })
    }

    pub async fn flows(&self, ticker: &str, market: Option<Market>) -> Chart {
        let market = Self::resolve_market(ticker, market);
        let activity = self.service.institutional_activity(ticker, market).await;
        institutional_chart(&ticker.trim().to_uppercase(), &activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use dashboard_core::{
        Bar, ErrorKind, FundamentalsProvider, InstitutionalActivity, InstitutionalProvider,
        PriceHistoryProvider, RatioProvider, RawStatementRow, StatementPayload,
    };
    use market_data::{CacheSettings, Providers};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    /// Statements keyed by ticker; everything else is empty.
    #[derive(Default)]
    struct FakeProvider {
        statements: HashMap<String, Vec<RawStatementRow>>,
        snapshots: HashMap<String, RatioSnapshot>,
    }

    #[async_trait]
    impl PriceHistoryProvider for FakeProvider {
        async fn price_history(&self, _: &str, _: &str, _: &str) -> Result<Vec<Bar>, DashboardError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl FundamentalsProvider for FakeProvider {
        async fn statements(&self, ticker: &str, _: Market) -> Result<StatementPayload, DashboardError> {
            Ok(StatementPayload::UsQuarterly(
                self.statements.get(ticker).cloned().unwrap_or_default(),
            ))
        }
    }

    #[async_trait]
    impl RatioProvider for FakeProvider {
        async fn ratio_snapshot(&self, symbol: &str) -> Result<RatioSnapshot, DashboardError> {
            self.snapshots
                .get(symbol)
                .cloned()
                .ok_or_else(|| DashboardError::Api("HTTP 404".into()))
        }
    }

    #[async_trait]
    impl InstitutionalProvider for FakeProvider {
        async fn institutional_activity(
            &self,
            _: &str,
            market: Market,
            _: NaiveDate,
        ) -> Result<InstitutionalActivity, DashboardError> {
            Ok(InstitutionalActivity::empty_for(market))
        }
    }

    fn row(field: &str, period: &str, value: f64) -> RawStatementRow {
        RawStatementRow {
            field: field.into(),
            period: period.into(),
            value,
        }
    }

    fn session() -> (Session, TempDir) {
        let fake = Arc::new(FakeProvider {
            statements: HashMap::from([(
                "AAPL".to_string(),
                vec![
                    row("TotalRevenue", "2024-03-31", 100.0),
                    row("TotalRevenue", "2024-06-30", 200.0),
                    row("NetIncome", "2024-03-31", 10.0),
                    row("NetIncome", "2024-06-30", 40.0),
                ],
            )]),
            snapshots: HashMap::from([
                (
                    "AAPL".to_string(),
                    RatioSnapshot {
                        symbol: "AAPL".into(),
                        fields: HashMap::from([("returnOnEquity".to_string(), 1.5)]),
                    },
                ),
                (
                    "2330.TW".to_string(),
                    RatioSnapshot {
                        symbol: "2330.TW".into(),
                        fields: HashMap::from([("returnOnEquity".to_string(), 0.2)]),
                    },
                ),
            ]),
        });
        let providers = Providers {
            prices: fake.clone(),
            ratios: fake.clone(),
            us_statements: fake.clone(),
            tw_statements: fake.clone(),
            us_institutional: fake.clone(),
            tw_institutional: fake,
        };

        let dir = tempdir().unwrap();
        let state = AppState::load(dir.path().join("portfolio_db.json"));
        let service = MarketDataService::new(providers, CacheSettings::default());
        (Session::new(state, service), dir)
    }

    #[test]
    fn test_folder_actions_require_active_folder() {
        let (mut session, _dir) = session();

        let err = session.add_ticker("AAPL").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserInput);
        assert!(!session.state().path().exists());

        assert!(session.select_folder("Missing").is_err());
        session.select_folder("Blue Chips").unwrap();
        assert!(session.add_ticker("aapl").unwrap());
        assert!(session.state().watchlists().get("Blue Chips").unwrap().contains("AAPL"));
        assert!(session.state().path().exists());
    }

    #[test]
    fn test_deleting_active_folder_clears_selection() {
        let (mut session, _dir) = session();
        session.create_folder("Semis").unwrap();
        session.select_folder("Semis").unwrap();

        assert!(session.delete_folder("Semis").unwrap());
        assert_eq!(session.active_folder(), None);
    }

    #[test]
    fn test_builder_input_saves_trimmed_formula() {
        let (mut session, _dir) = session();

        for line in ["Total Revenue", "+", "Net Income"] {
            assert_eq!(session.builder_input(line).unwrap(), BuilderStep::Continue);
        }
        assert_eq!(
            session.builder_input("save Margin Sum").unwrap(),
            BuilderStep::Saved("Margin Sum".to_string())
        );

        assert!(session.builder().is_empty());
        assert_eq!(
            session.state().formulas().get("Margin Sum"),
            Some("Total Revenue + Net Income")
        );
    }

    #[test]
    fn test_builder_input_editing_and_rejections() {
        let (mut session, _dir) = session();

        session.builder_input("Net Income").unwrap();
        session.builder_input("*").unwrap();
        session.builder_input("100").unwrap();
        assert_eq!(session.builder().buffer(), "Net Income * 100 ");

        session.builder_input("<").unwrap();
        assert_eq!(session.builder().buffer(), "Net Income * 100");

        assert!(session.builder_input("Revenue").is_err());
        assert!(session.builder_input("save").is_err());
        assert_eq!(session.builder().buffer(), "Net Income * 100");
        assert!(session.state().formulas().is_empty());

        session.builder_input("C").unwrap();
        assert!(session.builder().is_empty());
        assert_eq!(session.builder_input("quit").unwrap(), BuilderStep::Quit);
    }

    #[tokio::test]
    async fn test_compare_active_folder() {
        let (mut session, _dir) = session();
        session
            .save_formula("Net Margin %", "Net Income / Total Revenue * 100")
            .unwrap();
        session.create_folder("Peers").unwrap();
        session.select_folder("Peers").unwrap();
        session.add_ticker("AAPL").unwrap();
        session.add_ticker("MSFT").unwrap();

        let metrics = vec!["Net Margin %".to_string(), "ROE".to_string()];
        let comparison = session.compare(&metrics).await.unwrap();

        assert_eq!(comparison.rows.len(), 2);
        assert_eq!(comparison.rows[0].ticker, "AAPL");
        assert_relative_eq!(comparison.rows[0].values[0], 20.0);
        assert_relative_eq!(comparison.rows[0].values[1], 150.0);
        assert_eq!(comparison.rows[1].values, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_compare_resolves_each_peer_market() {
        let (mut session, _dir) = session();
        session.select_folder("Blue Chips").unwrap();
        session.add_ticker("AAPL").unwrap();

        let comparison = session.compare(&["ROE".to_string()]).await.unwrap();
        let tickers: Vec<&str> = comparison.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["2330", "TSLA", "AAPL"]);

        // 2330 reads the 2330.TW snapshot while AAPL stays a plain symbol
        assert_relative_eq!(comparison.rows[0].values[0], 20.0);
        assert_eq!(comparison.rows[1].values, vec![0.0]);
        assert_relative_eq!(comparison.rows[2].values[0], 150.0);
    }

    #[tokio::test]
    async fn test_compare_without_folder_is_rejected() {
        let (session, _dir) = session();
        let err = session.compare(&["ROE".to_string()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserInput);
    }

    #[tokio::test]
    async fn test_check_formula_reports_evaluation_errors() {
        let (mut session, _dir) = session();
        session.save_formula("Income Ratio", "Net Income / Total Revenue").unwrap();
        session.save_formula("Gross Ratio", "Gross Profit / Total Revenue").unwrap();

        let series = session.check_formula("Income Ratio", "aapl", None).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.values[1].unwrap(), 0.2);

        // AAPL reports no gross profit, which trend views would zero-fill
        let err = session.check_formula("Gross Ratio", "AAPL", None).await.unwrap_err();
        assert!(matches!(err, DashboardError::Formula(_)));
        assert_eq!(err.kind(), ErrorKind::FormulaEvaluation);

        let err = session.check_formula("Nope", "AAPL", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserInput);

        match session.formula_chart("Income Ratio", "AAPL", None).await.unwrap() {
            Chart::Line { series, .. } => assert_eq!(series[0].points.len(), 2),
            other => panic!("unexpected chart: {:?}", other),
        }
        assert!(matches!(
            session.formula_chart("Income Ratio", "TSLA", None).await.unwrap(),
            Chart::Empty { .. }
        ));
    }

    #[test]
    fn test_metrics_include_saved_formulas() {
        let (mut session, _dir) = session();
        session.save_formula("Income Ratio", "Net Income / Total Revenue").unwrap();

        match session.metrics() {
            Chart::Table { rows, .. } => {
                assert_eq!(rows.last().unwrap(), &vec!["Income Ratio".to_string(), "Formula".to_string()]);
                assert!(rows.iter().any(|r| r[0] == "ROE" && r[1] == "Ratio"));
            }
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_views_degrade_to_empty() {
        let (session, _dir) = session();

        let summary = session.quote("TSLA", Some(Market::Us)).await;
        assert_eq!(summary.close, 0.0);
        assert!(session.price("TSLA", PriceRange::OneMonth, None).await.bars.is_empty());
        assert!(matches!(session.statement("TSLA", None).await, Chart::Empty { .. }));
        assert!(matches!(session.flows("2330", None).await, Chart::Empty { .. }));

        let trend = session
            .trend("AAPL", &["Total Revenue".to_string()], Some(Market::Us))
            .await;
        assert_eq!(trend.series[0].points.len(), 2);
    }
}
