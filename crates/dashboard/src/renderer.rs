//! Views handed to a [`ChartSink`](crate::ChartSink).

use crate::chart::{format_number, Chart, Series};
use crate::metrics::{peer_value, trend_series};
use dashboard_core::{Bar, InstitutionalActivity, Market, PriceRange, RatioSnapshot};
use financial_store::{FinancialTable, StatementView};
use formula_engine::FormulaRegistry;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<(String, f64)>,
}

/// Selected metrics of one ticker across its statement periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub ticker: String,
    pub series: Vec<MetricSeries>,
}

impl TrendChart {
    /// Metrics that resolve to nothing are left out.
    pub fn build(metrics: &[String], formulas: &FormulaRegistry, table: &FinancialTable) -> Self {
        let series = metrics
            .iter()
            .filter_map(|name| {
                trend_series(name, formulas, table).map(|points| MetricSeries {
                    name: name.clone(),
                    points,
                })
            })
            .collect();

        Self {
            ticker: table.ticker().to_string(),
            series,
        }
    }

    pub fn chart(&self) -> Chart {
        let title = format!("{} trend", self.ticker);
        if self.series.is_empty() {
            return Chart::Empty {
                title,
                message: "No selected metric is available".to_string(),
            };
        }

        Chart::Line {
            title,
            series: self
                .series
                .iter()
                .map(|s| Series {
                    name: s.name.clone(),
                    points: s.points.clone(),
                })
                .collect(),
        }
    }
}

/// Everything fetched for one peer.
#[derive(Debug, Clone)]
pub struct PeerData {
    pub ticker: String,
    pub table: FinancialTable,
    pub snapshot: RatioSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerRow {
    pub ticker: String,
    /// One value per metric, in metric order
    pub values: Vec<f64>,
}

/// Latest value of each metric for every ticker in a folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub folder: String,
    pub metrics: Vec<String>,
    pub rows: Vec<PeerRow>,
}

impl PeerComparison {
    pub fn build(
        folder: &str,
        metrics: &[String],
        formulas: &FormulaRegistry,
        peers: &[PeerData],
    ) -> Self {
        let rows = peers
            .iter()
            .map(|peer| PeerRow {
                ticker: peer.ticker.clone(),
                values: metrics
                    .iter()
                    .map(|m| peer_value(m, formulas, &peer.table, &peer.snapshot))
                    .collect(),
            })
            .collect();

        Self {
            folder: folder.to_string(),
            metrics: metrics.to_vec(),
            rows,
        }
    }

    pub fn chart(&self) -> Chart {
        let title = format!("{} comparison", self.folder);
        if self.rows.is_empty() || self.metrics.is_empty() {
            return Chart::Empty {
                title,
                message: "Folder has no tickers or no metric was selected".to_string(),
            };
        }

        let series = self
            .metrics
            .iter()
            .enumerate()
            .map(|(i, metric)| Series {
                name: metric.clone(),
                points: self
                    .rows
                    .iter()
                    .map(|row| (row.ticker.clone(), row.values.get(i).copied().unwrap_or(0.0)))
                    .collect(),
            })
            .collect();

        Chart::GroupedBar {
            title,
            categories: self.rows.iter().map(|r| r.ticker.clone()).collect(),
            series,
        }
    }
}

pub fn statement_chart(view: &StatementView) -> Chart {
    let title = format!("{} income statement", view.ticker);
    if view.rows.is_empty() {
        return Chart::Empty {
            title,
            message: "No data available".to_string(),
        };
    }

    let mut columns = vec!["Item".to_string()];
    columns.extend(view.periods.iter().cloned());

    let rows = view
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.item.clone()];
            cells.extend(
                row.values
                    .iter()
                    .map(|v| v.map(format_number).unwrap_or_else(|| "-".to_string())),
            );
            cells
        })
        .collect();

    Chart::Table {
        title,
        columns,
        rows,
    }
}

/// Closing prices on the exchange's local clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChart {
    pub ticker: String,
    pub market: Market,
    pub range: PriceRange,
    pub bars: Vec<Bar>,
}

impl PriceChart {
    pub fn chart(&self) -> Chart {
        let title = format!("{} ({}, {})", self.ticker, self.market, self.range.range());
        if self.bars.is_empty() {
            return Chart::Empty {
                title,
                message: "No data available".to_string(),
            };
        }

        // Intraday labels are categorical so overnight gaps collapse
        let format = if self.range.is_intraday() {
            "%Y-%m-%d %H:%M"
        } else {
            "%Y-%m-%d"
        };
        let points = self
            .bars
            .iter()
            .map(|b| (b.local_time(self.market).format(format).to_string(), b.close))
            .collect();

        Chart::Line {
            title,
            series: vec![Series {
                name: "Close".to_string(),
                points,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub ticker: String,
    pub open: f64,
    pub close: f64,
    /// First to last bar over the year, percent
    pub change_pct: f64,
    pub eps: f64,
    pub last_dividend: f64,
}

impl PriceSummary {
    /// Summarize a year of daily bars, falling back to the snapshot's quote
    /// fields when no bars are available.
    pub fn build(ticker: &str, year_bars: &[Bar], snapshot: &RatioSnapshot) -> Self {
        let (open, close, change_pct) = match (year_bars.first(), year_bars.last()) {
            (Some(first), Some(last)) => {
                let change = if first.close != 0.0 {
                    (last.close - first.close) / first.close * 100.0
                } else {
                    0.0
                };
                (last.open, last.close, change)
            }
            _ => (
                snapshot.get("open").unwrap_or(0.0),
                snapshot.get("currentPrice").unwrap_or(0.0),
                0.0,
            ),
        };

        Self {
            ticker: ticker.to_string(),
            open,
            close,
            change_pct,
            eps: snapshot.get("trailingEps").unwrap_or(0.0),
            last_dividend: snapshot.get("lastDividendValue").unwrap_or(0.0),
        }
    }

    pub fn chart(&self) -> Chart {
        let rows = [
            ("Open", self.open),
            ("Close", self.close),
            ("1Y Change %", self.change_pct),
            ("EPS", self.eps),
            ("Last Dividend", self.last_dividend),
        ]
        .iter()
        .map(|(label, value)| vec![label.to_string(), format!("{:.2}", value)])
        .collect();

        Chart::Table {
            title: format!("{} summary", self.ticker),
            columns: vec!["Field".to_string(), "Value".to_string()],
            rows,
        }
    }
}

pub fn institutional_chart(ticker: &str, activity: &InstitutionalActivity) -> Chart {
    match activity {
        InstitutionalActivity::Flows(flows) if !flows.is_empty() => {
            let categories: Vec<String> = flows
                .iter()
                .map(|f| f.date.to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let investors: BTreeSet<&str> = flows.iter().map(|f| f.investor.as_str()).collect();

            let series = investors
                .into_iter()
                .map(|investor| Series {
                    name: investor.to_string(),
                    points: flows
                        .iter()
                        .filter(|f| f.investor == investor)
                        .map(|f| (f.date.to_string(), f.buy))
                        .collect(),
                })
                .collect();

            Chart::GroupedBar {
                title: format!("{} institutional buys", ticker),
                categories,
                series,
            }
        }
        InstitutionalActivity::Holders(holders) if !holders.is_empty() => {
            let cell = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "-".to_string());
            let rows = holders
                .iter()
                .map(|h| {
                    vec![
                        h.organization.clone(),
                        h.pct_held
                            .map(|p| format!("{:.2}%", p * 100.0))
                            .unwrap_or_else(|| "-".to_string()),
                        cell(h.shares),
                        cell(h.value),
                        h.report_date.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();

            Chart::Table {
                title: format!("{} institutional holders", ticker),
                columns: ["Holder", "% Held", "Shares", "Value", "Reported"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                rows,
            }
        }
        _ => Chart::Empty {
            title: format!("{} institutional activity", ticker),
            message: "No data available".to_string(),
        },
    }
}
