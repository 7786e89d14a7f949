//! Period × line-item table for one ticker.

use dashboard_core::{rank_of, StatementRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Pivoted statement data for a single ticker.
///
/// Periods are kept ascending; descending views are derived on demand. Each
/// column is aligned with the period index, and missing cells stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialTable {
    ticker: String,
    periods: Vec<String>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// Statement table as displayed: rows by display rank, newest period first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub ticker: String,
    pub periods: Vec<String>,
    pub rows: Vec<StatementRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRow {
    pub item: String,
    pub values: Vec<Option<f64>>,
}

impl FinancialTable {
    pub fn empty(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Default::default()
        }
    }

    /// Pivot normalized records. A later record for the same (period, item)
    /// replaces an earlier one.
    pub fn from_records(ticker: &str, records: &[StatementRecord]) -> Self {
        let mut cells: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();

        for record in records {
            if !record.ticker.eq_ignore_ascii_case(ticker) {
                tracing::debug!(
                    "Skipping record for {} while building table for {}",
                    record.ticker,
                    ticker
                );
                continue;
            }
            cells
                .entry(record.period.as_str())
                .or_default()
                .insert(record.item.as_str(), record.value);
        }

        let periods: Vec<String> = cells.keys().map(|p| p.to_string()).collect();
        let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

        for (idx, items) in cells.values().enumerate() {
            for (item, value) in items {
                columns
                    .entry(item.to_string())
                    .or_insert_with(|| vec![None; periods.len()])[idx] = Some(*value);
            }
        }

        Self {
            ticker: ticker.to_string(),
            periods,
            columns,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Number of periods
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Period index, oldest first (trend order)
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// Period index, newest first (tabular order)
    pub fn periods_descending(&self) -> impl Iterator<Item = &str> {
        self.periods.iter().rev().map(|p| p.as_str())
    }

    pub fn column(&self, item: &str) -> Option<&[Option<f64>]> {
        self.columns.get(item).map(|c| c.as_slice())
    }

    pub fn has_column(&self, item: &str) -> bool {
        self.columns.contains_key(item)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn value(&self, period: &str, item: &str) -> Option<f64> {
        let idx = self.periods.iter().position(|p| p == period)?;
        self.columns.get(item).and_then(|c| c[idx])
    }

    /// Cell of the most recent period, which may itself be absent.
    pub fn latest(&self, item: &str) -> Option<f64> {
        self.periods.last().and_then(|period| self.value(period, item))
    }

    /// (period, value) pairs in ascending order, absent cells skipped.
    pub fn series(&self, item: &str) -> Vec<(String, f64)> {
        match self.columns.get(item) {
            Some(column) => self
                .periods
                .iter()
                .zip(column)
                .filter_map(|(p, v)| v.map(|v| (p.clone(), v)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn statement_view(&self) -> StatementView {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort_by(|a, b| rank_of(a).cmp(&rank_of(b)).then_with(|| a.cmp(b)));

        let rows = names
            .into_iter()
            .map(|name| StatementRow {
                item: name.clone(),
                values: self.columns[name].iter().rev().copied().collect(),
            })
            .collect();

        StatementView {
            ticker: self.ticker.clone(),
            periods: self.periods_descending().map(|p| p.to_string()).collect(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(period: &str, item: &str, value: f64) -> StatementRecord {
        StatementRecord {
            ticker: "AAPL".to_string(),
            period: period.to_string(),
            item: item.to_string(),
            value,
        }
    }

    #[test]
    fn test_periods_sorted_ascending_with_descending_view() {
        let table = FinancialTable::from_records(
            "AAPL",
            &[
                record("2024-06-30", "Total Revenue", 200.0),
                record("2023-12-31", "Total Revenue", 50.0),
                record("2024-03-31", "Total Revenue", 100.0),
            ],
        );

        assert_eq!(table.periods(), &["2023-12-31", "2024-03-31", "2024-06-30"]);
        let desc: Vec<&str> = table.periods_descending().collect();
        assert_eq!(desc, vec!["2024-06-30", "2024-03-31", "2023-12-31"]);
        assert_relative_eq!(table.latest("Total Revenue").unwrap(), 200.0);
    }

    #[test]
    fn test_last_write_wins_on_collision() {
        let table = FinancialTable::from_records(
            "AAPL",
            &[
                record("2024-03-31", "Basic EPS", 1.52),
                record("2024-03-31", "Basic EPS", 1.53),
            ],
        );

        assert_eq!(table.len(), 1);
        assert_relative_eq!(table.value("2024-03-31", "Basic EPS").unwrap(), 1.53);
    }

    #[test]
    fn test_missing_cells_stay_absent() {
        let table = FinancialTable::from_records(
            "AAPL",
            &[
                record("2024-03-31", "Total Revenue", 100.0),
                record("2024-06-30", "Total Revenue", 200.0),
                record("2024-06-30", "Net Income", 40.0),
                record("2024-03-31", "Cost of Revenue", 60.0),
            ],
        );

        assert_eq!(table.column("Net Income").unwrap(), &[None, Some(40.0)]);
        assert_eq!(table.latest("Net Income"), Some(40.0));
        // Latest means the latest period, not the latest present cell
        assert_eq!(table.latest("Cost of Revenue"), None);
        assert_eq!(table.value("2024-03-31", "Net Income"), None);
        assert_eq!(table.series("Net Income"), vec![("2024-06-30".to_string(), 40.0)]);
        assert!(table.column("Gross Profit").is_none());
    }

    #[test]
    fn test_records_for_other_tickers_are_ignored() {
        let mut other = record("2024-03-31", "Total Revenue", 1.0);
        other.ticker = "MSFT".to_string();
        let table = FinancialTable::from_records("AAPL", &[other]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_statement_view_orders_rows_by_rank() {
        let table = FinancialTable::from_records(
            "AAPL",
            &[
                record("2024-03-31", "Net Income", 10.0),
                record("2024-03-31", "Custom Line", 3.0),
                record("2024-03-31", "Total Revenue", 100.0),
                record("2024-06-30", "Total Revenue", 120.0),
            ],
        );

        let view = table.statement_view();
        let names: Vec<&str> = view.rows.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(names, vec!["Total Revenue", "Net Income", "Custom Line"]);
        assert_eq!(view.periods, vec!["2024-06-30", "2024-03-31"]);
        assert_eq!(view.rows[0].values, vec![Some(120.0), Some(100.0)]);
        assert_eq!(view.rows[1].values, vec![None, Some(10.0)]);
    }
}
