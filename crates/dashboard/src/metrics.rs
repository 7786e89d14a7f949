//! Metric name resolution.
//!
//! A metric name may be a valuation ratio label, a saved formula or a
//! statement line item. Trend charts and peer comparisons consult these in
//! different orders.

use crate::chart::Chart;
use crate::ratios;
use dashboard_core::{LineItem, RatioSnapshot};
use financial_store::FinancialTable;
use formula_engine::{evaluate, evaluate_latest, FormulaRegistry};

/// Time series for a trend chart: saved formula first, then a direct column.
/// `None` when the name resolves to nothing or the formula yields no periods.
pub fn trend_series(
    name: &str,
    formulas: &FormulaRegistry,
    table: &FinancialTable,
) -> Option<Vec<(String, f64)>> {
    if let Some(expression) = formulas.get(name) {
        let series = evaluate(expression, table);
        if series.is_empty() {
            tracing::debug!("Formula '{}' produced no periods for {}", name, table.ticker());
            return None;
        }
        return Some(series.points());
    }

    if table.has_column(name) {
        return Some(table.series(name));
    }

    tracing::debug!("Metric '{}' not available for {}", name, table.ticker());
    None
}

/// Latest scalar for a peer comparison: ratio catalog, then saved formula
/// (only with statement data), then the column's last period. Anything that
/// cannot be resolved shows as 0.
pub fn peer_value(
    name: &str,
    formulas: &FormulaRegistry,
    table: &FinancialTable,
    snapshot: &RatioSnapshot,
) -> f64 {
    if let Some(field) = ratios::ratio_field(name) {
        return ratios::display_value(field, snapshot.get(field));
    }

    if let Some(expression) = formulas.get(name) {
        if !table.is_empty() {
            return evaluate_latest(expression, table).unwrap_or(0.0);
        }
    }

    table.latest(name).unwrap_or(0.0)
}

/// Every selectable metric name with where it comes from: line items, then
/// ratio labels, then saved formulas.
pub fn catalog(formulas: &FormulaRegistry) -> Vec<(String, &'static str)> {
    LineItem::names()
        .map(|name| (name.to_string(), "Line item"))
        .chain(ratios::labels().map(|label| (label.to_string(), "Ratio")))
        .chain(formulas.names().map(|name| (name.to_string(), "Formula")))
        .collect()
}

pub fn catalog_chart(formulas: &FormulaRegistry) -> Chart {
    Chart::Table {
        title: "Metrics".to_string(),
        columns: vec!["Name".to_string(), "Source".to_string()],
        rows: catalog(formulas)
            .into_iter()
            .map(|(name, source)| vec![name, source.to_string()])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dashboard_core::StatementRecord;
    use std::collections::HashMap;

    fn table(ticker: &str, rows: &[(&str, &str, f64)]) -> FinancialTable {
        let records: Vec<StatementRecord> = rows
            .iter()
            .map(|(period, item, value)| StatementRecord {
                ticker: ticker.to_string(),
                period: period.to_string(),
                item: item.to_string(),
                value: *value,
            })
            .collect();
        FinancialTable::from_records(ticker, &records)
    }

    fn formulas() -> FormulaRegistry {
        let mut registry = FormulaRegistry::new();
        registry.register("Income Ratio", "Net Income / Total Revenue").unwrap();
        // Shadows the column of the same name
        registry.register("Net Income", "Net Income * 2").unwrap();
        registry
    }

    fn sample() -> FinancialTable {
        table(
            "AAPL",
            &[
                ("P1", "Total Revenue", 100.0),
                ("P2", "Total Revenue", 200.0),
                ("P1", "Net Income", 10.0),
                ("P2", "Net Income", 40.0),
            ],
        )
    }

    #[test]
    fn test_trend_prefers_formula_over_column() {
        let series = trend_series("Net Income", &formulas(), &sample()).unwrap();
        assert_eq!(series, vec![("P1".to_string(), 20.0), ("P2".to_string(), 80.0)]);
    }

    #[test]
    fn test_trend_column_and_unknown() {
        let series = trend_series("Total Revenue", &formulas(), &sample()).unwrap();
        assert_eq!(series.len(), 2);
        assert!(trend_series("Gross Profit", &formulas(), &sample()).is_none());
    }

    #[test]
    fn test_trend_skips_formula_on_empty_table() {
        let empty = FinancialTable::empty("AAPL");
        assert!(trend_series("Income Ratio", &formulas(), &empty).is_none());
    }

    #[test]
    fn test_peer_value_precedence() {
        let snapshot = RatioSnapshot {
            symbol: "AAPL".into(),
            fields: HashMap::from([("returnOnEquity".to_string(), 1.47)]),
        };
        let registry = formulas();
        let t = sample();

        assert_relative_eq!(peer_value("ROE", &registry, &t, &snapshot), 147.0);
        assert_relative_eq!(peer_value("Income Ratio", &registry, &t, &snapshot), 0.2);
        assert_relative_eq!(peer_value("Total Revenue", &registry, &t, &snapshot), 200.0);
        assert_eq!(peer_value("P/B", &registry, &t, &snapshot), 0.0);
        assert_eq!(peer_value("Unknown", &registry, &t, &snapshot), 0.0);
    }

    #[test]
    fn test_ratio_label_shadows_formula() {
        let mut registry = FormulaRegistry::new();
        registry.register("Net Margin", "Net Income / Total Revenue").unwrap();
        let snapshot = RatioSnapshot {
            symbol: "AAPL".into(),
            fields: HashMap::from([("profitMargins".to_string(), 0.25)]),
        };

        assert_relative_eq!(peer_value("Net Margin", &registry, &sample(), &snapshot), 25.0);
        // Trends have no ratio history, so the formula is used
        assert_eq!(trend_series("Net Margin", &registry, &sample()).unwrap().len(), 2);
    }

    #[test]
    fn test_catalog_lists_every_source() {
        let entries = catalog(&formulas());
        assert_eq!(entries.len(), LineItem::ALL.len() + ratios::RATIO_CATALOG.len() + 2);
        assert_eq!(entries[0], ("Total Revenue".to_string(), "Line item"));
        assert!(entries.contains(&("P/E (Trailing)".to_string(), "Ratio")));
        assert_eq!(entries.last(), Some(&("Net Income".to_string(), "Formula")));

        match catalog_chart(&FormulaRegistry::new()) {
            Chart::Table { rows, .. } => assert_eq!(rows.len(), 24),
            other => panic!("unexpected chart: {:?}", other),
        }
    }

    #[test]
    fn test_peer_formula_without_statements_is_zero() {
        let empty = FinancialTable::empty("TSLA");
        assert_eq!(
            peer_value("Income Ratio", &formulas(), &empty, &RatioSnapshot::default()),
            0.0
        );
    }
}
