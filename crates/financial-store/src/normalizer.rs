//! Provider field names → canonical line items.

use dashboard_core::{LineItem, RawStatementRow, StatementPayload, StatementRecord};

/// Fixed lookup table from one provider's field names to canonical items.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entries: &'static [(&'static str, LineItem)],
}

/// FinMind `TaiwanStockFinancialStatements` types
pub const TAIWAN_FIELDS: FieldMap = FieldMap {
    entries: &[
        ("Revenue", LineItem::TotalRevenue),
        ("CostOfGoodsSold", LineItem::CostOfRevenue),
        ("GrossProfit", LineItem::GrossProfit),
        ("OperatingExpenses", LineItem::OperatingExpense),
        ("OperatingIncome", LineItem::OperatingIncome),
        ("NetIncome", LineItem::NetIncome),
        ("IncomeAfterTaxes", LineItem::NetIncome),
        ("EPS", LineItem::BasicEps),
    ],
};

/// Yahoo fundamentals-timeseries keys plus the labels of its statement tables
pub const US_FIELDS: FieldMap = FieldMap {
    entries: &[
        ("TotalRevenue", LineItem::TotalRevenue),
        ("CostOfRevenue", LineItem::CostOfRevenue),
        ("Cost Of Revenue", LineItem::CostOfRevenue),
        ("GrossProfit", LineItem::GrossProfit),
        ("OperatingExpense", LineItem::OperatingExpense),
        ("OperatingIncome", LineItem::OperatingIncome),
        ("NetIncome", LineItem::NetIncome),
        ("NetIncomeCommonStockholders", LineItem::NetIncome),
        ("Net Income Common Stockholders", LineItem::NetIncome),
        ("BasicEPS", LineItem::BasicEps),
        ("DilutedEPS", LineItem::BasicEps),
        ("Diluted EPS", LineItem::BasicEps),
    ],
};

impl FieldMap {
    pub fn resolve(&self, field: &str) -> Option<LineItem> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, item)| *item)
    }

    pub fn for_payload(payload: &StatementPayload) -> FieldMap {
        match payload {
            StatementPayload::TaiwanFilings(_) => TAIWAN_FIELDS,
            StatementPayload::UsQuarterly(_) => US_FIELDS,
        }
    }
}

/// Canonical name for a provider field. Unmapped names come back unchanged so
/// custom rows survive, excluded from standardized analysis.
pub fn canonical_name(map: &FieldMap, field: &str) -> String {
    let field = field.trim();
    match map.resolve(field).or_else(|| LineItem::from_name(field)) {
        Some(item) => item.as_str().to_string(),
        None => field.to_string(),
    }
}

/// Rewrite a provider payload into canonical statement records, preserving
/// input order. Rows without a period or a finite value are dropped.
pub fn normalize(ticker: &str, payload: &StatementPayload) -> Vec<StatementRecord> {
    let map = FieldMap::for_payload(payload);
    let rows = payload.rows();

    let records: Vec<StatementRecord> = rows
        .iter()
        .filter(|row| is_usable(row))
        .map(|row| StatementRecord {
            ticker: ticker.to_string(),
            period: row.period.trim().to_string(),
            item: canonical_name(&map, &row.field),
            value: row.value,
        })
        .collect();

    if records.len() < rows.len() {
        tracing::debug!(
            "Normalizer dropped {} malformed rows for {}",
            rows.len() - records.len(),
            ticker
        );
    }

    records
}

fn is_usable(row: &RawStatementRow) -> bool {
    !row.period.trim().is_empty() && !row.field.trim().is_empty() && row.value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(field: &str, period: &str, value: f64) -> RawStatementRow {
        RawStatementRow {
            field: field.to_string(),
            period: period.to_string(),
            value,
        }
    }

    #[test]
    fn test_taiwan_fields_map_to_canonical() {
        let payload = StatementPayload::TaiwanFilings(vec![
            row("Revenue", "2024-03-31", 100.0),
            row("CostOfGoodsSold", "2024-03-31", 60.0),
            row("EPS", "2024-03-31", 1.5),
        ]);

        let records = normalize("2330", &payload);
        let items: Vec<&str> = records.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["Total Revenue", "Cost of Revenue", "Basic EPS"]);
        assert!(records.iter().all(|r| r.ticker == "2330"));
    }

    #[test]
    fn test_us_aliases_collapse_onto_one_item() {
        let payload = StatementPayload::UsQuarterly(vec![
            row("DilutedEPS", "2024-03-31", 1.52),
            row("BasicEPS", "2024-03-31", 1.53),
            row("NetIncomeCommonStockholders", "2024-03-31", 23.0),
        ]);

        let records = normalize("AAPL", &payload);
        assert_eq!(records[0].item, "Basic EPS");
        assert_eq!(records[1].item, "Basic EPS");
        assert_eq!(records[2].item, "Net Income");
    }

    #[test]
    fn test_unmapped_and_canonical_names_pass_through() {
        let payload = StatementPayload::TaiwanFilings(vec![
            row("TotalNonoperatingIncomeAndExpense", "2024-03-31", 5.0),
            row("Gross Profit", "2024-03-31", 40.0),
        ]);

        let records = normalize("2330", &payload);
        assert_eq!(records[0].item, "TotalNonoperatingIncomeAndExpense");
        assert_eq!(records[1].item, "Gross Profit");
    }

    #[test]
    fn test_malformed_rows_are_dropped() {
        let payload = StatementPayload::UsQuarterly(vec![
            row("TotalRevenue", "", 1.0),
            row("TotalRevenue", "2024-03-31", f64::NAN),
            row("TotalRevenue", "2024-06-30", 2.0),
        ]);

        let records = normalize("AAPL", &payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, "2024-06-30");
    }

    #[test]
    fn test_empty_payload_yields_no_records() {
        assert!(normalize("AAPL", &StatementPayload::UsQuarterly(Vec::new())).is_empty());
    }
}
