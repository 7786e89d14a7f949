//! Valuation ratios shown alongside statement metrics.

/// Display label and the snapshot field it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioDef {
    pub label: &'static str,
    pub field: &'static str,
}

pub const RATIO_CATALOG: &[RatioDef] = &[
    RatioDef { label: "P/E (Trailing)", field: "trailingPE" },
    RatioDef { label: "P/E (Forward)", field: "forwardPE" },
    RatioDef { label: "PEG", field: "pegRatio" },
    RatioDef { label: "P/B", field: "priceToBook" },
    RatioDef { label: "P/S", field: "priceToSalesTrailing12Months" },
    RatioDef { label: "EV/EBITDA", field: "enterpriseValueToEbitda" },
    RatioDef { label: "Net Margin", field: "profitMargins" },
    RatioDef { label: "Gross Margin", field: "grossMargins" },
    RatioDef { label: "Operating Margin", field: "operatingMargins" },
    RatioDef { label: "ROE", field: "returnOnEquity" },
    RatioDef { label: "ROA", field: "returnOnAssets" },
    RatioDef { label: "Current Ratio", field: "currentRatio" },
    RatioDef { label: "Quick Ratio", field: "quickRatio" },
    RatioDef { label: "Debt/Equity", field: "debtToEquity" },
    RatioDef { label: "Beta", field: "beta" },
    RatioDef { label: "Dividend Yield", field: "dividendYield" },
    RatioDef { label: "Payout Ratio", field: "payoutRatio" },
];

/// Fields the provider reports as fractions.
const PERCENT_FIELDS: &[&str] = &[
    "profitMargins",
    "grossMargins",
    "operatingMargins",
    "returnOnAssets",
    "returnOnEquity",
    "dividendYield",
    "payoutRatio",
];

pub fn ratio_field(label: &str) -> Option<&'static str> {
    RATIO_CATALOG
        .iter()
        .find(|r| r.label == label)
        .map(|r| r.field)
}

pub fn labels() -> impl Iterator<Item = &'static str> {
    RATIO_CATALOG.iter().map(|r| r.label)
}

pub fn is_percentage(field: &str) -> bool {
    PERCENT_FIELDS.contains(&field)
}

/// Value as displayed: fractions become percentages, a missing value is 0.
pub fn display_value(field: &str, raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v != 0.0 && v.is_finite() => {
            if is_percentage(field) {
                v * 100.0
            } else {
                v
            }
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentage_fields_are_rescaled() {
        assert_relative_eq!(display_value("profitMargins", Some(0.253)), 25.3);
        assert_relative_eq!(display_value("dividendYield", Some(0.005)), 0.5);
    }

    #[test]
    fn test_other_fields_pass_through() {
        assert_relative_eq!(display_value("trailingPE", Some(28.4)), 28.4);
        assert_relative_eq!(display_value("debtToEquity", Some(151.9)), 151.9);
    }

    #[test]
    fn test_missing_displays_as_zero() {
        assert_eq!(display_value("grossMargins", None), 0.0);
        assert_eq!(display_value("beta", Some(f64::NAN)), 0.0);
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(ratio_field("ROE"), Some("returnOnEquity"));
        assert_eq!(ratio_field("Net Income"), None);
        assert_eq!(labels().count(), 17);
        assert!(RATIO_CATALOG
            .iter()
            .filter(|r| is_percentage(r.field))
            .all(|r| r.label.contains("Margin")
                || matches!(r.label, "ROE" | "ROA" | "Dividend Yield" | "Payout Ratio")));
    }
}
