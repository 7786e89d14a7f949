//! Canonical financial-statement vocabulary.
//!
//! Provider field names are normalized into this closed set. Names outside of
//! it may still flow through a statement table but are ranked after every
//! canonical item when displayed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display rank assigned to statement rows that are not canonical items.
pub const UNRANKED: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineItem {
    #[serde(rename = "Total Revenue")]
    TotalRevenue,
    #[serde(rename = "Cost of Revenue")]
    CostOfRevenue,
    #[serde(rename = "Gross Profit")]
    GrossProfit,
    #[serde(rename = "Operating Expense")]
    OperatingExpense,
    #[serde(rename = "Operating Income")]
    OperatingIncome,
    #[serde(rename = "Net Income")]
    NetIncome,
    #[serde(rename = "Basic EPS")]
    BasicEps,
}

impl LineItem {
    /// All canonical items in display order.
    pub const ALL: [LineItem; 7] = [
        LineItem::TotalRevenue,
        LineItem::CostOfRevenue,
        LineItem::GrossProfit,
        LineItem::OperatingExpense,
        LineItem::OperatingIncome,
        LineItem::NetIncome,
        LineItem::BasicEps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineItem::TotalRevenue => "Total Revenue",
            LineItem::CostOfRevenue => "Cost of Revenue",
            LineItem::GrossProfit => "Gross Profit",
            LineItem::OperatingExpense => "Operating Expense",
            LineItem::OperatingIncome => "Operating Income",
            LineItem::NetIncome => "Net Income",
            LineItem::BasicEps => "Basic EPS",
        }
    }

    /// Presentation order only; never used in computation.
    pub fn display_rank(&self) -> u32 {
        match self {
            LineItem::TotalRevenue => 10,
            LineItem::CostOfRevenue => 20,
            LineItem::GrossProfit => 30,
            LineItem::OperatingExpense => 40,
            LineItem::OperatingIncome => 50,
            LineItem::NetIncome => 90,
            LineItem::BasicEps => 100,
        }
    }

    /// Exact-name lookup against the canonical vocabulary.
    pub fn from_name(name: &str) -> Option<LineItem> {
        LineItem::ALL.into_iter().find(|item| item.as_str() == name)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        LineItem::ALL.iter().map(|item| item.as_str())
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display rank of any statement row name.
pub fn rank_of(name: &str) -> u32 {
    LineItem::from_name(name)
        .map(|item| item.display_rank())
        .unwrap_or(UNRANKED)
}
