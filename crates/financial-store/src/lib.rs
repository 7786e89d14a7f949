//! Financial Store
//!
//! Normalizes provider statement payloads into canonical line items and pivots
//! them into a per-ticker period × line-item table.

pub mod normalizer;
pub mod table;

pub use normalizer::{canonical_name, normalize, FieldMap, TAIWAN_FIELDS, US_FIELDS};
pub use table::{FinancialTable, StatementRow, StatementView};
