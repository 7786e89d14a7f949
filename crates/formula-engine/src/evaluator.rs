//! Element-wise evaluation of formulas over a statement table.

use crate::parser::{parse, BinaryOp, Expr};
use crate::FormulaError;
use dashboard_core::LineItem;
use financial_store::FinancialTable;
use serde::Serialize;

/// Formula result aligned to a table's ascending period index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedSeries {
    pub periods: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl DerivedSeries {
    pub fn zeros(periods: &[String]) -> Self {
        Self {
            periods: periods.to_vec(),
            values: vec![Some(0.0); periods.len()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Value of the most recent period; absent when that cell is absent.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// (period, value) pairs with absent cells skipped.
    pub fn points(&self) -> Vec<(String, f64)> {
        self.periods
            .iter()
            .zip(&self.values)
            .filter_map(|(p, v)| v.map(|v| (p.clone(), v)))
            .collect()
    }
}

fn vocabulary(table: &FinancialTable) -> Vec<&str> {
    let mut vocab: Vec<&str> = LineItem::names().collect();
    vocab.extend(table.column_names());
    vocab
}

/// Evaluate a formula against a table, surfacing every failure.
///
/// An empty table yields an empty series. Absent cells propagate as absent;
/// a present zero divisor is an error.
pub fn try_evaluate(expression: &str, table: &FinancialTable) -> Result<DerivedSeries, FormulaError> {
    let expr = parse(expression, &vocabulary(table))?;

    if table.is_empty() {
        return Ok(DerivedSeries::default());
    }

    if let Some(missing) = expr.items().into_iter().find(|item| !table.has_column(item)) {
        return Err(FormulaError::MissingItem(missing.to_string()));
    }

    let values = eval(&expr, table)?;
    Ok(DerivedSeries {
        periods: table.periods().to_vec(),
        values,
    })
}

/// Evaluate a formula, degrading any failure to a zero-filled series so a
/// bad formula renders as a flat line.
pub fn evaluate(expression: &str, table: &FinancialTable) -> DerivedSeries {
    match try_evaluate(expression, table) {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(
                "Formula '{}' failed for {}: {}",
                expression,
                table.ticker(),
                e
            );
            DerivedSeries::zeros(table.periods())
        }
    }
}

/// Latest-period value of a formula; `None` when the table is empty or the
/// latest cell is absent.
pub fn evaluate_latest(expression: &str, table: &FinancialTable) -> Option<f64> {
    evaluate(expression, table).latest()
}

fn eval(expr: &Expr, table: &FinancialTable) -> Result<Vec<Option<f64>>, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(vec![Some(*n); table.len()]),
        Expr::Item(name) => table
            .column(name)
            .map(|c| c.to_vec())
            .ok_or_else(|| FormulaError::MissingItem(name.clone())),
        Expr::Neg(inner) => Ok(eval(inner, table)?
            .into_iter()
            .map(|v| v.map(|v| -v))
            .collect()),
        Expr::Binary(op, lhs, rhs) => {
            let left = eval(lhs, table)?;
            let right = eval(rhs, table)?;

            left.into_iter()
                .zip(right)
                .zip(table.periods())
                .map(|((a, b), period)| match (a, b) {
                    (Some(a), Some(b)) => apply(*op, a, b, period).map(Some),
                    _ => Ok(None),
                })
                .collect()
        }
    }
}

fn apply(op: BinaryOp, a: f64, b: f64, period: &str) -> Result<f64, FormulaError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => {
            if b == 0.0 {
                Err(FormulaError::DivisionByZero(period.to_string()))
            } else {
                Ok(a / b)
            }
        }
    }
}
