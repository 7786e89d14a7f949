use dashboard_core::DashboardError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("invalid input at {pos}: {message}")]
    Lex { pos: usize, message: String },

    #[error("parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("line item '{0}' is not available")]
    MissingItem(String),

    #[error("division by zero in period {0}")]
    DivisionByZero(String),

    #[error("formula name is empty")]
    EmptyName,

    #[error("formula expression is empty")]
    EmptyExpression,
}

impl From<FormulaError> for DashboardError {
    fn from(err: FormulaError) -> Self {
        match err {
            FormulaError::EmptyName | FormulaError::EmptyExpression => {
                DashboardError::UserInput(err.to_string())
            }
            other => DashboardError::Formula(other.to_string()),
        }
    }
}
