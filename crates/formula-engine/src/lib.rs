//! Custom Ratio Formula Engine
//!
//! User formulas combine statement line items with `+ - * /` and parentheses,
//! e.g. `Net Income / Total Revenue`. Formulas are tokenized against the
//! line-item vocabulary, parsed into an arithmetic tree and evaluated
//! element-wise over a ticker's period index. Nothing but arithmetic over
//! table columns is reachable from a formula string.

pub mod builder;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod registry;

pub use builder::{FormulaBuilder, FormulaToken};
pub use error::FormulaError;
pub use evaluator::{evaluate, evaluate_latest, try_evaluate, DerivedSeries};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, BinaryOp, Expr};
pub use registry::FormulaRegistry;
