//! Token-at-a-time formula editor.
//!
//! The builder only assembles text. Parenthesis balance and token order are
//! not checked here; a malformed formula surfaces when it is evaluated.

use crate::{FormulaError, FormulaRegistry};
use dashboard_core::LineItem;
use std::fmt;
use std::str::FromStr;

/// A token the builder can append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaToken {
    Item(LineItem),
    Add,
    Subtract,
    Multiply,
    Divide,
    OpenParen,
    CloseParen,
}

impl FormulaToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaToken::Item(item) => item.as_str(),
            FormulaToken::Add => "+",
            FormulaToken::Subtract => "-",
            FormulaToken::Multiply => "*",
            FormulaToken::Divide => "/",
            FormulaToken::OpenParen => "(",
            FormulaToken::CloseParen => ")",
        }
    }
}

impl fmt::Display for FormulaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormulaToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(FormulaToken::Add),
            "-" => Ok(FormulaToken::Subtract),
            "*" => Ok(FormulaToken::Multiply),
            "/" => Ok(FormulaToken::Divide),
            "(" => Ok(FormulaToken::OpenParen),
            ")" => Ok(FormulaToken::CloseParen),
            other => LineItem::from_name(other)
                .map(FormulaToken::Item)
                .ok_or_else(|| format!("'{}' is not a line item or operator", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaBuilder {
    buffer: String,
}

impl FormulaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends the token followed by a single space.
    pub fn append(&mut self, token: FormulaToken) {
        self.append_raw(token.as_str());
    }

    /// Appends arbitrary text, e.g. a numeric literal, followed by a space.
    pub fn append_raw(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push(' ');
    }

    /// Removes the last character, whatever it is.
    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Register the trimmed buffer under `name`, then reset it. On a blank
    /// name or buffer nothing changes.
    pub fn save(&mut self, name: &str, registry: &mut FormulaRegistry) -> Result<(), FormulaError> {
        registry.register(name, self.buffer.trim())?;
        self.buffer.clear();
        Ok(())
    }
}
