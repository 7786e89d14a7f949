use crate::FormulaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named user formulas. Serializes as a plain `name -> expression` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaRegistry {
    formulas: BTreeMap<String, String>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a formula. Blank names or expressions are rejected
    /// and leave the registry untouched.
    pub fn register(&mut self, name: &str, expression: &str) -> Result<(), FormulaError> {
        let name = name.trim();
        let expression = expression.trim();

        if name.is_empty() {
            return Err(FormulaError::EmptyName);
        }
        if expression.is_empty() {
            return Err(FormulaError::EmptyExpression);
        }

        if let Some(previous) = self.formulas.insert(name.to_string(), expression.to_string()) {
            tracing::debug!("Formula '{}' replaced (was '{}')", name, previous);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.formulas.get(name).map(|e| e.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formulas.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.formulas.remove(name.trim())
    }

    /// Current (name, expression) pairs, ordered by name.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.formulas.iter().map(|(n, e)| (n.as_str(), e.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}
