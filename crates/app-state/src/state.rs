use crate::{Holding, Watchlists};
use dashboard_core::DashboardError;
use formula_engine::{FormulaBuilder, FormulaRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of the state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    watchlists: Watchlists,
    #[serde(default)]
    custom_ratios: FormulaRegistry,
}

/// Durable dashboard state: watchlist folders and saved formulas.
///
/// Every mutator validates first, then changes memory and rewrites the whole
/// file. A rejected action leaves both untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    path: PathBuf,
    watchlists: Watchlists,
    formulas: FormulaRegistry,
}

impl AppState {
    /// Fresh state with the seeded folder, not yet written anywhere.
    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            watchlists: Watchlists::seeded(),
            formulas: FormulaRegistry::new(),
        }
    }

    /// Read state from `path`, surfacing a missing or unparsable file.
    pub fn try_load(path: impl Into<PathBuf>) -> Result<Self, DashboardError> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        let file: StateFile = serde_json::from_str(&contents)
            .map_err(|e| DashboardError::State(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            watchlists: file.watchlists,
            formulas: file.custom_ratios,
        })
    }

    /// Read state from `path`; a missing or corrupt file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(state) => {
                tracing::info!(
                    "Loaded {} folder(s) and {} formula(s) from {}",
                    state.watchlists.len(),
                    state.formulas.len(),
                    path.display()
                );
                state
            }
            Err(DashboardError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, starting with defaults", path.display());
                Self::with_defaults(path)
            }
            Err(e) => {
                tracing::warn!("{}; starting with defaults", e);
                Self::with_defaults(path)
            }
        }
    }

    /// Overwrite the state file with the current state.
    pub fn persist(&self) -> Result<(), DashboardError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = StateFile {
            watchlists: self.watchlists.clone(),
            custom_ratios: self.formulas.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        tracing::debug!("State written to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn watchlists(&self) -> &Watchlists {
        &self.watchlists
    }

    pub fn formulas(&self) -> &FormulaRegistry {
        &self.formulas
    }

    pub fn save_formula(&mut self, name: &str, expression: &str) -> Result<(), DashboardError> {
        self.formulas.register(name, expression)?;
        self.persist()
    }

    /// Register the builder's buffer under `name` and reset the builder.
    pub fn save_built_formula(&mut self, builder: &mut FormulaBuilder, name: &str) -> Result<(), DashboardError> {
        builder.save(name, &mut self.formulas)?;
        self.persist()
    }

    pub fn delete_formula(&mut self, name: &str) -> Result<bool, DashboardError> {
        if self.formulas.remove(name).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn create_folder(&mut self, name: &str) -> Result<bool, DashboardError> {
        let created = self.watchlists.create_folder(name)?;
        if created {
            self.persist()?;
        }
        Ok(created)
    }

    pub fn delete_folder(&mut self, name: &str) -> Result<bool, DashboardError> {
        let deleted = self.watchlists.delete_folder(name);
        if deleted {
            self.persist()?;
        }
        Ok(deleted)
    }

    pub fn add_ticker(&mut self, folder: &str, ticker: &str) -> Result<bool, DashboardError> {
        let added = self.watchlists.add_ticker(folder, ticker)?;
        if added {
            self.persist()?;
        }
        Ok(added)
    }

    pub fn remove_ticker(&mut self, folder: &str, ticker: &str) -> Result<bool, DashboardError> {
        let removed = self.watchlists.remove_ticker(folder, ticker)?;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn set_holding(&mut self, folder: &str, ticker: &str, holding: Holding) -> Result<(), DashboardError> {
        self.watchlists.set_holding(folder, ticker, holding)?;
        self.persist()
    }
}
