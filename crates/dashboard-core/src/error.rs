use thiserror::Error;

/// Coarse failure classes shown to the user. Every class degrades to a
/// neutral value at the UI boundary; the class only decides the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataUnavailable,
    FormulaEvaluation,
    StateCorruption,
    UserInput,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("State error: {0}")]
    State(String),

    #[error("{0}")]
    UserInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::DataUnavailable(_)
            | DashboardError::InvalidData(_)
            | DashboardError::Api(_) => ErrorKind::DataUnavailable,
            DashboardError::Formula(_) => ErrorKind::FormulaEvaluation,
            DashboardError::State(_) | DashboardError::Io(_) | DashboardError::Serialization(_) => {
                ErrorKind::StateCorruption
            }
            DashboardError::UserInput(_) => ErrorKind::UserInput,
        }
    }

    /// Message safe to show in place of the data that could not be produced.
    pub fn neutral_message(&self) -> String {
        match self.kind() {
            ErrorKind::DataUnavailable => "No data available".to_string(),
            ErrorKind::FormulaEvaluation => "Formula could not be evaluated".to_string(),
            ErrorKind::StateCorruption => "Saved state unavailable, using defaults".to_string(),
            ErrorKind::UserInput => self.to_string(),
        }
    }
}
