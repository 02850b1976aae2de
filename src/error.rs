use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Source unreadable: {path}: {message}")]
    SourceUnreadable { path: String, message: String },

    #[error("Output unwritable: {path}: {message}")]
    OutputUnwritable { path: String, message: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Coarse classification reported to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    SourceUnreadable,
    MissingVariable,
    InvalidLocation,
    ComputationError,
    OutputUnwritable,
    Configuration,
}

impl ProcessingError {
    pub fn missing_variable(name: impl Into<String>) -> Self {
        ProcessingError::MissingVariable { name: name.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::Io(_)
            | ProcessingError::Parquet(_)
            | ProcessingError::Arrow(_)
            | ProcessingError::SourceUnreadable { .. }
            | ProcessingError::InvalidFormat(_) => ErrorKind::SourceUnreadable,
            ProcessingError::OutputUnwritable { .. } | ProcessingError::Csv(_) => {
                ErrorKind::OutputUnwritable
            }
            ProcessingError::MissingVariable { .. } => ErrorKind::MissingVariable,
            ProcessingError::InvalidLocation(_) | ProcessingError::Validation(_) => {
                ErrorKind::InvalidLocation
            }
            ProcessingError::ShapeMismatch { .. }
            | ProcessingError::Computation(_)
            | ProcessingError::TaskJoin(_) => ErrorKind::ComputationError,
            ProcessingError::Config(_)
            | ProcessingError::ConfigFile(_)
            | ProcessingError::Json(_) => ErrorKind::Configuration,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::SourceUnreadable => "SourceUnreadable",
            ErrorKind::MissingVariable => "MissingVariable",
            ErrorKind::InvalidLocation => "InvalidLocation",
            ErrorKind::ComputationError => "ComputationError",
            ErrorKind::OutputUnwritable => "OutputUnwritable",
            ErrorKind::Configuration => "Configuration",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        let io = ProcessingError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), ErrorKind::SourceUnreadable);

        assert_eq!(
            ProcessingError::missing_variable("d2m").kind(),
            ErrorKind::MissingVariable
        );
        assert_eq!(
            ProcessingError::InvalidLocation("no cells".to_string()).kind(),
            ErrorKind::InvalidLocation
        );
        assert_eq!(
            ProcessingError::Computation("inf".to_string()).kind(),
            ErrorKind::ComputationError
        );
        assert_eq!(
            ProcessingError::OutputUnwritable {
                path: "out/grid-risk.parquet".to_string(),
                message: "permission denied".to_string(),
            }
            .kind(),
            ErrorKind::OutputUnwritable
        );
    }

    #[test]
    fn test_missing_variable_message() {
        let err = ProcessingError::missing_variable("temp_suitability");
        assert_eq!(
            err.to_string(),
            "Missing required variable: temp_suitability"
        );
    }
}
