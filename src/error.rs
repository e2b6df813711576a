//! Error types for demandcast

use thiserror::Error;

/// Result type alias for demandcast operations
pub type Result<T> = std::result::Result<T, DemandcastError>;

/// Main error type for demandcast
#[derive(Error, Debug)]
pub enum DemandcastError {
    /// A required column is missing, or a column set does not have the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// A decoded row has no unique positive maximum among its indicator columns
    #[error("Ambiguous level for prefix '{prefix}' at row {row}")]
    AmbiguousLevel { prefix: String, row: usize },

    /// Two distinct labels produce the same indicator column name
    #[error("Sanitization collision in '{column}': '{first}' and '{second}' map to the same name")]
    SanitizationCollision {
        column: String,
        first: String,
        second: String,
    },

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Missing values: {0}")]
    MissingValues(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<polars::error::PolarsError> for DemandcastError {
    fn from(err: polars::error::PolarsError) -> Self {
        DemandcastError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for DemandcastError {
    fn from(err: serde_json::Error) -> Self {
        DemandcastError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DemandcastError::Schema("no columns match prefix 'cat_'".to_string());
        assert_eq!(err.to_string(), "Schema error: no columns match prefix 'cat_'");

        let err = DemandcastError::AmbiguousLevel {
            prefix: "cat_".to_string(),
            row: 3,
        };
        assert_eq!(err.to_string(), "Ambiguous level for prefix 'cat_' at row 3");
    }

    #[test]
    fn test_collision_display_names_both_labels() {
        let err = DemandcastError::SanitizationCollision {
            column: "city".to_string(),
            first: "a b".to_string(),
            second: "a-b".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'a b'"));
        assert!(msg.contains("'a-b'"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DemandcastError = io_err.into();
        assert!(matches!(err, DemandcastError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DemandcastError = json_err.into();
        assert!(matches!(err, DemandcastError::Serialization(_)));
    }
}
