//! Error types for exoquery.

use thiserror::Error;

/// The main error type for exoquery operations.
#[derive(Debug, Error)]
pub enum ExoError {
    /// A query is missing a required clause.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A caller supplied an argument that cannot produce a predicate.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A transform rule could not convert a value.
    #[error("Transform '{rule}' failed: {message}")]
    Transform { rule: String, message: String },

    /// A response payload did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExoError {
    /// Create a validation error for a missing clause.
    pub fn missing(clause: &'static str) -> Self {
        Self::Validation(format!("{} must be specified", clause))
    }

    /// Create a transform error attributed to a rule.
    pub fn transform(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for exoquery operations.
pub type ExoResult<T> = Result<T, ExoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExoError::missing("FROM table");
        assert_eq!(err.to_string(), "Validation error: FROM table must be specified");
    }

    #[test]
    fn test_transform_error_display() {
        let err = ExoError::transform("Ensure ra is numeric", "invalid float literal");
        assert_eq!(
            err.to_string(),
            "Transform 'Ensure ra is numeric' failed: invalid float literal"
        );
    }
}
