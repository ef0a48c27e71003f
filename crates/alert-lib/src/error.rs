//! Error types shared by the alerting pipeline

use thiserror::Error;

/// Errors surfaced by the alerting pipeline.
///
/// Insufficient history and an undefined relative change are not errors;
/// they are ordinary outcomes carried by
/// [`DetectionOutcome`](crate::anomaly::DetectionOutcome) and
/// [`RelativeChange`](crate::anomaly::RelativeChange).
#[derive(Error, Debug)]
pub enum AlertError {
    /// Extracts cannot be joined, or a configured metric is missing
    #[error("input shape error: {0}")]
    InputShape(String),

    /// Invalid pipeline configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// An extract source failed to produce its table
    #[error("source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// The notifier could not deliver a payload
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl AlertError {
    pub fn input_shape(message: impl Into<String>) -> Self {
        AlertError::InputShape(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        AlertError::Config(message.into())
    }

    pub fn source(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AlertError::Source {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias for alerting operations
pub type Result<T> = std::result::Result<T, AlertError>;
