//! Error types for Routy

use thiserror::Error;

/// Main error type for Routy
#[derive(Error, Debug)]
pub enum RoutyError {
    /// A referenced location, edge or route does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Both locations exist but no path connects them
    #[error("No path from {from} to {to}")]
    NoPath { from: String, to: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Retraining with an environment of a different shape than the one
    /// the value model was sized for
    #[error(
        "Dimension mismatch: model expects {expected_inputs} inputs / {expected_outputs} actions, \
         environment provides {actual_inputs} / {actual_outputs}"
    )]
    DimensionMismatch {
        expected_inputs: usize,
        expected_outputs: usize,
        actual_inputs: usize,
        actual_outputs: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoutyError {
    /// Short machine-readable tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            RoutyError::NotFound(_) => "not_found",
            RoutyError::NoPath { .. } => "no_path",
            RoutyError::InvalidInput(_) => "invalid_input",
            RoutyError::DimensionMismatch { .. } => "dimension_mismatch",
            RoutyError::Config(_) => "config_error",
            RoutyError::Serialization(_) => "serialization_error",
            RoutyError::Io(_) => "io_error",
            RoutyError::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias for Routy operations
pub type Result<T> = std::result::Result<T, RoutyError>;
