//! Error types for student_analytics

use thiserror::Error;

/// Main error type for the analytics crate.
///
/// The two analysis entry points never return these; they are raised at the
/// record boundary (loading, HTTP bodies) and inside the learner
/// capabilities, where the engine turns them into sentinel values.
#[derive(Error, Debug)]
pub enum Error {
    /// A record failed boundary validation
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Not enough (or not varied enough) data to fit a model
    #[error("degenerate computation: {0}")]
    ComputationDegenerate(String),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        Error::ComputationDegenerate(reason.into())
    }
}

/// Result type alias for student_analytics
pub type Result<T> = std::result::Result<T, Error>;
