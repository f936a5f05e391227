//! Error types for forcing analysis.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Series lengths that must agree do not.
    #[error("length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// Not enough contiguous finite values for the operation.
    #[error("{what} needs at least {needed} contiguous values, found {found}")]
    TooShort {
        what: String,
        needed: usize,
        found: usize,
    },

    /// A parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AnalysisError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
