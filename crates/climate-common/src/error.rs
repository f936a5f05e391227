//! Error types for the shared data model.

use thiserror::Error;

use crate::time::TimeAxisError;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// Errors raised while constructing or combining fields.
#[derive(Debug, Error)]
pub enum ClimateError {
    /// Array shape does not match the coordinate axes.
    #[error("shape mismatch for '{name}': expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Two fields that must share a grid do not.
    #[error("grid mismatch between '{left}' and '{right}': {detail}")]
    GridMismatch {
        left: String,
        right: String,
        detail: String,
    },

    /// A time axis failed normalization or alignment.
    #[error(transparent)]
    TimeAxis(#[from] TimeAxisError),
}

impl ClimateError {
    /// Create a GridMismatch error.
    pub fn grid_mismatch(
        left: impl Into<String>,
        right: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::GridMismatch {
            left: left.into(),
            right: right.into(),
            detail: detail.into(),
        }
    }
}
