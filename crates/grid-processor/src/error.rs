//! Error types for grid processing.

use thiserror::Error;

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Inputs that must share a grid do not.
    #[error(transparent)]
    Field(#[from] climate_common::ClimateError),

    /// A per-step mask or series does not match the field's time axis.
    #[error("length mismatch for {what}: expected {expected}, got {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// The forcing-active mask selects no time step.
    #[error("mask selects no forcing-active time steps")]
    NoActiveSteps,

    /// A cell has zero temporal variance and the policy forbids it.
    #[error("zero variance at lat index {lat}, lon index {lon}")]
    ZeroVariance { lat: usize, lon: usize },

    /// A latitude band keeps no rows.
    #[error("latitude band [{south}, {north}] contains no grid rows")]
    EmptyBand { south: f64, north: f64 },

    /// An ensemble needs at least one member.
    #[error("ensemble has no members")]
    EmptyEnsemble,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl GridProcessorError {
    /// Create a LengthMismatch error.
    pub fn length_mismatch(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::LengthMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
