//! Error types for the EOF pipeline.

use thiserror::Error;

/// Errors from preparing, decomposing or loading EOF artifacts.
#[derive(Error, Debug)]
pub enum EofError {
    /// The external tool binary could not be started.
    #[error("dependency '{binary}' could not be started: {source}")]
    DependencyMissing {
        binary: String,
        source: std::io::Error,
    },

    /// The external tool ran and exited unsuccessfully.
    #[error("dependency command `{command}` failed (exit status {status:?}): {stderr}")]
    DependencyFailure {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A file the pipeline expects after decomposition is absent.
    #[error("missing EOF artifact: {0}")]
    MissingArtifact(String),

    /// The prepared field cannot be decomposed.
    #[error("decomposition error: {0}")]
    Decomposition(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache manifest could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    NetCdf(#[from] netcdf_parser::NetCdfError),

    #[error(transparent)]
    Grid(#[from] grid_processor::GridProcessorError),

    #[error(transparent)]
    Field(#[from] climate_common::ClimateError),
}

impl EofError {
    /// Create a MissingArtifact error.
    pub fn missing_artifact(msg: impl Into<String>) -> Self {
        Self::MissingArtifact(msg.into())
    }

    /// Create a Decomposition error.
    pub fn decomposition(msg: impl Into<String>) -> Self {
        Self::Decomposition(msg.into())
    }
}

/// Result type for EOF pipeline operations.
pub type EofResult<T> = std::result::Result<T, EofError>;
