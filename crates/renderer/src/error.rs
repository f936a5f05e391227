//! Rendering errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("chart drawing failed: {0}")]
    Chart(String),

    #[error("invalid coastline data: {0}")]
    Coastline(String),

    #[error("invalid render style: {0}")]
    Style(String),

    #[error("nothing to render: {0}")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn chart(err: impl std::fmt::Display) -> Self {
        Self::Chart(err.to_string())
    }
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
