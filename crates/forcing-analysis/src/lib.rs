//! Time-series analysis of EOF coefficients against external forcing.
//!
//! - [`LowPassFilter`]: zero-phase Butterworth low-pass
//! - [`ForcingCorrelator`]: filtered Pearson and lagged correlation, with
//!   modes ranked by strength
//! - [`MultitaperEstimator`]: sine-taper spectra with chi-squared bounds
//!
//! Series are plain `&[f64]` with NaN marking missing values.

pub mod correlate;
pub mod detrend;
pub mod error;
pub mod filter;
pub mod series;
pub mod spectral;

pub use correlate::{
    cross_correlation, pearson_overlap, CorrelationReport, CorrelatorConfig, ForcingCorrelator,
    ModeCorrelation, MIN_OVERLAP,
};
pub use detrend::linear_detrend;
pub use error::{AnalysisError, AnalysisResult};
pub use filter::LowPassFilter;
pub use series::{longest_finite_run, longest_joint_run, zscore};
pub use spectral::{MultitaperEstimator, SpectralConfig, SpectralEstimate};
