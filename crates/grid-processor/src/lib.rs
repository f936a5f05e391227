//! Grid processing for gridded climate-model output.
//!
//! This crate holds the numerical core that runs on in-memory fields:
//!
//! - **Reductions**: NaN-skipping temporal mean and standard deviation,
//!   computed per cell in parallel
//! - **Anomalies**: standardized anomalies relative to forcing-active
//!   time steps, and full-period temporal anomalies
//! - **Ensembles**: cell-wise means across simulation runs
//! - **Layout**: latitude-band cropping, longitude re-centering, north-up
//!   orientation and zonal means for display
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{AnomalyEngine, GridProcessorConfig};
//!
//! let engine = AnomalyEngine::new(GridProcessorConfig::default());
//! let result = engine.process(&r1_field, &aod.values)?;
//! println!("{} active steps", result.statistics.active_steps);
//! ```

pub mod anomaly;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod layout;
pub mod mask;
pub mod stats;

// Re-export commonly used types at crate root
pub use anomaly::{
    active_mask, compute_statistics, standardized_anomaly, temporal_anomaly, AnomalyEngine,
    AnomalyResult, AnomalyStatistics,
};
pub use config::{GridProcessorConfig, MissingPolicy, ZeroVariancePolicy};
pub use ensemble::ensemble_mean;
pub use error::{GridProcessorError, Result};
pub use layout::{north_up, recenter_longitudes, restore_longitudes, zonal_mean};
pub use mask::{crop_latitude_band, mask_outside_band, LatitudeBand};
pub use stats::{nan_mean, nan_std, temporal_mean, temporal_std};
