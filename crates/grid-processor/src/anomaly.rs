//! Standardized anomalies relative to forcing-active time steps.
//!
//! For each cell the engine computes the mean over all steps, the mean
//! over forcing-active steps and the population standard deviation over
//! all steps, each skipping missing values independently, and derives
//! `(mean_active - mean) / std`.

use climate_common::{Field2D, GriddedField};
use ndarray::{Array2, Axis, Zip};
use tracing::{debug, info, warn};

use crate::config::{GridProcessorConfig, ZeroVariancePolicy};
use crate::error::{GridProcessorError, Result};
use crate::stats::{temporal_mean, temporal_std};

/// Per-run temporal statistics, each indexed `[lat, lon]`.
#[derive(Debug, Clone)]
pub struct AnomalyStatistics {
    pub mean: Array2<f64>,
    pub active_mean: Array2<f64>,
    pub std: Array2<f64>,
    pub active_steps: usize,
}

/// Output of one anomaly pass.
#[derive(Debug, Clone)]
pub struct AnomalyResult {
    pub statistics: AnomalyStatistics,
    pub anomaly: Field2D,
}

/// Time steps where the aerosol optical depth exceeds `threshold`.
/// Missing AOD values are never active.
pub fn active_mask(aod: &[f64], threshold: f64) -> Vec<bool> {
    aod.iter().map(|&v| v > threshold).collect()
}

/// Compute mean, forcing-active mean and standard deviation of a field.
pub fn compute_statistics(field: &GriddedField, active: &[bool]) -> Result<AnomalyStatistics> {
    if active.len() != field.ntime() {
        return Err(GridProcessorError::length_mismatch(
            format!("active mask of '{}'", field.name),
            field.ntime(),
            active.len(),
        ));
    }
    let active_steps = active.iter().filter(|&&a| a).count();
    if active_steps == 0 {
        return Err(GridProcessorError::NoActiveSteps);
    }

    Ok(AnomalyStatistics {
        mean: temporal_mean(&field.data, None),
        active_mean: temporal_mean(&field.data, Some(active)),
        std: temporal_std(&field.data),
        active_steps,
    })
}

/// `(active_mean - mean) / std` per cell.
pub fn standardized_anomaly(
    field: &GriddedField,
    stats: &AnomalyStatistics,
    policy: ZeroVariancePolicy,
) -> Result<Field2D> {
    let numerator = &stats.active_mean - &stats.mean;
    let data = divide_by_std(&numerator, &stats.std, policy)?;
    Ok(Field2D::new(
        format!("{}_std_anomaly", field.name),
        field.lon.clone(),
        field.lat.clone(),
        data,
    )?)
}

/// Anomaly of every step relative to the full-period mean, optionally
/// divided by the temporal standard deviation.
pub fn temporal_anomaly(
    field: &GriddedField,
    standardize: bool,
    policy: ZeroVariancePolicy,
) -> Result<GriddedField> {
    let mean = temporal_mean(&field.data, None);
    let scale = if standardize {
        let std = temporal_std(&field.data);
        check_zero_variance(&std, policy)?;
        Some(std)
    } else {
        None
    };

    let mut data = field.data.clone();
    Zip::indexed(data.lanes_mut(Axis(0))).par_for_each(|(j, i), mut lane| {
        let m = mean[[j, i]];
        let s = scale.as_ref().map(|s| s[[j, i]]);
        lane.mapv_inplace(|v| match s {
            Some(s) if s == 0.0 || s.is_nan() => f64::NAN,
            Some(s) => (v - m) / s,
            None => v - m,
        });
    });

    Ok(field.with_data(format!("{}_anomaly", field.name), data)?)
}

/// Runs the anomaly computation for one simulation.
#[derive(Debug, Clone, Default)]
pub struct AnomalyEngine {
    config: GridProcessorConfig,
}

impl AnomalyEngine {
    pub fn new(config: GridProcessorConfig) -> Self {
        Self { config }
    }

    /// Standardized anomaly of `field` for time steps where `aod` exceeds
    /// the configured threshold.
    pub fn process(&self, field: &GriddedField, aod: &[f64]) -> Result<AnomalyResult> {
        let active = active_mask(aod, self.config.aod_threshold);
        let statistics = compute_statistics(field, &active)?;
        info!(
            run = %field.name,
            active_steps = statistics.active_steps,
            total_steps = field.ntime(),
            threshold = self.config.aod_threshold,
            "Computed anomaly statistics"
        );
        let anomaly = standardized_anomaly(field, &statistics, self.config.zero_variance)?;
        if let Some((lo, hi)) = anomaly.finite_range() {
            debug!(run = %field.name, min = lo, max = hi, "Standardized anomaly range");
        }
        Ok(AnomalyResult {
            statistics,
            anomaly,
        })
    }
}

fn check_zero_variance(std: &Array2<f64>, policy: ZeroVariancePolicy) -> Result<()> {
    let mut zero_cells = 0usize;
    for ((lat, lon), &s) in std.indexed_iter() {
        if s == 0.0 {
            if policy == ZeroVariancePolicy::Fail {
                return Err(GridProcessorError::ZeroVariance { lat, lon });
            }
            zero_cells += 1;
        }
    }
    if zero_cells > 0 {
        warn!(cells = zero_cells, "Zero-variance cells set to NaN");
    }
    Ok(())
}

fn divide_by_std(
    numerator: &Array2<f64>,
    std: &Array2<f64>,
    policy: ZeroVariancePolicy,
) -> Result<Array2<f64>> {
    check_zero_variance(std, policy)?;
    Ok(Zip::from(numerator).and(std).map_collect(|&n, &s| {
        if s == 0.0 {
            f64::NAN
        } else {
            n / s
        }
    }))
}
