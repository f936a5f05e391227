//! Reading EOF artifacts back from a cache entry.

use std::path::Path;

use climate_common::{Field2D, GriddedField};
use ndarray::Axis;
use netcdf_parser::{first_data_variable, read_gridded_field, read_series};
use tracing::debug;

use crate::backend::{EIGENVALUES_FILE, PATTERNS_FILE};
use crate::cache::EofManifest;
use crate::error::{EofError, EofResult};

/// Coefficient series of one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientSeries {
    /// 1-based mode number (`EOF1` is mode 1).
    pub mode: usize,
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

/// Decomposition results of one cache entry.
#[derive(Debug, Clone)]
pub struct EofArtifacts {
    /// All eigenvalues the backend reported, leading first.
    pub eigenvalues: Vec<f64>,
    /// Spatial patterns, one per mode along the first axis.
    pub patterns: GriddedField,
    pub coefficients: Vec<CoefficientSeries>,
}

impl EofArtifacts {
    pub fn load(dir: &Path, manifest: &EofManifest) -> EofResult<Self> {
        let eigval_path = dir.join(EIGENVALUES_FILE);
        let eigval_var = first_data_variable(&eigval_path)?;
        let eigenvalues = read_series(&eigval_path, &eigval_var)?.values;

        let patterns_path = dir.join(PATTERNS_FILE);
        let patterns_var = first_data_variable(&patterns_path)?;
        let patterns = read_gridded_field(&patterns_path, &patterns_var)?;

        let coefficients = manifest
            .coefficient_files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let path = dir.join(file);
                let variable = first_data_variable(&path)?;
                let series = read_series(&path, &variable)?;
                Ok(CoefficientSeries {
                    mode: index + 1,
                    time: series.time,
                    values: series.values,
                })
            })
            .collect::<EofResult<Vec<_>>>()?;

        if patterns.ntime() < coefficients.len() {
            return Err(EofError::missing_artifact(format!(
                "{} holds {} patterns for {} coefficient series",
                PATTERNS_FILE,
                patterns.ntime(),
                coefficients.len()
            )));
        }

        debug!(
            dir = %dir.display(),
            modes = coefficients.len(),
            eigenvalues = eigenvalues.len(),
            "Loaded EOF artifacts"
        );

        Ok(Self {
            eigenvalues,
            patterns,
            coefficients,
        })
    }

    pub fn modes(&self) -> usize {
        self.coefficients.len()
    }

    /// Fraction of total variance explained by each loaded mode.
    pub fn explained_variance(&self) -> Vec<f64> {
        let total: f64 = self.eigenvalues.iter().filter(|v| v.is_finite()).sum();
        self.eigenvalues
            .iter()
            .take(self.modes())
            .map(|&v| if total > 0.0 { v / total } else { f64::NAN })
            .collect()
    }

    /// Coefficient series of a 1-based mode.
    pub fn coefficient(&self, mode: usize) -> Option<&CoefficientSeries> {
        mode.checked_sub(1).and_then(|i| self.coefficients.get(i))
    }

    /// Spatial pattern of a 1-based mode.
    pub fn pattern(&self, mode: usize) -> Option<Field2D> {
        let index = mode.checked_sub(1)?;
        if index >= self.patterns.ntime() {
            return None;
        }
        Some(Field2D {
            name: format!("{}_eof{}", self.patterns.name, mode),
            lon: self.patterns.lon.clone(),
            lat: self.patterns.lat.clone(),
            data: self.patterns.data.index_axis(Axis(0), index).to_owned(),
        })
    }
}
