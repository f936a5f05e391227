//! In-process decomposition with a dense SVD.

use std::cmp::Ordering;
use std::path::Path;

use climate_common::GriddedField;
use nalgebra::DMatrix;
use ndarray::{Array3, Axis};
use netcdf_parser::{write_gridded_field, write_series, write_series_with_time};
use tracing::{debug, info, warn};

use crate::backend::{
    coefficient_file, DecompositionBackend, EIGENVALUES_FILE, INPUT_FILE, PATTERNS_FILE,
};
use crate::error::{EofError, EofResult};

/// SVD of the (time × valid cell) anomaly matrix.
///
/// Cells with any missing time step are left out of the decomposition and
/// come back as NaN in the patterns. With `area_weighted` each column is
/// scaled by `sqrt(cos(lat))` before the SVD, and patterns are reported
/// in that weighted space.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    pub area_weighted: bool,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self {
            area_weighted: true,
        }
    }
}

impl NativeBackend {
    pub fn new(area_weighted: bool) -> Self {
        Self { area_weighted }
    }
}

impl DecompositionBackend for NativeBackend {
    fn name(&self) -> &str {
        if self.area_weighted {
            "native-weighted"
        } else {
            "native"
        }
    }

    fn decompose(&self, anomalies: &GriddedField, modes: usize, out_dir: &Path) -> EofResult<()> {
        let (ntime, nlat, nlon) = anomalies.data.dim();

        let cells: Vec<(usize, usize)> = (0..nlat)
            .flat_map(|j| (0..nlon).map(move |i| (j, i)))
            .filter(|&(j, i)| {
                anomalies
                    .data
                    .slice(ndarray::s![.., j, i])
                    .iter()
                    .all(|v| v.is_finite())
            })
            .collect();

        if ntime < 2 {
            return Err(EofError::decomposition(format!(
                "need at least 2 time steps, found {ntime}"
            )));
        }
        if cells.is_empty() {
            return Err(EofError::decomposition(
                "no grid cell is complete over the time axis",
            ));
        }

        let weights: Vec<f64> = cells
            .iter()
            .map(|&(j, _)| {
                if self.area_weighted {
                    anomalies.lat[j].to_radians().cos().max(0.0).sqrt()
                } else {
                    1.0
                }
            })
            .collect();

        info!(
            ntime,
            cells = cells.len(),
            skipped = nlat * nlon - cells.len(),
            modes,
            "Computing EOFs with native SVD"
        );

        let matrix = DMatrix::from_fn(ntime, cells.len(), |t, c| {
            let (j, i) = cells[c];
            anomalies.data[[t, j, i]] * weights[c]
        });

        let svd = matrix.svd(true, true);
        let u = svd
            .u
            .ok_or_else(|| EofError::decomposition("SVD did not produce left vectors"))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| EofError::decomposition("SVD did not produce right vectors"))?;
        let singular = svd.singular_values;

        let mut order: Vec<usize> = (0..singular.len()).collect();
        order.sort_by(|&a, &b| {
            singular[b]
                .partial_cmp(&singular[a])
                .unwrap_or(Ordering::Equal)
        });

        let kept = modes.min(order.len());
        if kept < modes {
            warn!(
                requested = modes,
                available = kept,
                "Fewer modes available than requested"
            );
        }

        // Eigenvalues of the covariance matrix, all of them so that
        // explained-variance fractions are relative to the total.
        let eigenvalues: Vec<f64> = order
            .iter()
            .map(|&k| singular[k] * singular[k] / ntime as f64)
            .collect();
        let eig_axis: Vec<f64> = (0..eigenvalues.len()).map(|k| k as f64).collect();
        write_series(
            out_dir.join(EIGENVALUES_FILE),
            &anomalies.name,
            &eig_axis,
            &eigenvalues,
        )?;

        let mut patterns = Array3::from_elem((kept, nlat, nlon), f64::NAN);
        for (m, &k) in order.iter().take(kept).enumerate() {
            let row = v_t.row(k);
            let sign = dominant_sign(row.iter().copied());

            let mut pattern = patterns.index_axis_mut(Axis(0), m);
            for (c, &(j, i)) in cells.iter().enumerate() {
                pattern[[j, i]] = sign * row[c];
            }

            let coefficients: Vec<f64> = (0..ntime)
                .map(|t| sign * u[(t, k)] * singular[k])
                .collect();
            write_series_with_time(
                out_dir.join(coefficient_file(m)),
                &anomalies.name,
                &anomalies.time,
                &anomalies.time_attrs,
                &coefficients,
            )?;

            debug!(mode = m, eigenvalue = eigenvalues[m], "Wrote mode");
        }

        let pattern_field = GriddedField::new(
            anomalies.name.clone(),
            None,
            anomalies.lon.clone(),
            anomalies.lat.clone(),
            (0..kept).map(|m| m as f64).collect(),
            patterns,
        )?;
        write_gridded_field(out_dir.join(PATTERNS_FILE), &pattern_field)?;
        write_gridded_field(out_dir.join(INPUT_FILE), anomalies)?;

        Ok(())
    }
}

/// `1.0` if the component with the largest magnitude is non-negative,
/// `-1.0` otherwise. Fixes the arbitrary SVD sign.
fn dominant_sign(values: impl Iterator<Item = f64>) -> f64 {
    let peak = values.fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
    if peak < 0.0 {
        -1.0
    } else {
        1.0
    }
}
