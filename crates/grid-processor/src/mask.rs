//! Latitude-band selection.

use climate_common::{Field2D, GriddedField};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// A closed latitude interval in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatitudeBand {
    pub south: f64,
    pub north: f64,
}

impl LatitudeBand {
    /// Band `[-bound, bound]`, e.g. the tropics for `bound = 30`.
    pub fn symmetric(bound: f64) -> Self {
        Self {
            south: -bound.abs(),
            north: bound.abs(),
        }
    }

    pub fn contains(&self, lat: f64) -> bool {
        lat >= self.south && lat <= self.north
    }

    /// Row indices of `lat` inside the band, in axis order.
    pub fn rows(&self, lat: &[f64]) -> Vec<usize> {
        lat.iter()
            .enumerate()
            .filter(|(_, l)| self.contains(**l))
            .map(|(j, _)| j)
            .collect()
    }
}

/// Keep only the latitude rows inside `band`.
pub fn crop_latitude_band(field: &GriddedField, band: LatitudeBand) -> Result<GriddedField> {
    let rows = band.rows(&field.lat);
    if rows.is_empty() {
        return Err(GridProcessorError::EmptyBand {
            south: band.south,
            north: band.north,
        });
    }
    let data = field.data.select(Axis(1), &rows);
    let lat = rows.iter().map(|&j| field.lat[j]).collect();

    Ok(GriddedField::new(
        field.name.clone(),
        field.units.clone(),
        field.lon.clone(),
        lat,
        field.time.clone(),
        data,
    )?
    .with_time_attrs(field.time_attrs.clone()))
}

/// Set every cell outside `band` to NaN, keeping the grid.
pub fn mask_outside_band(field: &Field2D, band: LatitudeBand) -> Field2D {
    let mut masked = field.clone();
    for (j, mut row) in masked.data.axis_iter_mut(Axis(0)).enumerate() {
        if !band.contains(field.lat[j]) {
            row.fill(f64::NAN);
        }
    }
    masked
}
