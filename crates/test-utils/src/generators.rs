//! Synthetic data generators for fields, axes and forcing series.
//!
//! These produce predictable, analytically checkable inputs so tests can
//! compare engine output against closed-form expectations.

use climate_common::{GriddedField, TimeAttributes};
use ndarray::Array3;
use std::f64::consts::PI;

/// Regular longitudes on `[0, 360)`.
///
/// ```
/// let lon = test_utils::regular_lon(4);
/// assert_eq!(lon, vec![0.0, 90.0, 180.0, 270.0]);
/// ```
pub fn regular_lon(n: usize) -> Vec<f64> {
    let step = 360.0 / n as f64;
    (0..n).map(|i| i as f64 * step).collect()
}

/// Cell-centred latitudes from south to north.
///
/// ```
/// let lat = test_utils::regular_lat(4);
/// assert_eq!(lat, vec![-67.5, -22.5, 22.5, 67.5]);
/// ```
pub fn regular_lat(n: usize) -> Vec<f64> {
    let step = 180.0 / n as f64;
    (0..n).map(|j| -90.0 + step * (j as f64 + 0.5)).collect()
}

/// CF units of [`model_time_axis`] values.
pub const MODEL_TIME_UNITS: &str = "day as %Y%m%d.%f";

/// Yearly time stamps in the `YYYY0701.5` convention used by model output.
pub fn model_time_axis(first_year: i32, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| (first_year as f64 + i as f64) * 10_000.0 + 701.5)
        .collect()
}

/// Build a field whose value at `(t, lat, lon)` is `f(t, j, i)`.
pub fn field_from_fn<F>(name: &str, nlon: usize, nlat: usize, ntime: usize, f: F) -> GriddedField
where
    F: Fn(usize, usize, usize) -> f64,
{
    let data = Array3::from_shape_fn((ntime, nlat, nlon), |(t, j, i)| f(t, j, i));
    GriddedField::new(
        name,
        Some("K".to_string()),
        regular_lon(nlon),
        regular_lat(nlat),
        model_time_axis(850, ntime),
        data,
    )
    .expect("generator axes match data shape")
    .with_time_attrs(TimeAttributes::new(
        MODEL_TIME_UNITS,
        Some("proleptic_gregorian".to_string()),
    ))
}

/// Temperature-like cube: a latitude gradient plus an offset applied during
/// the `active` time steps.
pub fn offset_cube(
    name: &str,
    nlon: usize,
    nlat: usize,
    active: &[bool],
    offset: f64,
) -> GriddedField {
    field_from_fn(name, nlon, nlat, active.len(), |t, j, i| {
        let base = 280.0 + j as f64 * 5.0 + i as f64;
        if active[t] {
            base + offset
        } else {
            base
        }
    })
}

/// Boolean mask with `true` for `start..end`.
pub fn active_window(n: usize, start: usize, end: usize) -> Vec<bool> {
    (0..n).map(|t| t >= start && t < end).collect()
}

/// Sine wave with the given period (in steps) and amplitude.
pub fn sine_series(n: usize, period: f64, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|t| amplitude * (2.0 * PI * t as f64 / period).sin())
        .collect()
}

/// Deterministic pseudo-random noise in `[-amplitude, amplitude]`
/// (linear congruential generator, reproducible across platforms).
pub fn lcg_noise(n: usize, seed: u64, amplitude: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            (unit * 2.0 - 1.0) * amplitude
        })
        .collect()
}
