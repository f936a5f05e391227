//! Grid layout transforms for display: longitude re-centering, latitude
//! orientation and zonal means.

use climate_common::Field2D;
use ndarray::Axis;

use crate::stats::nan_mean;

/// Rotate columns so longitudes run over `[-180, 180)` instead of
/// `[0, 360)`. Values at or above 180° are shifted by -360°.
///
/// Axes that already start below 180° with no wrapped part are returned
/// unchanged.
pub fn recenter_longitudes(field: &Field2D) -> Field2D {
    let shift = field
        .lon
        .iter()
        .position(|&l| l >= 180.0)
        .unwrap_or(field.lon.len());
    let order: Vec<usize> = (shift..field.lon.len()).chain(0..shift).collect();
    rotate(field, &order, |l| if l >= 180.0 { l - 360.0 } else { l })
}

/// Inverse of [`recenter_longitudes`]: back to `[0, 360)`.
pub fn restore_longitudes(field: &Field2D) -> Field2D {
    let shift = field
        .lon
        .iter()
        .position(|&l| l >= 0.0)
        .unwrap_or(field.lon.len());
    let order: Vec<usize> = (shift..field.lon.len()).chain(0..shift).collect();
    rotate(field, &order, |l| if l < 0.0 { l + 360.0 } else { l })
}

fn rotate(field: &Field2D, order: &[usize], wrap: impl Fn(f64) -> f64) -> Field2D {
    Field2D {
        name: field.name.clone(),
        lon: order.iter().map(|&i| wrap(field.lon[i])).collect(),
        lat: field.lat.clone(),
        data: field.data.select(Axis(1), order),
    }
}

/// Orient rows north-to-south (top-to-bottom screen order).
pub fn north_up(field: &Field2D) -> Field2D {
    let ascending = field.lat.first() < field.lat.last();
    if !ascending {
        return field.clone();
    }
    let order: Vec<usize> = (0..field.lat.len()).rev().collect();
    Field2D {
        name: field.name.clone(),
        lon: field.lon.clone(),
        lat: order.iter().map(|&j| field.lat[j]).collect(),
        data: field.data.select(Axis(0), &order),
    }
}

/// Longitude-averaged mean per latitude row, skipping missing cells.
pub fn zonal_mean(field: &Field2D) -> Vec<f64> {
    field
        .data
        .axis_iter(Axis(0))
        .map(|row| nan_mean(row.iter().copied()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn field(lon: Vec<f64>, lat: Vec<f64>) -> Field2D {
        let (h, w) = (lat.len(), lon.len());
        Field2D::new(
            "x",
            lon,
            lat,
            Array2::from_shape_fn((h, w), |(j, i)| (j * 10 + i) as f64),
        )
        .unwrap()
    }

    #[test]
    fn test_recenter_rotates_columns() {
        let f = field(vec![0.0, 90.0, 180.0, 270.0], vec![0.0]);
        let r = recenter_longitudes(&f);
        assert_eq!(r.lon, vec![-180.0, -90.0, 0.0, 90.0]);
        assert_eq!(r.data.row(0).to_vec(), vec![2.0, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn test_recenter_is_idempotent_on_centered_axis() {
        let f = field(vec![-180.0, -90.0, 0.0, 90.0], vec![0.0]);
        assert_eq!(recenter_longitudes(&f), f);
    }

    #[test]
    fn test_north_up_reverses_ascending_latitudes() {
        let f = field(vec![0.0], vec![-30.0, 0.0, 30.0]);
        let n = north_up(&f);
        assert_eq!(n.lat, vec![30.0, 0.0, -30.0]);
        assert_eq!(n.data[[0, 0]], 20.0);
        assert_eq!(north_up(&n), n);
    }

    #[test]
    fn test_zonal_mean_skips_nan() {
        let mut f = field(vec![0.0, 120.0, 240.0], vec![-10.0, 10.0]);
        f.data[[1, 2]] = f64::NAN;
        assert_eq!(zonal_mean(&f), vec![1.0, 10.5]);
    }
}
