//! In-memory representations of gridded fields and forcing series.
//!
//! Fields are stored in the CF on-disk order `(time, lat, lon)`. Missing
//! values are `NaN` throughout and every reduction skips them.

use ndarray::{Array2, Array3};

use crate::error::{ClimateError, ClimateResult};
use crate::grid::first_axis_difference;

/// CF attributes of the time coordinate, kept so written files carry a
/// time axis external tools can decode (e.g. `day as %Y%m%d.%f`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeAttributes {
    pub units: Option<String>,
    pub calendar: Option<String>,
}

impl TimeAttributes {
    pub fn new(units: impl Into<String>, calendar: Option<String>) -> Self {
        Self {
            units: Some(units.into()),
            calendar,
        }
    }
}

/// A 3-D field over longitude, latitude and time.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    /// Variable name (e.g. `tas`)
    pub name: String,
    /// Physical units, when the file declares them
    pub units: Option<String>,
    /// Longitudes in degrees
    pub lon: Vec<f64>,
    /// Latitudes in degrees
    pub lat: Vec<f64>,
    /// Raw time coordinate values as stored in the file
    pub time: Vec<f64>,
    pub time_attrs: TimeAttributes,
    /// Values indexed `[time, lat, lon]`
    pub data: Array3<f64>,
}

impl GriddedField {
    /// Build a field, checking that the array shape matches the axes.
    pub fn new(
        name: impl Into<String>,
        units: Option<String>,
        lon: Vec<f64>,
        lat: Vec<f64>,
        time: Vec<f64>,
        data: Array3<f64>,
    ) -> ClimateResult<Self> {
        let name = name.into();
        let expected = vec![time.len(), lat.len(), lon.len()];
        if data.shape() != expected.as_slice() {
            return Err(ClimateError::ShapeMismatch {
                name,
                expected,
                found: data.shape().to_vec(),
            });
        }
        Ok(Self {
            name,
            units,
            lon,
            lat,
            time,
            time_attrs: TimeAttributes::default(),
            data,
        })
    }

    pub fn with_time_attrs(mut self, time_attrs: TimeAttributes) -> Self {
        self.time_attrs = time_attrs;
        self
    }

    pub fn nlon(&self) -> usize {
        self.lon.len()
    }

    pub fn nlat(&self) -> usize {
        self.lat.len()
    }

    pub fn ntime(&self) -> usize {
        self.time.len()
    }

    /// Copy of this field with the values replaced, keeping axes and
    /// metadata.
    pub fn with_data(&self, name: impl Into<String>, data: Array3<f64>) -> ClimateResult<Self> {
        Ok(Self::new(
            name,
            self.units.clone(),
            self.lon.clone(),
            self.lat.clone(),
            self.time.clone(),
            data,
        )?
        .with_time_attrs(self.time_attrs.clone()))
    }

    /// Ensure `other` shares this field's spatial and temporal axes.
    pub fn ensure_same_grid(&self, other: &GriddedField) -> ClimateResult<()> {
        for (axis, a, b) in [
            ("lon", &self.lon, &other.lon),
            ("lat", &self.lat, &other.lat),
            ("time", &self.time, &other.time),
        ] {
            if let Some(i) = first_axis_difference(a, b) {
                return Err(ClimateError::grid_mismatch(
                    &self.name,
                    &other.name,
                    format!(
                        "{} axis differs at index {} (lengths {} and {})",
                        axis,
                        i,
                        a.len(),
                        b.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Fraction of values that are missing.
    pub fn missing_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let missing = self.data.iter().filter(|v| v.is_nan()).count();
        missing as f64 / self.data.len() as f64
    }
}

/// A 2-D field over latitude and longitude, the output of temporal
/// reductions.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    pub name: String,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Values indexed `[lat, lon]`
    pub data: Array2<f64>,
}

impl Field2D {
    pub fn new(
        name: impl Into<String>,
        lon: Vec<f64>,
        lat: Vec<f64>,
        data: Array2<f64>,
    ) -> ClimateResult<Self> {
        let name = name.into();
        let expected = vec![lat.len(), lon.len()];
        if data.shape() != expected.as_slice() {
            return Err(ClimateError::ShapeMismatch {
                name,
                expected,
                found: data.shape().to_vec(),
            });
        }
        Ok(Self {
            name,
            lon,
            lat,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.lon.len()
    }

    pub fn height(&self) -> usize {
        self.lat.len()
    }

    /// Finite minimum and maximum, or `None` when every cell is missing.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// A scalar forcing time series (solar irradiance, aerosol optical depth).
#[derive(Debug, Clone, PartialEq)]
pub struct ForcingSeries {
    pub name: String,
    pub units: Option<String>,
    /// Raw time coordinate values as stored in the file
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl ForcingSeries {
    pub fn new(
        name: impl Into<String>,
        units: Option<String>,
        time: Vec<f64>,
        values: Vec<f64>,
    ) -> ClimateResult<Self> {
        let name = name.into();
        if time.len() != values.len() {
            return Err(ClimateError::ShapeMismatch {
                name,
                expected: vec![time.len()],
                found: vec![values.len()],
            });
        }
        Ok(Self {
            name,
            units,
            time,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, lon: Vec<f64>) -> GriddedField {
        let data = Array3::zeros((2, 1, lon.len()));
        GriddedField::new(name, None, lon, vec![0.0], vec![1.0, 2.0], data).unwrap()
    }

    #[test]
    fn test_shape_is_checked() {
        let data = Array3::zeros((2, 2, 2));
        let err = GriddedField::new("tas", None, vec![0.0], vec![0.0, 1.0], vec![0.0, 1.0], data)
            .unwrap_err();
        assert!(matches!(err, ClimateError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_grid_mismatch_names_axis() {
        let a = field("r1", vec![0.0, 90.0]);
        let b = field("r2", vec![0.0, 180.0]);
        let err = a.ensure_same_grid(&b).unwrap_err();
        assert!(err.to_string().contains("lon axis differs at index 1"));
        assert!(a.ensure_same_grid(&a.clone()).is_ok());
    }

    #[test]
    fn test_with_data_keeps_time_attrs() {
        let attrs = TimeAttributes::new("day as %Y%m%d.%f", Some("proleptic_gregorian".into()));
        let f = field("r1", vec![0.0]).with_time_attrs(attrs.clone());
        let derived = f.with_data("r1_anomaly", Array3::ones((2, 1, 1))).unwrap();
        assert_eq!(derived.time_attrs, attrs);
        assert_eq!(derived.name, "r1_anomaly");
    }

    #[test]
    fn test_finite_range_skips_nan() {
        let data = Array2::from_shape_vec((1, 3), vec![f64::NAN, -2.0, 4.0]).unwrap();
        let f = Field2D::new("x", vec![0.0, 1.0, 2.0], vec![0.0], data).unwrap();
        assert_eq!(f.finite_range(), Some((-2.0, 4.0)));
    }

    #[test]
    fn test_forcing_length_checked() {
        assert!(ForcingSeries::new("tsi", None, vec![1.0, 2.0], vec![1.0]).is_err());
    }
}
