//! NetCDF writing in the same layout the reader expects.

use std::path::Path;

use climate_common::{GriddedField, TimeAttributes};
use tracing::debug;

use crate::error::NetCdfResult;

/// Fill value written in place of NaN.
const FILL_VALUE: f64 = -9.0e33;

/// Write a field as `name(time, lat, lon)` with coordinate variables.
///
/// The time coordinate carries the field's `units` and `calendar` so
/// external tools can decode it as dates.
pub fn write_gridded_field<P: AsRef<Path>>(path: P, field: &GriddedField) -> NetCdfResult<()> {
    let path = path.as_ref();
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", field.ntime())?;
    file.add_dimension("lat", field.nlat())?;
    file.add_dimension("lon", field.nlon())?;

    write_time(&mut file, &field.time, &field.time_attrs)?;
    write_coordinate(&mut file, "lat", &field.lat, &[("units", "degrees_north")], "Y")?;
    write_coordinate(&mut file, "lon", &field.lon, &[("units", "degrees_east")], "X")?;

    let values: Vec<f64> = field.data.iter().map(|&v| encode_missing(v)).collect();
    let mut var = file.add_variable::<f64>(&field.name, &["time", "lat", "lon"])?;
    var.set_fill_value(FILL_VALUE)?;
    if let Some(units) = &field.units {
        var.put_attribute("units", units.as_str())?;
    }
    var.put_values(&values, ..)?;

    debug!(path = %path.display(), variable = %field.name, "Wrote gridded field");
    Ok(())
}

/// Write a scalar series as `name(time)`.
pub fn write_series<P: AsRef<Path>>(
    path: P,
    name: &str,
    time: &[f64],
    values: &[f64],
) -> NetCdfResult<()> {
    write_series_with_time(path, name, time, &TimeAttributes::default(), values)
}

/// [`write_series`] with `units` and `calendar` on the time coordinate.
pub fn write_series_with_time<P: AsRef<Path>>(
    path: P,
    name: &str,
    time: &[f64],
    time_attrs: &TimeAttributes,
    values: &[f64],
) -> NetCdfResult<()> {
    let path = path.as_ref();
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", time.len())?;
    write_time(&mut file, time, time_attrs)?;

    let encoded: Vec<f64> = values.iter().map(|&v| encode_missing(v)).collect();
    let mut var = file.add_variable::<f64>(name, &["time"])?;
    var.set_fill_value(FILL_VALUE)?;
    var.put_values(&encoded, ..)?;

    debug!(path = %path.display(), variable = name, len = values.len(), "Wrote series");
    Ok(())
}

fn write_time(
    file: &mut netcdf::FileMut,
    time: &[f64],
    attrs: &TimeAttributes,
) -> NetCdfResult<()> {
    let attributes: Vec<(&str, &str)> = [("units", &attrs.units), ("calendar", &attrs.calendar)]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect();
    write_coordinate(file, "time", time, &attributes, "T")
}

fn write_coordinate(
    file: &mut netcdf::FileMut,
    name: &str,
    values: &[f64],
    attributes: &[(&str, &str)],
    axis: &str,
) -> NetCdfResult<()> {
    let mut var = file.add_variable::<f64>(name, &[name])?;
    for (key, value) in attributes {
        var.put_attribute(key, *value)?;
    }
    var.put_attribute("axis", axis)?;
    var.put_values(values, ..)?;
    Ok(())
}

fn encode_missing(v: f64) -> f64 {
    if v.is_nan() {
        FILL_VALUE
    } else {
        v
    }
}
