//! Tests for reading and writing CF-style NetCDF files.

use climate_common::{GriddedField, TimeAttributes};
use ndarray::Array3;
use netcdf_parser::{
    first_data_variable, read_gridded_field, read_series, read_time_axis, write_gridded_field,
    write_series, write_series_with_time, NetCdfError,
};
use test_utils::assert_approx_eq;

fn sample_field() -> GriddedField {
    let mut data = Array3::from_shape_fn((3, 2, 4), |(t, j, i)| (t * 100 + j * 10 + i) as f64);
    data[[1, 0, 2]] = f64::NAN;
    GriddedField::new(
        "tas",
        Some("K".to_string()),
        vec![0.0, 90.0, 180.0, 270.0],
        vec![-45.0, 45.0],
        vec![8500701.5, 8510701.5, 8520701.5],
        data,
    )
    .unwrap()
}

#[test]
fn test_written_field_reads_back_with_missing_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.nc");
    let field = sample_field();

    write_gridded_field(&path, &field).unwrap();
    let read = read_gridded_field(&path, "tas").unwrap();

    assert_eq!(read.lon, field.lon);
    assert_eq!(read.lat, field.lat);
    assert_eq!(read.time, field.time);
    assert_eq!(read.units.as_deref(), Some("K"));
    assert!(read.data[[1, 0, 2]].is_nan());
    assert_eq!(read.data[[2, 1, 3]], 213.0);
    assert_eq!(first_data_variable(&path).unwrap(), "tas");
    assert_eq!(read_time_axis(&path).unwrap(), field.time);
}

#[test]
fn test_packed_field_with_extra_level_and_swapped_axes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packed.nc");

    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("time", 2).unwrap();
        file.add_dimension("lev", 1).unwrap();
        file.add_dimension("lon", 3).unwrap();
        file.add_dimension("lat", 2).unwrap();
        for (name, values) in [
            ("time", vec![850.0, 851.0]),
            ("lon", vec![0.0, 120.0, 240.0]),
            ("lat", vec![-10.0, 10.0]),
        ] {
            let mut var = file.add_variable::<f64>(name, &[name]).unwrap();
            var.put_values(&values, ..).unwrap();
        }
        let mut var = file
            .add_variable::<i16>("tas", &["time", "lev", "lon", "lat"])
            .unwrap();
        var.set_fill_value(-1i16).unwrap();
        var.put_attribute("scale_factor", 0.5f64).unwrap();
        var.put_attribute("add_offset", 200.0f64).unwrap();
        let raw: Vec<i16> = (0..12).map(|i| if i == 5 { -1 } else { i as i16 }).collect();
        var.put_values(&raw, ..).unwrap();
    }

    let field = read_gridded_field(&path, "tas").unwrap();
    assert_eq!(field.data.shape(), &[2, 2, 3]);
    assert_eq!(field.lat, vec![-10.0, 10.0]);
    // raw index = t * 6 + lon * 2 + lat; index 5 holds the fill value
    assert!(field.data[[0, 1, 2]].is_nan());
    assert_approx_eq!(field.data[[0, 0, 2]], 4.0 * 0.5 + 200.0, 1e-12);
    assert_approx_eq!(field.data[[1, 0, 1]], 8.0 * 0.5 + 200.0, 1e-12);
    assert_eq!(field.data.iter().filter(|v| v.is_nan()).count(), 1);
}

#[test]
fn test_series_round_trip_and_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tsi.nc");
    write_series(&path, "tsi", &[850.5, 851.5, 852.5], &[1360.5, f64::NAN, 1361.0]).unwrap();

    let series = read_series(&path, "tsi").unwrap();
    assert_eq!(series.time, vec![850.5, 851.5, 852.5]);
    assert_eq!(series.values[0], 1360.5);
    assert!(series.values[1].is_nan());

    let err = read_series(&path, "aod").unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
}

fn time_attribute(path: &std::path::Path, name: &str) -> Option<String> {
    let file = netcdf::open(path).unwrap();
    let var = file.variable("time").unwrap();
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[test]
fn test_time_units_and_calendar_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.nc");
    let attrs = TimeAttributes::new("day as %Y%m%d.%f", Some("proleptic_gregorian".to_string()));
    let field = sample_field().with_time_attrs(attrs.clone());

    write_gridded_field(&path, &field).unwrap();

    assert_eq!(time_attribute(&path, "units").as_deref(), Some("day as %Y%m%d.%f"));
    assert_eq!(
        time_attribute(&path, "calendar").as_deref(),
        Some("proleptic_gregorian")
    );
    let read = read_gridded_field(&path, "tas").unwrap();
    assert_eq!(read.time_attrs, attrs);
}

#[test]
fn test_field_without_time_units_writes_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.nc");
    write_gridded_field(&path, &sample_field()).unwrap();

    assert_eq!(time_attribute(&path, "units"), None);
    assert_eq!(read_gridded_field(&path, "tas").unwrap().time_attrs, TimeAttributes::default());
}

#[test]
fn test_series_time_units_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pc.nc");
    let attrs = TimeAttributes::new("day as %Y%m%d.%f", None);
    write_series_with_time(&path, "tas", &[8500701.5, 8510701.5], &attrs, &[0.5, -0.5]).unwrap();

    assert_eq!(time_attribute(&path, "units").as_deref(), Some("day as %Y%m%d.%f"));
    assert_eq!(time_attribute(&path, "calendar"), None);
    assert_eq!(read_series(&path, "tas").unwrap().values, vec![0.5, -0.5]);
}
