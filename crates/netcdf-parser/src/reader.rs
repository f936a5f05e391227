//! Native NetCDF reading using the netcdf library.

use std::path::Path;
use std::sync::Once;

use climate_common::{ForcingSeries, GriddedField, TimeAttributes};
use ndarray::{ArrayD, Axis, Ix3, IxDyn};
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::{LAT_NAMES, LON_NAMES, TIME_NAMES};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when
/// errors are handled gracefully on the Rust side (e.g. when probing for
/// optional attributes such as `scale_factor`). Call this early in `main()`
/// before any NetCDF operation; repeated calls are cheap.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read a 3-D `(time, lat, lon)` field.
///
/// Dimensions may appear in any order; extra singleton dimensions (for
/// example a one-level height axis) are dropped.
pub fn read_gridded_field<P: AsRef<Path>>(path: P, variable: &str) -> NetCdfResult<GriddedField> {
    silence_hdf5_errors();
    let path = path.as_ref();
    let file = netcdf::open(path)?;

    let var = file.variable(variable).ok_or_else(|| {
        NetCdfError::MissingData(format!("variable '{}' in {}", variable, path.display()))
    })?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();

    let t = find_dim(&dims, TIME_NAMES)
        .ok_or_else(|| NetCdfError::MissingData(format!("time dimension of '{}'", variable)))?;
    let la = find_dim(&dims, LAT_NAMES)
        .ok_or_else(|| NetCdfError::MissingData(format!("lat dimension of '{}'", variable)))?;
    let lo = find_dim(&dims, LON_NAMES)
        .ok_or_else(|| NetCdfError::MissingData(format!("lon dimension of '{}'", variable)))?;
    let keep = [t, la, lo];

    for (i, (name, len)) in dims.iter().enumerate() {
        if !keep.contains(&i) && *len != 1 {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable '{}' has non-singleton extra dimension '{}' ({})",
                variable, name, len
            )));
        }
    }

    let values = read_unpacked(&var)?;
    let shape: Vec<usize> = dims.iter().map(|(_, len)| *len).collect();
    let mut array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| NetCdfError::InvalidFormat(format!("'{}': {}", variable, e)))?;

    // Drop singleton extras from the back so earlier indices stay valid.
    for i in (0..dims.len()).rev() {
        if !keep.contains(&i) {
            array = array.index_axis_move(Axis(i), 0);
        }
    }
    let position = |orig: usize| keep.iter().filter(|&&k| k < orig).count();
    let data = array
        .permuted_axes(vec![position(t), position(la), position(lo)])
        .into_dimensionality::<Ix3>()
        .map_err(|e| NetCdfError::InvalidFormat(format!("'{}': {}", variable, e)))?
        .as_standard_layout()
        .to_owned();

    let time = read_coordinate(&file, &dims[t].0, dims[t].1, true)?;
    let lat = read_coordinate(&file, &dims[la].0, dims[la].1, false)?;
    let lon = read_coordinate(&file, &dims[lo].0, dims[lo].1, false)?;

    debug!(
        path = %path.display(),
        variable = variable,
        ntime = time.len(),
        nlat = lat.len(),
        nlon = lon.len(),
        "Read gridded field"
    );

    let time_attrs = read_time_attrs(&file, &dims[t].0);
    Ok(GriddedField::new(
        variable,
        get_string_attr(&var, "units"),
        lon,
        lat,
        time,
        data,
    )?
    .with_time_attrs(time_attrs))
}

/// Read a scalar series over time. Any non-time dimension must be
/// singleton.
pub fn read_series<P: AsRef<Path>>(path: P, variable: &str) -> NetCdfResult<ForcingSeries> {
    silence_hdf5_errors();
    let path = path.as_ref();
    let file = netcdf::open(path)?;

    let var = file.variable(variable).ok_or_else(|| {
        NetCdfError::MissingData(format!("variable '{}' in {}", variable, path.display()))
    })?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();
    let t = find_dim(&dims, TIME_NAMES)
        .ok_or_else(|| NetCdfError::MissingData(format!("time dimension of '{}'", variable)))?;
    if let Some((name, len)) = dims
        .iter()
        .enumerate()
        .find(|(i, (_, len))| *i != t && *len != 1)
        .map(|(_, d)| d)
    {
        return Err(NetCdfError::InvalidFormat(format!(
            "series '{}' has non-singleton dimension '{}' ({})",
            variable, name, len
        )));
    }

    let values = read_unpacked(&var)?;
    let time = read_coordinate(&file, &dims[t].0, dims[t].1, true)?;

    Ok(ForcingSeries::new(
        variable,
        get_string_attr(&var, "units"),
        time,
        values,
    )?)
}

/// Read only the time coordinate of a file.
pub fn read_time_axis<P: AsRef<Path>>(path: P) -> NetCdfResult<Vec<f64>> {
    silence_hdf5_errors();
    let file = netcdf::open(path.as_ref())?;
    let dim = file
        .dimensions()
        .find(|d| TIME_NAMES.contains(&d.name().as_str()))
        .map(|d| (d.name(), d.len()))
        .ok_or_else(|| NetCdfError::MissingData("time dimension".to_string()))?;
    read_coordinate(&file, &dim.0, dim.1, true)
}

/// Name of the first variable that is neither a coordinate nor a bounds
/// variable. External tools keep the input variable name, so this is how
/// their output files are read without knowing it in advance.
pub fn first_data_variable<P: AsRef<Path>>(path: P) -> NetCdfResult<String> {
    silence_hdf5_errors();
    let path = path.as_ref();
    let file = netcdf::open(path)?;
    let dim_names: Vec<String> = file.dimensions().map(|d| d.name()).collect();

    file.variables()
        .map(|v| (v.name(), v.dimensions().len()))
        .find(|(name, ndims)| {
            *ndims > 0
                && !dim_names.contains(name)
                && !name.ends_with("_bnds")
                && !name.ends_with("_bounds")
        })
        .map(|(name, _)| name)
        .ok_or_else(|| NetCdfError::MissingData(format!("data variable in {}", path.display())))
}

// =============================================================================
// Internal helpers
// =============================================================================

fn find_dim(dims: &[(String, usize)], names: &[&str]) -> Option<usize> {
    dims.iter()
        .position(|(name, _)| names.contains(&name.to_lowercase().as_str()))
}

/// Read a coordinate variable. When it is absent, time falls back to the
/// step index; spatial axes are required.
fn read_coordinate(
    file: &netcdf::File,
    name: &str,
    len: usize,
    allow_index: bool,
) -> NetCdfResult<Vec<f64>> {
    match file.variable(name) {
        Some(var) => Ok(var.get_values::<f64, _>(..)?),
        None if allow_index => {
            warn!(dimension = name, "No coordinate variable, using step index");
            Ok((0..len).map(|i| i as f64).collect())
        }
        None => Err(NetCdfError::MissingData(format!(
            "coordinate variable '{}'",
            name
        ))),
    }
}

/// `units` and `calendar` of the time coordinate, when present.
fn read_time_attrs(file: &netcdf::File, name: &str) -> TimeAttributes {
    match file.variable(name) {
        Some(var) => TimeAttributes {
            units: get_string_attr(&var, "units"),
            calendar: get_string_attr(&var, "calendar"),
        },
        None => TimeAttributes::default(),
    }
}

/// Read all values as f64 with fill values mapped to NaN and packing
/// undone.
fn read_unpacked(var: &netcdf::Variable) -> NetCdfResult<Vec<f64>> {
    let raw: Vec<f64> = var.get_values::<f64, _>(..)?;

    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| get_f64_attr(var, name))
        .collect();
    let scale = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    Ok(raw
        .into_iter()
        .map(|v| {
            if !v.is_finite() || fill_values.iter().any(|&fv| v == fv) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect())
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
