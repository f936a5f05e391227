//! NetCDF reading and writing for climate-model output.
//!
//! Reads CF-style files holding one variable each: 3-D temperature fields
//! over `(time, lat, lon)` and scalar forcing series over `time`. Packed
//! values are unpacked (`scale_factor`, `add_offset`) and fill values
//! become `NaN`.
//!
//! The writer emits the same layout so decomposition backends can hand
//! fields to external tools and persist their own artifacts.

mod error;
mod reader;
mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use reader::{
    first_data_variable, read_gridded_field, read_series, read_time_axis, silence_hdf5_errors,
};
pub use writer::{write_gridded_field, write_series, write_series_with_time};

/// Dimension names recognised as longitude.
pub const LON_NAMES: &[&str] = &["lon", "longitude", "x"];
/// Dimension names recognised as latitude.
pub const LAT_NAMES: &[&str] = &["lat", "latitude", "y"];
/// Dimension names recognised as time.
pub const TIME_NAMES: &[&str] = &["time", "t"];
