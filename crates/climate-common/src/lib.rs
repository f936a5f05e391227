//! Common types shared across the paleo-forcing analysis crates.

pub mod error;
pub mod field;
pub mod grid;
pub mod time;

pub use error::{ClimateError, ClimateResult};
pub use field::{Field2D, ForcingSeries, GriddedField, TimeAttributes};
pub use grid::{first_axis_difference, AXIS_TOLERANCE};
pub use time::{normalize_years, validate_alignment, TimeAxisError, TimeEncoding, YearAxis};
