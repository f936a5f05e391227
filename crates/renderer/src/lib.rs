//! Figure rendering for anomaly fields, EOF coefficients and spectra.
//!
//! Two rendering paths:
//! - **Maps**: raw RGBA buffers painted cell by cell with a shared
//!   diverging palette, overlaid with coastlines and dashed latitude
//!   gridlines, and encoded by the built-in PNG writer
//! - **Charts**: zonal-mean profiles, the shared color bar, log-log
//!   spectra and time-series overlays drawn with `plotters`

pub mod canvas;
pub mod charts;
pub mod coastline;
pub mod error;
pub mod gradient;
pub mod map;
pub mod png;

pub use canvas::Canvas;
pub use charts::{
    render_colorbar, render_spectra, render_timeseries, render_zonal_profiles, SpectrumSeries,
    TimeSeries, ZonalProfile,
};
pub use coastline::Coastline;
pub use error::{RenderError, RenderResult};
pub use gradient::{interpolate_color, render_grid, Color, DivergingPalette, MISSING_GREY};
pub use map::{gridline_rows, render_map, save_map, MapStyle};
pub use png::{create_png, create_png_auto};
