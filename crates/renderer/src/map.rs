//! Geographic map panels for 2-D anomaly fields.
//!
//! A field is re-centered on the prime meridian, flipped north-up and
//! painted cell by cell with the shared diverging palette. Coastlines and
//! dashed latitude gridlines are drawn on top.

use std::path::Path;

use climate_common::Field2D;
use grid_processor::{north_up, recenter_longitudes};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canvas::Canvas;
use crate::coastline::Coastline;
use crate::error::{RenderError, RenderResult};
use crate::gradient::{render_grid, Color, DivergingPalette};

/// Appearance shared by every map panel of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapStyle {
    /// Palette covers `[-range, range]`
    pub range: f64,
    /// Pixels per grid cell along each axis
    pub cell_px: usize,
    /// Latitudes of the dashed reference lines
    pub gridlines: Vec<f64>,
    pub gridline_color: Color,
    pub coastline_color: Color,
    pub dash: usize,
    pub gap: usize,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            range: 5.0,
            cell_px: 8,
            gridlines: vec![-90.0, -60.0, -30.0, 0.0, 30.0, 60.0, 90.0],
            gridline_color: Color::rgb(64, 64, 64),
            coastline_color: Color::rgb(0, 0, 0),
            dash: 4,
            gap: 3,
        }
    }
}

impl MapStyle {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(format!("map range must be positive, got {}", self.range));
        }
        if self.cell_px == 0 {
            return Err("cell_px must be at least 1".to_string());
        }
        if self.dash == 0 {
            return Err("dash length must be at least 1".to_string());
        }
        if let Some(bad) = self.gridlines.iter().find(|l| !(-90.0..=90.0).contains(*l)) {
            return Err(format!("gridline latitude {bad} outside [-90, 90]"));
        }
        Ok(())
    }

    pub fn palette(&self) -> DivergingPalette {
        DivergingPalette::symmetric(self.range)
    }
}

/// Outer cell edges of an axis, assuming regular spacing.
fn axis_extent(axis: &[f64]) -> (f64, f64) {
    let first = axis[0];
    let last = axis[axis.len() - 1];
    let half = if axis.len() > 1 {
        (last - first) / (axis.len() - 1) as f64 / 2.0
    } else {
        0.5
    };
    (first - half, last + half)
}

/// Linear map from `value` in `[start, end]` to a pixel in `[0, size)`.
fn to_pixel(value: f64, start: f64, end: f64, size: usize) -> i64 {
    let px = ((value - start) / (end - start) * size as f64).floor() as i64;
    px.clamp(0, size as i64 - 1)
}

/// Pixel row of every configured gridline that falls inside the latitude
/// extent of a north-up field, top to bottom.
pub fn gridline_rows(lat: &[f64], style: &MapStyle) -> Vec<usize> {
    if lat.is_empty() {
        return Vec::new();
    }
    let height = lat.len() * style.cell_px;
    let (north, south) = axis_extent(lat);
    let (lo, hi) = (south.min(north), south.max(north));
    let mut rows: Vec<usize> = style
        .gridlines
        .iter()
        .filter(|l| (lo..=hi).contains(*l))
        .map(|&l| to_pixel(l, north, south, height) as usize)
        .collect();
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Render `field` as a map panel.
pub fn render_map(
    field: &Field2D,
    style: &MapStyle,
    coastline: Option<&Coastline>,
) -> RenderResult<Canvas> {
    if field.width() == 0 || field.height() == 0 {
        return Err(RenderError::Empty(format!("field '{}' has no cells", field.name)));
    }
    style.validate().map_err(RenderError::Style)?;

    let display = north_up(&recenter_longitudes(field));
    let (w, h) = (display.width(), display.height());
    let palette = style.palette();

    let values: Vec<f64> = display.data.iter().copied().collect();
    let cells = render_grid(&values, w, h, |v| palette.color(v));

    let mut canvas = Canvas::new(w * style.cell_px, h * style.cell_px, palette.missing);
    for (idx, px) in cells.chunks_exact(4).enumerate() {
        let color = Color::new(px[0], px[1], px[2], px[3]);
        let (j, i) = (idx / w, idx % w);
        canvas.fill_rect(i * style.cell_px, j * style.cell_px, style.cell_px, style.cell_px, color);
    }

    let (west, east) = axis_extent(&display.lon);
    let (north, south) = axis_extent(&display.lat);

    if let Some(coastline) = coastline {
        let wrap = |lon: f64| if lon >= 180.0 { lon - 360.0 } else { lon };
        let (width, height) = (canvas.width(), canvas.height());
        let project = |(lon, lat): (f64, f64)| {
            (
                to_pixel(lon, west, east, width),
                to_pixel(lat, north, south, height),
            )
        };
        let mut segments = 0usize;
        for line in coastline.split_at_dateline(wrap) {
            for pair in line.windows(2) {
                canvas.draw_line(project(pair[0]), project(pair[1]), style.coastline_color);
                segments += 1;
            }
        }
        debug!(segments, "Drew coastline");
    }

    for row in gridline_rows(&display.lat, style) {
        canvas.draw_dashed_row(row, style.dash, style.gap, style.gridline_color);
    }

    debug!(
        field = %field.name,
        width = canvas.width(),
        height = canvas.height(),
        "Rendered map"
    );
    Ok(canvas)
}

/// Render and write a map panel as PNG.
pub fn save_map(
    path: impl AsRef<Path>,
    field: &Field2D,
    style: &MapStyle,
    coastline: Option<&Coastline>,
) -> RenderResult<()> {
    render_map(field, style, coastline)?.save_png(path)
}
