//! Color handling: RGBA colors, interpolation and the diverging palette
//! shared by every map panel.

use serde::{Deserialize, Serialize};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rrggbb` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Neutral grey used for missing cells.
pub const MISSING_GREY: Color = Color::rgb(160, 160, 160);

/// Linear color interpolation, `t` clamped to `[0, 1]`.
pub fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// 11-stop red/blue diverging ramp, blue for negative values.
pub const RDBU_STOPS: [&str; 11] = [
    "#053061", "#2166ac", "#4393c3", "#92c5de", "#d1e5f0", "#f7f7f7", "#fddbc7", "#f4a582",
    "#d6604d", "#b2182b", "#67001f",
];

/// Maps values in a fixed `[min, max]` range onto evenly spaced color
/// stops. Values outside the range saturate; NaN maps to `missing`.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergingPalette {
    stops: Vec<Color>,
    pub min: f64,
    pub max: f64,
    pub missing: Color,
}

impl DivergingPalette {
    pub fn new(stops: Vec<Color>, min: f64, max: f64) -> Self {
        Self {
            stops,
            min,
            max,
            missing: MISSING_GREY,
        }
    }

    /// Red/blue palette over `[-range, range]`.
    pub fn symmetric(range: f64) -> Self {
        let stops = RDBU_STOPS.iter().filter_map(|h| Color::from_hex(h)).collect();
        Self::new(stops, -range.abs(), range.abs())
    }

    pub fn stops(&self) -> &[Color] {
        &self.stops
    }

    /// Position of `value` in `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Color of `value`. Infinities saturate like any out-of-range value.
    pub fn color(&self, value: f64) -> Color {
        if value.is_nan() || self.stops.is_empty() {
            return self.missing;
        }
        if self.stops.len() == 1 {
            return self.stops[0];
        }
        let scaled = self.normalize(value) * (self.stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(self.stops.len() - 2);
        interpolate_color(self.stops[lower], self.stops[lower + 1], scaled - lower as f64)
    }
}

/// Render grid values as RGBA pixels, one pixel per value, row-major.
pub fn render_grid<F>(data: &[f64], width: usize, height: usize, color_fn: F) -> Vec<u8>
where
    F: Fn(f64) -> Color,
{
    let mut pixels = vec![0u8; width * height * 4];
    for (value, pixel) in data.iter().zip(pixels.chunks_exact_mut(4)) {
        let color = color_fn(*value);
        pixel.copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }
    pixels
}
