//! A plain RGBA pixel buffer with the few drawing primitives maps need.

use std::path::Path;

use crate::error::RenderResult;
use crate::gradient::Color;
use crate::png::create_png_auto;

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    /// A canvas filled with `background`.
    pub fn new(width: usize, height: usize, background: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            pixels.extend_from_slice(&[background.r, background.g, background.b, background.a]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Color::new(p[0], p[1], p[2], p[3]))
    }

    /// Set a pixel; coordinates outside the canvas are ignored.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, color: Color) {
        for y in y0..(y0 + h).min(self.height) {
            for x in x0..(x0 + w).min(self.width) {
                self.set_pixel(x as i64, y as i64, color);
            }
        }
    }

    /// Bresenham line between two pixel positions, inclusive.
    pub fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), color: Color) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.set_pixel(x, y, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Horizontal dashed line across the full width at row `y`.
    pub fn draw_dashed_row(&mut self, y: usize, dash: usize, gap: usize, color: Color) {
        let period = (dash + gap).max(1);
        for x in 0..self.width {
            if x % period < dash {
                self.set_pixel(x as i64, y as i64, color);
            }
        }
    }

    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        create_png_auto(&self.pixels, self.width, self.height)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}
