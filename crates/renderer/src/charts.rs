//! Line charts drawn with `plotters`: zonal-mean profiles, the shared
//! color bar, multitaper spectra and forcing/coefficient time series.
//!
//! Every chart is first drawn with captions and axis labels. When text
//! rendering fails (no usable system font) the chart is redrawn without
//! any text so the figure is still produced.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};
use crate::gradient::DivergingPalette;

type DrawResult = Result<(), Box<dyn Error>>;

const SERIES_COLORS: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

pub fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

/// Zonal-mean profile of one run.
#[derive(Debug, Clone, Copy)]
pub struct ZonalProfile<'a> {
    pub label: &'a str,
    pub lat: &'a [f64],
    pub values: &'a [f64],
}

/// One spectrum with its confidence bounds, all over `frequency`.
#[derive(Debug, Clone, Copy)]
pub struct SpectrumSeries<'a> {
    pub label: &'a str,
    pub frequency: &'a [f64],
    pub power: &'a [f64],
    pub lower: &'a [f64],
    pub upper: &'a [f64],
}

/// A labelled series over a shared time axis.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeries<'a> {
    pub label: &'a str,
    pub values: &'a [f64],
}

fn draw_chart<F>(path: &Path, size: (u32, u32), kind: &str, draw: F) -> RenderResult<()>
where
    F: Fn(&DrawingArea<BitMapBackend<'_>, Shift>, bool) -> DrawResult,
{
    let attempt = |labels: bool| -> DrawResult {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root, labels)?;
        root.present()?;
        Ok(())
    };

    match attempt(true) {
        Ok(()) => {}
        Err(err) => {
            warn!(chart = kind, error = %err, "Chart text failed, redrawing without labels");
            attempt(false).map_err(RenderError::chart)?;
        }
    }
    debug!(chart = kind, path = %path.display(), "Wrote chart");
    Ok(())
}

/// Finite `(min, max)` of the values, widened when degenerate.
fn finite_bounds(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if hi - lo < f64::EPSILON {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        return Some((lo - pad, hi + pad));
    }
    Some((lo, hi))
}

/// Split a polyline at non-finite points.
fn finite_segments(points: impl IntoIterator<Item = (f64, f64)>) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (x, y) in points {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Overlay the zonal-mean profile of each run, latitude on the y axis.
pub fn render_zonal_profiles(
    path: impl AsRef<Path>,
    profiles: &[ZonalProfile<'_>],
    range: f64,
) -> RenderResult<()> {
    let (lat_lo, lat_hi) = finite_bounds(profiles.iter().flat_map(|p| p.lat.iter().copied()))
        .ok_or_else(|| RenderError::Empty("no zonal profiles".into()))?;

    draw_chart(path.as_ref(), (480, 640), "zonal", |root, labels| {
        let mut builder = ChartBuilder::on(root);
        builder.margin(20).x_label_area_size(40).y_label_area_size(50);
        if labels {
            builder.caption("Zonal mean anomaly", ("sans-serif", 24).into_font());
        }
        let mut chart = builder.build_cartesian_2d(-range..range, lat_lo..lat_hi)?;

        let mut mesh = chart.configure_mesh();
        if labels {
            mesh.x_desc("Standardized anomaly").y_desc("Latitude");
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw()?;

        for (index, profile) in profiles.iter().enumerate() {
            let color = series_color(index);
            let points = profile
                .values
                .iter()
                .zip(profile.lat)
                .map(|(&v, &lat)| (v.clamp(-range, range), lat));
            chart
                .draw_series(
                    finite_segments(points)
                        .into_iter()
                        .map(|seg| PathElement::new(seg, color.stroke_width(2))),
                )?
                .label(profile.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if labels {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
        }
        Ok(())
    })
}

/// Horizontal color bar for the shared map palette.
pub fn render_colorbar(
    path: impl AsRef<Path>,
    palette: &DivergingPalette,
    label: &str,
) -> RenderResult<()> {
    const STEPS: usize = 200;
    let (min, max) = (palette.min, palette.max);
    if !(max > min) {
        return Err(RenderError::Empty(format!("color bar range [{min}, {max}]")));
    }
    let step = (max - min) / STEPS as f64;

    draw_chart(path.as_ref(), (640, 110), "colorbar", |root, labels| {
        let mut builder = ChartBuilder::on(root);
        builder.margin(10).x_label_area_size(40).y_label_area_size(0);
        let mut chart = builder.build_cartesian_2d(min..max, 0.0..1.0)?;

        chart.draw_series((0..STEPS).map(|k| {
            let x0 = min + k as f64 * step;
            let c = palette.color(x0 + step / 2.0);
            Rectangle::new([(x0, 0.0), (x0 + step, 1.0)], RGBColor(c.r, c.g, c.b).filled())
        }))?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh().y_labels(0);
        if labels {
            mesh.x_labels(11).x_desc(label);
        } else {
            mesh.x_labels(0);
        }
        mesh.draw()?;
        Ok(())
    })
}

/// Log-log spectra against period with shaded confidence bands.
pub fn render_spectra(path: impl AsRef<Path>, series: &[SpectrumSeries<'_>]) -> RenderResult<()> {
    let periods = |s: &SpectrumSeries<'_>| -> Vec<f64> {
        s.frequency.iter().map(|&f| 1.0 / f).collect()
    };
    let positive = |v: &f64| v.is_finite() && *v > 0.0;

    let (p_lo, p_hi) = finite_bounds(series.iter().flat_map(|s| periods(s)).filter(positive))
        .ok_or_else(|| RenderError::Empty("no spectral estimates".into()))?;
    let (y_lo, y_hi) = finite_bounds(
        series
            .iter()
            .flat_map(|s| s.lower.iter().chain(s.upper).chain(s.power).copied())
            .filter(positive),
    )
    .ok_or_else(|| RenderError::Empty("no positive spectral power".into()))?;

    draw_chart(path.as_ref(), (900, 600), "spectra", |root, labels| {
        let mut builder = ChartBuilder::on(root);
        builder.margin(20).x_label_area_size(45).y_label_area_size(70);
        if labels {
            builder.caption("Multitaper spectra of EOF coefficients", ("sans-serif", 26).into_font());
        }
        let mut chart = builder
            .build_cartesian_2d((p_lo..p_hi).log_scale(), (y_lo..y_hi).log_scale())?;

        let mut mesh = chart.configure_mesh();
        if labels {
            mesh.x_desc("Period (years)").y_desc("Power");
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw()?;

        for (index, s) in series.iter().enumerate() {
            let color = series_color(index);
            let period = periods(s);
            let keep = |i: &usize| positive(&period[*i]) && positive(&s.lower[*i]) && positive(&s.upper[*i]);
            let idx: Vec<usize> = (0..period.len().min(s.lower.len()).min(s.upper.len()))
                .filter(keep)
                .collect();

            let mut band: Vec<(f64, f64)> = idx.iter().map(|&i| (period[i], s.upper[i])).collect();
            band.extend(idx.iter().rev().map(|&i| (period[i], s.lower[i])));
            if band.len() >= 3 {
                chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))?;
            }

            let line = period
                .iter()
                .zip(s.power)
                .map(|(&p, &v)| if positive(&p) && positive(&v) { (p, v) } else { (f64::NAN, f64::NAN) });
            chart
                .draw_series(
                    finite_segments(line)
                        .into_iter()
                        .map(|seg| PathElement::new(seg, color.stroke_width(2))),
                )?
                .label(s.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if labels {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
        }
        Ok(())
    })
}

/// Overlay several series over a shared time axis. Missing values leave
/// gaps in the lines.
pub fn render_timeseries(
    path: impl AsRef<Path>,
    title: &str,
    time: &[f64],
    series: &[TimeSeries<'_>],
) -> RenderResult<()> {
    let (t_lo, t_hi) = finite_bounds(time.iter().copied())
        .ok_or_else(|| RenderError::Empty("empty time axis".into()))?;
    let (y_lo, y_hi) = finite_bounds(series.iter().flat_map(|s| s.values.iter().copied()))
        .ok_or_else(|| RenderError::Empty(format!("no finite values for '{title}'")))?;

    draw_chart(path.as_ref(), (1000, 400), "timeseries", |root, labels| {
        let mut builder = ChartBuilder::on(root);
        builder.margin(20).x_label_area_size(40).y_label_area_size(50);
        if labels {
            builder.caption(title, ("sans-serif", 24).into_font());
        }
        let mut chart = builder.build_cartesian_2d(t_lo..t_hi, y_lo..y_hi)?;

        let mut mesh = chart.configure_mesh();
        if labels {
            mesh.x_desc("Year").y_desc("z-score");
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw()?;

        for (index, s) in series.iter().enumerate() {
            let color = series_color(index);
            let points = time.iter().copied().zip(s.values.iter().copied());
            chart
                .draw_series(
                    finite_segments(points)
                        .into_iter()
                        .map(|seg| PathElement::new(seg, color.stroke_width(1))),
                )?
                .label(s.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if labels {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_bounds() {
        assert_eq!(finite_bounds([3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(finite_bounds([0.0, 0.0]), Some((-1.0, 1.0)));
        assert_eq!(finite_bounds([f64::NAN]), None);
    }

    #[test]
    fn test_finite_segments_split_at_gaps() {
        let pts = vec![(0.0, 1.0), (1.0, f64::NAN), (2.0, 2.0), (3.0, 3.0)];
        let segs = finite_segments(pts);
        assert_eq!(segs, vec![vec![(0.0, 1.0)], vec![(2.0, 2.0), (3.0, 3.0)]]);
    }

    #[test]
    fn test_series_colors_cycle() {
        assert_eq!(series_color(0), series_color(SERIES_COLORS.len()));
    }
}
