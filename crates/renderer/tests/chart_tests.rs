//! Tests for the plotters-based companion charts.

use renderer::{
    render_colorbar, render_spectra, render_timeseries, render_zonal_profiles, DivergingPalette,
    RenderError, SpectrumSeries, TimeSeries, ZonalProfile,
};
use test_utils::{regular_lat, sine_series};

const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

fn assert_png(path: &std::path::Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.len() > 8, "{} is empty", path.display());
    assert_eq!(&bytes[..8], &PNG_MAGIC);
}

// ============================================================================
// Color bar and zonal panel
// ============================================================================

#[test]
fn test_colorbar_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("colorbar.png");
    render_colorbar(&path, &DivergingPalette::symmetric(5.0), "Standardized anomaly").unwrap();
    assert_png(&path);
}

#[test]
fn test_zonal_panel_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zonal.png");
    let lat = regular_lat(12);
    let r1: Vec<f64> = lat.iter().map(|l| (l / 30.0).sin()).collect();
    let mut r2: Vec<f64> = lat.iter().map(|l| (l / 45.0).cos() - 0.5).collect();
    r2[3] = f64::NAN;

    render_zonal_profiles(
        &path,
        &[
            ZonalProfile { label: "R1", lat: &lat, values: &r1 },
            ZonalProfile { label: "R2", lat: &lat, values: &r2 },
        ],
        5.0,
    )
    .unwrap();
    assert_png(&path);
}

#[test]
fn test_zonal_panel_without_profiles_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = render_zonal_profiles(dir.path().join("none.png"), &[], 5.0).unwrap_err();
    assert!(matches!(err, RenderError::Empty(_)));
}

// ============================================================================
// Spectra and time series
// ============================================================================

#[test]
fn test_spectra_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spectra.png");
    let frequency: Vec<f64> = (1..=40).map(|k| k as f64 / 100.0).collect();
    let power: Vec<f64> = frequency.iter().map(|f| 1.0 / f).collect();
    let lower: Vec<f64> = power.iter().map(|p| p * 0.5).collect();
    let upper: Vec<f64> = power.iter().map(|p| p * 2.0).collect();

    render_spectra(
        &path,
        &[SpectrumSeries {
            label: "PC1",
            frequency: &frequency,
            power: &power,
            lower: &lower,
            upper: &upper,
        }],
    )
    .unwrap();
    assert_png(&path);
}

#[test]
fn test_spectra_without_positive_power_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let zeros = vec![0.0; 4];
    let frequency = vec![0.1, 0.2, 0.3, 0.4];
    let series = SpectrumSeries {
        label: "PC1",
        frequency: &frequency,
        power: &zeros,
        lower: &zeros,
        upper: &zeros,
    };
    assert!(render_spectra(dir.path().join("s.png"), &[series]).is_err());
}

#[test]
fn test_timeseries_file_is_created_with_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solar_vs_pc.png");
    let time: Vec<f64> = (850..1050).map(f64::from).collect();
    let solar = sine_series(time.len(), 11.0, 1.0);
    let mut pc = sine_series(time.len(), 11.0, 0.8);
    pc[..12].fill(f64::NAN);

    render_timeseries(
        &path,
        "Solar forcing vs PC2",
        &time,
        &[
            TimeSeries { label: "solar", values: &solar },
            TimeSeries { label: "PC2", values: &pc },
        ],
    )
    .unwrap();
    assert_png(&path);
}
