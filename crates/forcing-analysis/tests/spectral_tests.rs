//! Multitaper spectra of synthetic coefficient series.

use forcing_analysis::{MultitaperEstimator, SpectralConfig};
use test_utils::{assert_approx_eq, lcg_noise, sine_series};

fn planted(n: usize, period: f64) -> Vec<f64> {
    let signal = sine_series(n, period, 1.0);
    let noise = lcg_noise(n, 3, 0.3);
    // a trend the estimator must remove first
    (0..n)
        .map(|t| signal[t] + noise[t] + 0.01 * t as f64)
        .collect()
}

#[test]
fn test_peak_at_planted_period() {
    let estimator = MultitaperEstimator::new(SpectralConfig::default()).unwrap();
    let estimate = estimator.estimate(&planted(256, 16.0)).unwrap();

    let (period, _) = estimate.peak().unwrap();
    assert!(
        (13.5..=19.0).contains(&period),
        "peak at period {period}, expected near 16"
    );
}

#[test]
fn test_bounds_bracket_estimate() {
    let estimator = MultitaperEstimator::new(SpectralConfig::default()).unwrap();
    let estimate = estimator.estimate(&planted(256, 16.0)).unwrap();

    assert_eq!(estimate.dof, 10.0);
    for i in 0..estimate.len() {
        assert!(estimate.lower[i] < estimate.power[i]);
        assert!(estimate.power[i] < estimate.upper[i]);
    }
}

#[test]
fn test_trim_tail_is_honoured() {
    let n = 256;
    let trimmed = MultitaperEstimator::new(SpectralConfig::default())
        .unwrap()
        .estimate(&planted(n, 16.0))
        .unwrap();
    assert_eq!(trimmed.len(), n / 2 - 10);

    let full = MultitaperEstimator::new(SpectralConfig {
        trim_tail: 0,
        ..Default::default()
    })
    .unwrap()
    .estimate(&planted(n, 16.0))
    .unwrap();
    assert_eq!(full.len(), n / 2);
    assert_approx_eq!(*full.frequency.last().unwrap(), 0.5, 1e-12);
    assert_approx_eq!(full.frequency[0], 1.0 / n as f64, 1e-12);
    assert_eq!(&full.power[..trimmed.len()], trimmed.power.as_slice());
}

#[test]
fn test_sampling_interval_scales_periods() {
    let estimator = MultitaperEstimator::new(SpectralConfig {
        sampling_interval: 2.0,
        ..Default::default()
    })
    .unwrap();
    let estimate = estimator.estimate(&planted(256, 16.0)).unwrap();
    let (period, _) = estimate.peak().unwrap();
    assert!((27.0..=38.0).contains(&period), "peak at period {period}");
    assert!(estimate.period().windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_white_noise_power_matches_variance() {
    let n = 1024;
    let noise = lcg_noise(n, 17, 1.0);
    let estimator = MultitaperEstimator::new(SpectralConfig {
        trim_tail: 0,
        ..Default::default()
    })
    .unwrap();
    let estimate = estimator.estimate(&noise).unwrap();

    let df = 1.0 / n as f64;
    let integrated: f64 = estimate.power.iter().map(|p| p * df).sum();
    let variance = 1.0 / 3.0;
    assert!(
        (integrated - variance).abs() < 0.2 * variance,
        "integrated power {integrated} vs variance {variance}"
    );
}

#[test]
fn test_smoothing_widens_dof_and_narrows_bounds() {
    let series = planted(256, 16.0);
    let raw = MultitaperEstimator::new(SpectralConfig::default())
        .unwrap()
        .estimate(&series)
        .unwrap();
    let smooth = MultitaperEstimator::new(SpectralConfig {
        smoothing: 3,
        ..Default::default()
    })
    .unwrap()
    .estimate(&series)
    .unwrap();

    assert_eq!(smooth.dof, 30.0);
    let ratio = |e: &forcing_analysis::SpectralEstimate| e.upper[0] / e.lower[0];
    assert!(ratio(&smooth) < ratio(&raw));
}

#[test]
fn test_gaps_use_longest_finite_stretch() {
    let mut series = planted(300, 16.0);
    for v in &mut series[..40] {
        *v = f64::NAN;
    }
    series[45] = f64::NAN;
    let estimate = MultitaperEstimator::new(SpectralConfig::default())
        .unwrap()
        .estimate(&series)
        .unwrap();
    // 254 contiguous samples after index 45
    assert_eq!(estimate.len(), 254 / 2 - 10);
}
