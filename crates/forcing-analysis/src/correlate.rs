//! Correlation of EOF coefficient series against a forcing series.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};
use crate::filter::LowPassFilter;
use crate::series::longest_joint_run;

/// Fewest overlapping points a correlation is computed from.
pub const MIN_OVERLAP: usize = 3;

/// Pearson correlation over the longest contiguous stretch where both
/// series are finite. `None` when that stretch is shorter than
/// [`MIN_OVERLAP`] or either side has zero variance.
pub fn pearson_overlap(a: &[f64], b: &[f64]) -> Option<f64> {
    let run = longest_joint_run(a, b)?;
    if run.len() < MIN_OVERLAP {
        return None;
    }
    let (a, b) = (&a[run.clone()], &b[run]);

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some((cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation of `a[t]` with `b[t + lag]` for every lag in
/// `-max_lag..=max_lag`. A positive lag means `b` follows `a`.
pub fn cross_correlation(a: &[f64], b: &[f64], max_lag: usize) -> Vec<(i64, Option<f64>)> {
    let n = a.len().min(b.len());
    let max_lag = max_lag.min(n.saturating_sub(1));
    (-(max_lag as i64)..=max_lag as i64)
        .map(|lag| {
            let shift = lag.unsigned_abs() as usize;
            let r = if lag >= 0 {
                pearson_overlap(&a[..n - shift], &b[shift..n])
            } else {
                pearson_overlap(&a[shift..n], &b[..n - shift])
            };
            (lag, r)
        })
        .collect()
}

/// Correlator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Low-pass cutoff period in time steps.
    pub cutoff_period: f64,

    /// Butterworth order (even).
    pub filter_order: usize,

    /// Largest lag examined by the cross-correlation, in time steps.
    pub max_lag: usize,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            cutoff_period: 26.0,
            filter_order: 4,
            max_lag: 10,
        }
    }
}

impl CorrelatorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        LowPassFilter::new(self.filter_order, self.cutoff_period)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Correlation of one mode with the forcing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeCorrelation {
    /// 1-based mode number.
    pub mode: usize,
    /// Zero-lag correlation, absent when undefined.
    pub r: Option<f64>,
    /// Lag with the largest |r| within the configured window.
    pub peak_lag: Option<i64>,
    pub peak_r: Option<f64>,
}

impl ModeCorrelation {
    fn strength(&self) -> f64 {
        self.r.map_or(f64::NEG_INFINITY, f64::abs)
    }
}

/// Modes ranked by |r| at zero lag, strongest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub cutoff_period: f64,
    pub ranked: Vec<ModeCorrelation>,
}

impl CorrelationReport {
    /// Strongest mode with a defined correlation.
    pub fn best(&self) -> Option<&ModeCorrelation> {
        self.ranked.first().filter(|m| m.r.is_some())
    }
}

/// Filters forcing and coefficient series alike and correlates them.
#[derive(Debug, Clone)]
pub struct ForcingCorrelator {
    config: CorrelatorConfig,
    filter: LowPassFilter,
}

impl ForcingCorrelator {
    pub fn new(config: CorrelatorConfig) -> AnalysisResult<Self> {
        let filter = LowPassFilter::new(config.filter_order, config.cutoff_period)?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Apply the correlator's low-pass filter.
    pub fn filter(&self, values: &[f64]) -> Vec<f64> {
        self.filter.apply(values)
    }

    /// Correlate each `(mode, coefficients)` pair with `forcing` after
    /// filtering both, and rank the modes.
    pub fn rank(&self, forcing: &[f64], modes: &[(usize, &[f64])]) -> AnalysisResult<CorrelationReport> {
        let filtered_forcing = self.filter(forcing);

        let mut ranked = Vec::with_capacity(modes.len());
        for &(mode, coefficients) in modes {
            if coefficients.len() != forcing.len() {
                return Err(AnalysisError::LengthMismatch {
                    what: format!("coefficients of mode {mode}"),
                    expected: forcing.len(),
                    found: coefficients.len(),
                });
            }

            let filtered = self.filter(coefficients);
            let r = pearson_overlap(&filtered_forcing, &filtered);
            let peak = cross_correlation(&filtered_forcing, &filtered, self.config.max_lag)
                .into_iter()
                .filter_map(|(lag, r)| r.map(|r| (lag, r)))
                .max_by(|x, y| {
                    x.1.abs()
                        .partial_cmp(&y.1.abs())
                        .unwrap_or(Ordering::Equal)
                        // prefer the smaller |lag| on ties
                        .then_with(|| y.0.abs().cmp(&x.0.abs()))
                });

            debug!(mode, r = ?r, peak = ?peak, "Correlated mode with forcing");
            ranked.push(ModeCorrelation {
                mode,
                r,
                peak_lag: peak.map(|p| p.0),
                peak_r: peak.map(|p| p.1),
            });
        }

        ranked.sort_by(|a, b| {
            b.strength()
                .partial_cmp(&a.strength())
                .unwrap_or(Ordering::Equal)
        });

        let report = CorrelationReport {
            cutoff_period: self.config.cutoff_period,
            ranked,
        };
        if let Some(best) = report.best() {
            info!(mode = best.mode, r = ?best.r, peak_lag = ?best.peak_lag, "Best-matching mode");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, sine_series};

    #[test]
    fn test_pearson_of_series_with_itself() {
        let s = sine_series(50, 13.0, 2.0);
        assert_approx_eq!(pearson_overlap(&s, &s).unwrap(), 1.0, 1e-12);
        let neg: Vec<f64> = s.iter().map(|v| -v).collect();
        assert_approx_eq!(pearson_overlap(&s, &neg).unwrap(), -1.0, 1e-12);
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert_eq!(pearson_overlap(&[1.0, 2.0], &[1.0, 2.0]), None);
        assert_eq!(pearson_overlap(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        let nan = f64::NAN;
        assert_eq!(pearson_overlap(&[1.0, nan, 2.0, nan], &[1.0, 2.0, 3.0, 4.0]), None);
    }

    #[test]
    fn test_pearson_uses_longest_joint_stretch() {
        let nan = f64::NAN;
        let a = [100.0, nan, 1.0, 2.0, 3.0, 4.0];
        let b = [-100.0, 0.0, 2.0, 4.0, 6.0, 8.0];
        assert_approx_eq!(pearson_overlap(&a, &b).unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn test_cross_correlation_finds_shift() {
        let a = sine_series(120, 30.0, 1.0);
        let b: Vec<f64> = (0..120)
            .map(|t| if t >= 3 { a[t - 3] } else { f64::NAN })
            .collect();
        let xcorr = cross_correlation(&a, &b, 6);
        assert_eq!(xcorr.len(), 13);
        let (lag, r) = xcorr
            .iter()
            .filter_map(|(lag, r)| r.map(|r| (*lag, r)))
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        assert_eq!(lag, 3);
        assert_approx_eq!(r, 1.0, 1e-9);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = CorrelatorConfig::default();
        assert_eq!(config.cutoff_period, 26.0);
        assert_eq!(config.filter_order, 4);
        assert!(config.validate().is_ok());

        let bad = CorrelatorConfig {
            filter_order: 3,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_rank_rejects_length_mismatch() {
        let correlator = ForcingCorrelator::new(CorrelatorConfig::default()).unwrap();
        let forcing = vec![0.0; 10];
        let short = vec![0.0; 9];
        let err = correlator.rank(&forcing, &[(1, short.as_slice())]).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { .. }));
    }
}
