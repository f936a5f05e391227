//! Zero-phase Butterworth low-pass filter.
//!
//! The filter is a cascade of second-order sections designed with the
//! bilinear transform, run forward and then backward over the signal so
//! the phase shift cancels. Both ends are padded with an odd reflection of
//! the signal and every section starts from the steady state of the first
//! sample, which keeps constants exactly constant.

use std::f64::consts::PI;

use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::series::longest_finite_run;

/// One second-order section in transposed direct form II.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn lowpass(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
        }
    }

    /// Filter `signal` in place, starting at rest on `signal[0]`.
    fn run(&self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };
        let mut z1 = (1.0 - self.b0) * first;
        let mut z2 = (self.b2 - self.a2) * first;
        for x in signal.iter_mut() {
            let input = *x;
            let output = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * output + z2;
            z2 = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// Butterworth low-pass of even order, cutoff given as a period in steps.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    order: usize,
    cutoff_period: f64,
    sections: Vec<Biquad>,
}

impl LowPassFilter {
    pub fn new(order: usize, cutoff_period: f64) -> AnalysisResult<Self> {
        if order == 0 || order % 2 != 0 {
            return Err(AnalysisError::invalid_parameter(format!(
                "filter order must be a positive even number, got {order}"
            )));
        }
        if !cutoff_period.is_finite() || cutoff_period <= 2.0 {
            return Err(AnalysisError::invalid_parameter(format!(
                "cutoff period must exceed the Nyquist period of 2 steps, got {cutoff_period}"
            )));
        }

        // Pre-warped analog cutoff for a normalized frequency of 1/period
        let k = (PI / cutoff_period).tan();
        let sections = (0..order / 2)
            .map(|s| {
                let theta = (2 * s + 1) as f64 * PI / (2 * order) as f64;
                Biquad::lowpass(k, 1.0 / (2.0 * theta.sin()))
            })
            .collect();

        Ok(Self {
            order,
            cutoff_period,
            sections,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff_period(&self) -> f64 {
        self.cutoff_period
    }

    /// Number of samples reflected onto each end.
    fn pad_len(&self, n: usize) -> usize {
        (3 * (self.order + 1)).min(n.saturating_sub(1))
    }

    /// Filter the longest contiguous finite stretch of `values`; every
    /// other position is NaN in the result. Stretches shorter than two
    /// samples produce an all-NaN result.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NAN; values.len()];
        let Some(run) = longest_finite_run(values) else {
            return out;
        };
        if run.len() < 2 {
            debug!(len = run.len(), "Finite stretch too short to filter");
            return out;
        }
        if run.len() < values.len() {
            debug!(
                start = run.start,
                end = run.end,
                len = values.len(),
                "Filtering longest finite stretch"
            );
        }

        let filtered = self.filtfilt(&values[run.clone()]);
        out[run].copy_from_slice(&filtered);
        out
    }

    fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        let pad = self.pad_len(n);
        let (first, last) = (x[0], x[n - 1]);

        let mut signal = Vec::with_capacity(n + 2 * pad);
        signal.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
        signal.extend_from_slice(x);
        signal.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));

        self.cascade(&mut signal);
        signal.reverse();
        self.cascade(&mut signal);
        signal.reverse();

        signal[pad..pad + n].to_vec()
    }

    fn cascade(&self, signal: &mut [f64]) {
        for section in &self.sections {
            section.run(signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, sine_series};

    fn amplitude(values: &[f64]) -> f64 {
        values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    #[test]
    fn test_rejects_odd_order_and_fast_cutoff() {
        assert!(LowPassFilter::new(3, 26.0).is_err());
        assert!(LowPassFilter::new(0, 26.0).is_err());
        assert!(LowPassFilter::new(4, 2.0).is_err());
        assert!(LowPassFilter::new(4, 26.0).is_ok());
    }

    #[test]
    fn test_sections_have_unit_dc_gain() {
        let filter = LowPassFilter::new(6, 26.0).unwrap();
        assert_eq!(filter.sections.len(), 3);
        for s in &filter.sections {
            let gain = (s.b0 + s.b1 + s.b2) / (1.0 + s.a1 + s.a2);
            assert_approx_eq!(gain, 1.0, 1e-12);
        }
    }

    #[test]
    fn test_second_order_section_is_butterworth_q() {
        let filter = LowPassFilter::new(2, 26.0).unwrap();
        let k = (PI / 26.0).tan();
        let expected = Biquad::lowpass(k, std::f64::consts::FRAC_1_SQRT_2);
        let actual = filter.sections[0];
        assert_approx_eq!(actual.b0, expected.b0, 1e-14);
        assert_approx_eq!(actual.a1, expected.a1, 1e-14);
        assert_approx_eq!(actual.a2, expected.a2, 1e-14);
    }

    #[test]
    fn test_constant_is_preserved() {
        let filter = LowPassFilter::new(4, 26.0).unwrap();
        for v in filter.apply(&[5.0; 120]) {
            assert_approx_eq!(v, 5.0, 1e-9);
        }
    }

    #[test]
    fn test_four_step_oscillation_is_removed() {
        let filter = LowPassFilter::new(4, 26.0).unwrap();
        let fast = sine_series(200, 4.0, 1.0);
        let filtered = filter.apply(&fast);
        assert!(amplitude(&filtered[60..140]) < 1e-3);
    }

    #[test]
    fn test_slow_signal_passes() {
        let filter = LowPassFilter::new(4, 26.0).unwrap();
        let slow = sine_series(400, 200.0, 1.0);
        let filtered = filter.apply(&slow);
        for t in 100..300 {
            assert_approx_eq!(filtered[t], slow[t], 0.05);
        }
    }

    #[test]
    fn test_only_longest_finite_stretch_is_filtered() {
        let filter = LowPassFilter::new(4, 26.0).unwrap();
        let mut values = vec![1.0; 40];
        values[5] = f64::NAN;
        let filtered = filter.apply(&values);
        assert!(filtered[..6].iter().all(|v| v.is_nan()));
        for v in &filtered[6..] {
            assert_approx_eq!(*v, 1.0, 1e-9);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let filter = LowPassFilter::new(4, 26.0).unwrap();
        assert!(filter.apply(&[]).is_empty());
        assert!(filter.apply(&[1.0])[0].is_nan());
        assert!(filter.apply(&[f64::NAN, f64::NAN]).iter().all(|v| v.is_nan()));
        let two = filter.apply(&[1.0, 1.0]);
        assert_approx_eq!(two[0], 1.0, 1e-12);
    }
}
