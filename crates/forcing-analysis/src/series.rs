//! Helpers over 1-D series with NaN gaps.

use std::ops::Range;

/// Longest run of consecutive indices where `keep` holds. Ties go to the
/// earliest run.
pub fn longest_run(len: usize, keep: impl Fn(usize) -> bool) -> Option<Range<usize>> {
    let mut best: Option<Range<usize>> = None;
    let mut start = None;

    for i in 0..=len {
        let inside = i < len && keep(i);
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if best.as_ref().map_or(true, |b| i - s > b.len()) {
                    best = Some(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    best
}

/// Longest contiguous stretch of finite values.
pub fn longest_finite_run(values: &[f64]) -> Option<Range<usize>> {
    longest_run(values.len(), |i| values[i].is_finite())
}

/// Longest contiguous stretch where both series are finite.
pub fn longest_joint_run(a: &[f64], b: &[f64]) -> Option<Range<usize>> {
    longest_run(a.len().min(b.len()), |i| a[i].is_finite() && b[i].is_finite())
}

/// Subtract the mean and divide by the population standard deviation,
/// skipping NaN. Constant or empty series come back as NaN.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return vec![f64::NAN; values.len()];
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let std = (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    values
        .iter()
        .map(|&v| {
            if std > 0.0 && v.is_finite() {
                (v - mean) / std
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_finite_run() {
        let nan = f64::NAN;
        assert_eq!(longest_finite_run(&[nan, 1.0, 2.0, nan, 1.0, 2.0, 3.0]), Some(4..7));
        assert_eq!(longest_finite_run(&[1.0, 2.0, nan, 3.0, 4.0]), Some(0..2));
        assert_eq!(longest_finite_run(&[nan, nan]), None);
        assert_eq!(longest_finite_run(&[]), None);
    }

    #[test]
    fn test_longest_joint_run() {
        let nan = f64::NAN;
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, nan, 3.0, 4.0, 5.0];
        assert_eq!(longest_joint_run(&a, &b), Some(2..5));
    }

    #[test]
    fn test_zscore() {
        let z = zscore(&[1.0, f64::NAN, 3.0]);
        assert_eq!(z[0], -1.0);
        assert!(z[1].is_nan());
        assert_eq!(z[2], 1.0);
        assert!(zscore(&[2.0, 2.0]).iter().all(|v| v.is_nan()));
    }
}
