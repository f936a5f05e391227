//! Linear detrending.

/// Remove the ordinary-least-squares line fitted against the sample index.
///
/// NaN values are excluded from the fit and stay NaN. With fewer than two
/// finite values only the mean is removed.
pub fn linear_detrend(values: &[f64]) -> Vec<f64> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| (i as f64, *v))
        .collect();

    if points.is_empty() {
        return values.to_vec();
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| v - (intercept + slope * i as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_exact_line_becomes_zero() {
        let line: Vec<f64> = (0..50).map(|i| 3.0 - 0.25 * i as f64).collect();
        for v in linear_detrend(&line) {
            assert_approx_eq!(v, 0.0, 1e-10);
        }
    }

    #[test]
    fn test_nan_is_preserved_and_skipped() {
        let values = vec![1.0, 2.0, f64::NAN, 4.0, 5.0];
        let detrended = linear_detrend(&values);
        assert!(detrended[2].is_nan());
        for i in [0, 1, 3, 4] {
            assert_approx_eq!(detrended[i], 0.0, 1e-12);
        }
    }

    #[test]
    fn test_single_value_removes_mean() {
        let detrended = linear_detrend(&[f64::NAN, 7.0]);
        assert!(detrended[0].is_nan());
        assert_eq!(detrended[1], 0.0);
    }
}
