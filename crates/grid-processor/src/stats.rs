//! NaN-skipping reductions.
//!
//! Missing values are `NaN`; every reduction here ignores them and returns
//! `NaN` only when nothing is left to reduce.

use ndarray::{Array2, Array3, Axis, Zip};
use num_traits::Float;

/// Mean of the non-NaN values.
pub fn nan_mean<T, I>(values: I) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return T::nan();
    }
    T::from(n).map_or_else(T::nan, |n| sum / n)
}

/// Population standard deviation (divisor `n`) of the non-NaN values.
pub fn nan_std<T, I>(values: I) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let mean = nan_mean(iter.clone());
    if mean.is_nan() {
        return T::nan();
    }
    let (ss, n) = iter
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(s, n), v| (s + (v - mean) * (v - mean), n + 1));
    T::from(n).map_or_else(T::nan, |n| (ss / n).sqrt())
}

/// Per-cell mean over time of a `(time, lat, lon)` array, optionally
/// restricted to the steps where `mask` is true.
pub fn temporal_mean(data: &Array3<f64>, mask: Option<&[bool]>) -> Array2<f64> {
    Zip::from(data.lanes(Axis(0))).par_map_collect(|lane| match mask {
        Some(mask) => nan_mean(
            lane.iter()
                .zip(mask)
                .filter(|(_, active)| **active)
                .map(|(&v, _)| v),
        ),
        None => nan_mean(lane.iter().copied()),
    })
}

/// Per-cell population standard deviation over time.
pub fn temporal_std(data: &Array3<f64>) -> Array2<f64> {
    Zip::from(data.lanes(Axis(0))).par_map_collect(|lane| nan_std(lane.iter().copied()))
}
