//! Coordinate axis helpers.

/// Absolute tolerance used when comparing coordinate values read from
/// different files.
pub const AXIS_TOLERANCE: f64 = 1e-6;

/// First index at which two axes differ, or the shorter length when one is
/// a prefix of the other.
pub fn first_axis_difference(a: &[f64], b: &[f64]) -> Option<usize> {
    let mismatch = a
        .iter()
        .zip(b)
        .position(|(x, y)| (x - y).abs() > AXIS_TOLERANCE);
    match mismatch {
        Some(i) => Some(i),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}
