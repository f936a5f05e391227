//! Time-axis normalization and cross-source alignment.
//!
//! Model output and forcing files encode yearly-mean timestamps in
//! different ways (`8500701.5`, `850.5`, `850`). Every axis is reduced to
//! integer years and all axes must then agree elementwise. Downstream
//! masks and reductions are positional, so any disagreement is fatal.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for comparing fractional parts of time values.
const FRACTION_TOLERANCE: f64 = 1e-6;

/// How a file encodes yearly time stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeEncoding {
    /// `YYYY<digits>[.fraction]`, e.g. `8500701.5` with digits `"0701"`.
    DateSuffix {
        digits: String,
        #[serde(default)]
        fraction: Option<f64>,
    },
    /// `YYYY.fraction`, e.g. `850.5`.
    FractionalYear { fraction: f64 },
    /// Plain integral years.
    Year,
}

impl fmt::Display for TimeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeEncoding::DateSuffix {
                digits,
                fraction: Some(frac),
            } => write!(f, "YYYY{} + {}", digits, frac),
            TimeEncoding::DateSuffix {
                digits,
                fraction: None,
            } => write!(f, "YYYY{}", digits),
            TimeEncoding::FractionalYear { fraction } => write!(f, "YYYY + {}", fraction),
            TimeEncoding::Year => write!(f, "YYYY"),
        }
    }
}

impl TimeEncoding {
    /// Check the encoding itself is well formed.
    fn check(&self) -> Result<(), TimeAxisError> {
        match self {
            TimeEncoding::DateSuffix { digits, fraction } => {
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(TimeAxisError::InvalidEncoding(format!(
                        "suffix '{}' must be a non-empty digit string",
                        digits
                    )));
                }
                if digits.len() == 4 {
                    // Parsing cannot fail: all four characters are digits.
                    let month: u32 = digits[..2].parse().unwrap_or(0);
                    let day: u32 = digits[2..].parse().unwrap_or(0);
                    // 2000 is a leap year, so 0229 is accepted.
                    if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
                        return Err(TimeAxisError::InvalidEncoding(format!(
                            "suffix '{}' is not a valid month/day",
                            digits
                        )));
                    }
                }
                if let Some(frac) = fraction {
                    check_fraction(*frac)?;
                }
                Ok(())
            }
            TimeEncoding::FractionalYear { fraction } => check_fraction(*fraction),
            TimeEncoding::Year => Ok(()),
        }
    }

    /// Normalize one value to its year, or `None` when it does not follow
    /// this encoding.
    fn year_of(&self, value: f64) -> Option<i32> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let whole = value.trunc();
        let frac = value - whole;
        match self {
            TimeEncoding::DateSuffix { digits, fraction } => {
                if let Some(expected) = fraction {
                    if (frac - expected).abs() > FRACTION_TOLERANCE {
                        return None;
                    }
                }
                // Year 0 carries only the suffix, e.g. 701.5 for 0701.
                let text = format!("{:0width$}", whole as i64, width = digits.len());
                if !text.ends_with(digits.as_str()) {
                    return None;
                }
                let year = &text[..text.len() - digits.len()];
                if year.is_empty() {
                    return Some(0);
                }
                year.parse().ok()
            }
            TimeEncoding::FractionalYear { fraction } => {
                if (frac - fraction).abs() > FRACTION_TOLERANCE {
                    return None;
                }
                i32::try_from(whole as i64).ok()
            }
            TimeEncoding::Year => {
                if frac.abs() > FRACTION_TOLERANCE {
                    return None;
                }
                i32::try_from(whole as i64).ok()
            }
        }
    }
}

fn check_fraction(fraction: f64) -> Result<(), TimeAxisError> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(TimeAxisError::InvalidEncoding(format!(
            "fraction {} must lie in [0, 1)",
            fraction
        )));
    }
    Ok(())
}

/// Errors from time-axis normalization and alignment.
#[derive(Debug, Error, PartialEq)]
pub enum TimeAxisError {
    #[error("invalid time encoding: {0}")]
    InvalidEncoding(String),

    #[error("time axis '{axis}' is empty")]
    Empty { axis: String },

    #[error("time axis '{axis}' value {value} at index {index} does not match encoding {expected}")]
    SuffixMismatch {
        axis: String,
        index: usize,
        value: f64,
        expected: String,
    },

    #[error("time axis '{axis}' has {found} steps but '{reference}' has {expected}")]
    LengthMismatch {
        reference: String,
        axis: String,
        expected: usize,
        found: usize,
    },

    #[error("time axis '{axis}' disagrees with '{reference}' at index {index}: {found} != {expected}")]
    Misaligned {
        reference: String,
        axis: String,
        index: usize,
        expected: i32,
        found: i32,
    },
}

/// A time axis reduced to integer years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearAxis {
    /// Source label used in error messages (file or variable name)
    pub name: String,
    pub years: Vec<i32>,
}

impl YearAxis {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn first(&self) -> Option<i32> {
        self.years.first().copied()
    }

    pub fn last(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

/// Normalize raw time values to integer years.
pub fn normalize_years(
    name: impl Into<String>,
    values: &[f64],
    encoding: &TimeEncoding,
) -> Result<YearAxis, TimeAxisError> {
    let name = name.into();
    encoding.check()?;
    if values.is_empty() {
        return Err(TimeAxisError::Empty { axis: name });
    }

    let mut years = Vec::with_capacity(values.len());
    for (index, &value) in values.iter().enumerate() {
        match encoding.year_of(value) {
            Some(year) => years.push(year),
            None => {
                return Err(TimeAxisError::SuffixMismatch {
                    axis: name,
                    index,
                    value,
                    expected: encoding.to_string(),
                })
            }
        }
    }

    Ok(YearAxis { name, years })
}

/// Assert that every normalized axis matches the first one elementwise.
///
/// Returns the reference axis on success.
pub fn validate_alignment(axes: &[YearAxis]) -> Result<YearAxis, TimeAxisError> {
    let reference = axes.first().ok_or_else(|| TimeAxisError::Empty {
        axis: "<none>".to_string(),
    })?;

    for axis in &axes[1..] {
        if axis.len() != reference.len() {
            return Err(TimeAxisError::LengthMismatch {
                reference: reference.name.clone(),
                axis: axis.name.clone(),
                expected: reference.len(),
                found: axis.len(),
            });
        }
        if let Some(index) = reference
            .years
            .iter()
            .zip(&axis.years)
            .position(|(a, b)| a != b)
        {
            return Err(TimeAxisError::Misaligned {
                reference: reference.name.clone(),
                axis: axis.name.clone(),
                index,
                expected: reference.years[index],
                found: axis.years[index],
            });
        }
    }

    Ok(reference.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix(digits: &str, fraction: Option<f64>) -> TimeEncoding {
        TimeEncoding::DateSuffix {
            digits: digits.to_string(),
            fraction,
        }
    }

    #[test]
    fn test_date_suffix_strips_month_day() {
        let axis = normalize_years("tas", &[8500701.5, 8510701.5], &suffix("0701", Some(0.5)))
            .unwrap();
        assert_eq!(axis.years, vec![850, 851]);
    }

    #[test]
    fn test_date_suffix_without_fraction_truncates() {
        let axis = normalize_years("tas", &[18501231.25], &suffix("1231", None)).unwrap();
        assert_eq!(axis.years, vec![1850]);
    }

    #[test]
    fn test_wrong_suffix_is_rejected() {
        let err =
            normalize_years("tas", &[8500701.5, 8510101.5], &suffix("0701", Some(0.5))).unwrap_err();
        assert!(matches!(err, TimeAxisError::SuffixMismatch { index: 1, .. }));
    }

    #[test]
    fn test_date_suffix_accepts_year_zero() {
        let axis = normalize_years("tas", &[701.5, 10701.5, 20701.5], &suffix("0701", Some(0.5)))
            .unwrap();
        assert_eq!(axis.years, vec![0, 1, 2]);
    }

    #[test]
    fn test_suffix_shorter_than_digits_is_rejected() {
        let err = normalize_years("tas", &[1.5], &suffix("0701", Some(0.5))).unwrap_err();
        assert!(matches!(err, TimeAxisError::SuffixMismatch { index: 0, .. }));
    }

    #[test]
    fn test_wrong_fraction_is_rejected() {
        let err = normalize_years("tas", &[8500701.0], &suffix("0701", Some(0.5))).unwrap_err();
        assert!(matches!(err, TimeAxisError::SuffixMismatch { index: 0, .. }));
    }

    #[test]
    fn test_invalid_month_day_encoding() {
        let err = normalize_years("tas", &[8501301.0], &suffix("1301", None)).unwrap_err();
        assert!(matches!(err, TimeAxisError::InvalidEncoding(_)));
    }

    #[test]
    fn test_fractional_year() {
        let enc = TimeEncoding::FractionalYear { fraction: 0.5 };
        assert_eq!(normalize_years("tsi", &[850.5, 851.5], &enc).unwrap().years, vec![850, 851]);
        assert!(normalize_years("tsi", &[850.0], &enc).is_err());
    }

    #[test]
    fn test_plain_years_reject_fractions() {
        assert!(normalize_years("aod", &[850.0], &TimeEncoding::Year).is_ok());
        assert!(normalize_years("aod", &[850.5], &TimeEncoding::Year).is_err());
        assert!(normalize_years("aod", &[f64::NAN], &TimeEncoding::Year).is_err());
    }

    #[test]
    fn test_empty_axis_is_rejected() {
        let err = normalize_years("aod", &[], &TimeEncoding::Year).unwrap_err();
        assert_eq!(err, TimeAxisError::Empty { axis: "aod".into() });
    }

    #[test]
    fn test_encoding_from_yaml() {
        let enc: TimeEncoding =
            serde_yaml::from_str("kind: date_suffix\ndigits: \"0701\"\nfraction: 0.5\n").unwrap();
        assert_eq!(enc, suffix("0701", Some(0.5)));
        let enc: TimeEncoding = serde_yaml::from_str("kind: year\n").unwrap();
        assert_eq!(enc, TimeEncoding::Year);
    }
}
