//! Configuration for the grid processor.

use serde::{Deserialize, Serialize};

/// What to do with a cell whose temporal standard deviation is zero when
/// dividing by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariancePolicy {
    /// Write NaN and keep going.
    #[default]
    Undefined,
    /// Abort with `GridProcessorError::ZeroVariance`.
    Fail,
}

/// How the ensemble mean treats members that are missing at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Average the members that are present; NaN only if all are missing.
    #[default]
    Skip,
    /// NaN as soon as any member is missing.
    Propagate,
}

/// Configuration for anomaly and ensemble processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridProcessorConfig {
    /// Aerosol optical depth above which a time step is forcing-active.
    pub aod_threshold: f64,

    /// Zero-variance handling for standardized anomalies.
    pub zero_variance: ZeroVariancePolicy,

    /// Missing-value handling in ensemble means.
    pub ensemble_missing: MissingPolicy,
}

impl Default for GridProcessorConfig {
    fn default() -> Self {
        Self {
            aod_threshold: 0.1,
            zero_variance: ZeroVariancePolicy::Undefined,
            ensemble_missing: MissingPolicy::Skip,
        }
    }
}

impl GridProcessorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.aod_threshold.is_finite() || self.aod_threshold < 0.0 {
            return Err("aod_threshold must be a finite value >= 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridProcessorConfig::default();
        assert_eq!(config.zero_variance, ZeroVariancePolicy::Undefined);
        assert_eq!(config.ensemble_missing, MissingPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: GridProcessorConfig =
            serde_yaml::from_str("zero_variance: fail\n").unwrap();
        assert_eq!(config.zero_variance, ZeroVariancePolicy::Fail);
        assert_eq!(config.aod_threshold, 0.1);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = GridProcessorConfig {
            aod_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
