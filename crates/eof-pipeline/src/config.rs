//! EOF pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Parameters of the masked ensemble-mean decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EofConfig {
    /// Number of leading modes to compute.
    pub modes: usize,

    /// Half-width of the latitude band in degrees.
    pub latitude_bound: f64,

    /// Divide anomalies by the temporal standard deviation.
    pub standardize: bool,

    /// Weight columns by `sqrt(cos(lat))` in the native backend.
    pub area_weighted: bool,

    /// Root directory of the artifact cache.
    pub cache_dir: PathBuf,
}

impl Default for EofConfig {
    fn default() -> Self {
        Self {
            modes: 40,
            latitude_bound: 30.0,
            standardize: true,
            area_weighted: true,
            cache_dir: PathBuf::from("eof-cache"),
        }
    }
}

impl EofConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.modes == 0 {
            return Err("modes must be > 0".to_string());
        }
        if !self.latitude_bound.is_finite()
            || self.latitude_bound <= 0.0
            || self.latitude_bound > 90.0
        {
            return Err("latitude_bound must be in (0, 90]".to_string());
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EofConfig::default();
        assert_eq!(config.modes, 40);
        assert_eq!(config.latitude_bound, 30.0);
        assert!(config.standardize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: EofConfig = serde_yaml::from_str("modes: 8\n").unwrap();
        assert_eq!(config.modes, 8);
        assert_eq!(config.latitude_bound, 30.0);
    }

    #[test]
    fn test_validation() {
        let mut config = EofConfig {
            modes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.modes = 4;
        config.latitude_bound = 120.0;
        assert!(config.validate().is_err());
    }
}
