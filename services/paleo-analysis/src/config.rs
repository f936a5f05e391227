//! Analysis configuration loaded from YAML.
//!
//! Every section has defaults, so a file only needs the input sources.
//! `${VAR}` and `${VAR:-default}` are substituted from the environment
//! before parsing. Relative paths are resolved against the directory of
//! the configuration file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use climate_common::TimeEncoding;
use eof_pipeline::EofConfig;
use forcing_analysis::{CorrelatorConfig, SpectralConfig};
use grid_processor::GridProcessorConfig;
use renderer::MapStyle;
use serde::{Deserialize, Serialize};

// ============================================================================
// Sections
// ============================================================================

/// Decomposition backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External `cdo eof` / `eofcoeff`
    #[default]
    Cdo,
    /// In-process SVD
    Native,
}

/// Temperature field of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSource {
    pub name: String,
    pub path: PathBuf,
    pub variable: String,
    pub time: TimeEncoding,
}

/// A scalar forcing series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSource {
    pub path: PathBuf,
    pub variable: String,
    pub time: TimeEncoding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ============================================================================
// Analysis configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub runs: Vec<RunSource>,
    /// Aerosol optical depth, defines forcing-active time steps.
    pub aod: Option<SeriesSource>,
    /// Solar irradiance, correlated with the EOF coefficients.
    pub solar: Option<SeriesSource>,
    pub output_dir: PathBuf,
    pub backend: BackendKind,
    /// `cdo` executable; a bare name is looked up on `PATH`.
    pub cdo_binary: PathBuf,
    /// Optional GeoJSON coastline overlay.
    pub coastline: Option<PathBuf>,
    pub processing: GridProcessorConfig,
    pub eof: EofConfig,
    pub correlator: CorrelatorConfig,
    pub spectral: SpectralConfig,
    pub map: MapStyle,
    pub logging: LoggingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            aod: None,
            solar: None,
            output_dir: PathBuf::from("output"),
            backend: BackendKind::default(),
            cdo_binary: PathBuf::from("cdo"),
            coastline: None,
            processing: GridProcessorConfig::default(),
            eof: EofConfig::default(),
            correlator: CorrelatorConfig::default(),
            spectral: SpectralConfig::default(),
            map: MapStyle::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read, substitute, parse, resolve and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config from {:?}", path))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&content, base)
            .with_context(|| format!("Invalid analysis config {:?}", path))
    }

    /// Parse YAML text; relative paths resolve against `base`.
    pub fn from_yaml_str(content: &str, base: &Path) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let mut config: AnalysisConfig =
            serde_yaml::from_str(&expanded).context("Failed to parse analysis config YAML")?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for run in &mut self.runs {
            resolve(&mut run.path);
        }
        for source in [&mut self.aod, &mut self.solar].into_iter().flatten() {
            resolve(&mut source.path);
        }
        if let Some(coastline) = &mut self.coastline {
            resolve(coastline);
        }
        resolve(&mut self.output_dir);
        resolve(&mut self.eof.cache_dir);
        // only explicit relative paths; bare names stay PATH lookups
        if self.cdo_binary.components().count() > 1 {
            resolve(&mut self.cdo_binary);
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.runs.is_empty(), "At least one simulation run is required");

        let mut names = HashSet::new();
        for run in &self.runs {
            anyhow::ensure!(!run.name.is_empty(), "Run name cannot be empty");
            anyhow::ensure!(names.insert(&run.name), "Duplicate run name: {}", run.name);
            anyhow::ensure!(
                !run.variable.is_empty(),
                "Run {} has no variable name",
                run.name
            );
        }

        for (label, source) in [("aod", &self.aod), ("solar", &self.solar)] {
            let source = source
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Forcing source '{}' is required", label))?;
            anyhow::ensure!(
                !source.variable.is_empty(),
                "Forcing source '{}' has no variable name",
                label
            );
        }

        anyhow::ensure!(
            !self.cdo_binary.as_os_str().is_empty(),
            "cdo_binary cannot be empty"
        );

        self.processing
            .validate()
            .map_err(|e| anyhow::anyhow!("processing: {}", e))?;
        self.eof.validate().map_err(|e| anyhow::anyhow!("eof: {}", e))?;
        self.correlator
            .validate()
            .map_err(|e| anyhow::anyhow!("correlator: {}", e))?;
        self.spectral
            .validate()
            .map_err(|e| anyhow::anyhow!("spectral: {}", e))?;
        self.map.validate().map_err(|e| anyhow::anyhow!("map: {}", e))?;

        if let Some(&mode) = self.spectral.modes.iter().find(|&&m| m > self.eof.modes) {
            anyhow::bail!(
                "spectral mode {} exceeds the {} computed EOF modes",
                mode,
                self.eof.modes
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        anyhow::ensure!(
            valid_levels.contains(&self.logging.level.as_str()),
            "Invalid log level: {}. Must be one of: {:?}",
            self.logging.level,
            valid_levels
        );

        Ok(())
    }
}

// ============================================================================
// Environment substitution
// ============================================================================

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

/// `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_default_when_unset() {
        let out = expand_env_vars("dir: ${PALEO_TEST_SURELY_UNSET_VAR:-/data}/x").unwrap();
        assert_eq!(out, "dir: /data/x");
    }

    #[test]
    fn test_expand_missing_variable_is_error() {
        assert!(expand_env_vars("${PALEO_TEST_SURELY_UNSET_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_text_without_variables_is_unchanged() {
        let text = "a: 1\nb: $HOME\n";
        assert_eq!(expand_env_vars(text).unwrap(), text);
    }
}
