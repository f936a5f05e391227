//! The JSON summary written next to the figures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use forcing_analysis::{CorrelationReport, SpectralEstimate};
use serde::{Deserialize, Serialize};

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSpan {
    pub first: i32,
    pub last: i32,
    pub steps: usize,
}

/// Anomaly summary of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub active_steps: usize,
    pub missing_fraction: f64,
    pub anomaly_min: Option<f64>,
    pub anomaly_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EofSummary {
    pub backend: String,
    pub cache_key: String,
    pub cache_entry: String,
    pub reused: bool,
    pub modes: usize,
    /// Explained-variance fraction per loaded mode, leading first.
    pub explained_variance: Vec<Option<f64>>,
}

/// Dominant period of one coefficient spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    pub mode: usize,
    pub peak_period: Option<f64>,
    pub peak_power: Option<f64>,
    pub dof: f64,
    pub estimates: usize,
}

impl SpectralPeak {
    pub fn from_estimate(mode: usize, estimate: &SpectralEstimate) -> Self {
        let peak = estimate.peak();
        Self {
            mode,
            peak_period: peak.map(|p| p.0),
            peak_power: peak.map(|p| p.1),
            dof: estimate.dof,
            estimates: estimate.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub years: YearSpan,
    pub runs: Vec<RunSummary>,
    pub eof: EofSummary,
    /// Ranked mode correlations per forcing series.
    pub correlations: BTreeMap<String, CorrelationReport>,
    pub spectra: Vec<SpectralPeak>,
    /// Figure file names inside the output directory.
    pub figures: Vec<String>,
}

impl AnalysisReport {
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(&path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
        Ok(())
    }
}

/// `None` for NaN and infinities, which JSON cannot carry.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
