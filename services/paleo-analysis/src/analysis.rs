//! End-to-end analysis: load, validate, anomalies, EOFs, correlation,
//! spectra, figures and report.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use climate_common::{
    normalize_years, validate_alignment, Field2D, ForcingSeries, GriddedField, YearAxis,
};
use eof_pipeline::{
    CdoBackend, DecompositionBackend, EofArtifacts, EofPipeline, EofRun, NativeBackend,
};
use forcing_analysis::{
    zscore, AnalysisError, CorrelationReport, ForcingCorrelator, MultitaperEstimator,
    SpectralEstimate,
};
use grid_processor::{mask_outside_band, zonal_mean, AnomalyEngine, AnomalyResult, LatitudeBand};
use netcdf_parser::{read_gridded_field, read_series};
use renderer::{
    render_colorbar, render_spectra, render_timeseries, render_zonal_profiles, save_map,
    Coastline, MapStyle, SpectrumSeries, TimeSeries, ZonalProfile,
};
use tracing::{info, instrument, warn};

use crate::config::{AnalysisConfig, BackendKind, SeriesSource};
use crate::report::{finite, AnalysisReport, EofSummary, RunSummary, SpectralPeak, YearSpan};

/// Command-line switches that alter a single invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Discard any cached decomposition for the current inputs.
    pub refresh_eof: bool,
    /// Compute and report without writing figures.
    pub skip_render: bool,
}

/// All inputs, time-aligned.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub runs: Vec<GriddedField>,
    pub aod: ForcingSeries,
    pub solar: ForcingSeries,
    pub years: YearAxis,
}

/// Anomaly of one run.
#[derive(Debug, Clone)]
pub struct RunAnomaly {
    pub name: String,
    pub result: AnomalyResult,
}

pub struct Analysis {
    config: AnalysisConfig,
    options: RunOptions,
}

impl Analysis {
    pub fn new(config: AnalysisConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage and write `report.json` into the output directory.
    #[instrument(skip(self), fields(backend = ?self.config.backend))]
    pub fn run(&self) -> Result<AnalysisReport> {
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

        let inputs = self.load_inputs()?;
        let mut figures = Vec::new();

        let anomalies = self.anomalies(&inputs)?;
        if !self.options.skip_render {
            figures.extend(self.render_anomalies(&anomalies)?);
        }

        let (eof_run, artifacts) = self.decompose(&inputs)?;
        let correlations = self.correlate(&inputs, &artifacts)?;
        let spectra = self.spectra(&artifacts)?;

        if !self.options.skip_render {
            figures.extend(self.render_eof_results(&inputs, &artifacts, &correlations, &spectra)?);
        }

        let report = AnalysisReport {
            generated_at: Utc::now(),
            years: YearSpan {
                first: inputs.years.first().unwrap_or_default(),
                last: inputs.years.last().unwrap_or_default(),
                steps: inputs.years.len(),
            },
            runs: inputs
                .runs
                .iter()
                .zip(&anomalies)
                .map(|(field, a)| {
                    let range = a.result.anomaly.finite_range();
                    RunSummary {
                        name: a.name.clone(),
                        active_steps: a.result.statistics.active_steps,
                        missing_fraction: field.missing_fraction(),
                        anomaly_min: range.map(|r| r.0),
                        anomaly_max: range.map(|r| r.1),
                    }
                })
                .collect(),
            eof: EofSummary {
                backend: eof_run.manifest.backend.clone(),
                cache_key: eof_run.manifest.key.to_string(),
                cache_entry: eof_run.dir.display().to_string(),
                reused: eof_run.reused,
                modes: artifacts.modes(),
                explained_variance: artifacts.explained_variance().into_iter().map(finite).collect(),
            },
            correlations,
            spectra: spectra
                .iter()
                .map(|(mode, estimate)| SpectralPeak::from_estimate(*mode, estimate))
                .collect(),
            figures,
        };
        report.write(output_dir)?;
        info!(
            output_dir = %output_dir.display(),
            figures = report.figures.len(),
            "Analysis complete"
        );
        Ok(report)
    }

    // ========================================================================
    // Loading and validation
    // ========================================================================

    /// Read every source and check the time axes and grids agree.
    pub fn load_inputs(&self) -> Result<Inputs> {
        let mut runs = Vec::with_capacity(self.config.runs.len());
        let mut axes = Vec::with_capacity(self.config.runs.len() + 2);

        for source in &self.config.runs {
            let mut field = read_gridded_field(&source.path, &source.variable)
                .with_context(|| format!("Failed to read run {} from {:?}", source.name, source.path))?;
            axes.push(normalize_years(&source.name, &field.time, &source.time)?);
            info!(
                run = %source.name,
                nlon = field.nlon(),
                nlat = field.nlat(),
                ntime = field.ntime(),
                "Loaded run"
            );
            field.name = source.name.clone();
            runs.push(field);
        }

        let aod = self.load_series("aod", required(&self.config.aod, "aod")?, &mut axes)?;
        let solar = self.load_series("solar", required(&self.config.solar, "solar")?, &mut axes)?;

        let years = validate_alignment(&axes)?;
        if let Some((first, rest)) = runs.split_first() {
            for other in rest {
                first.ensure_same_grid(other)?;
            }
        }

        info!(
            first_year = ?years.first(),
            last_year = ?years.last(),
            sources = axes.len(),
            "Time axes aligned"
        );
        Ok(Inputs {
            runs,
            aod,
            solar,
            years,
        })
    }

    fn load_series(
        &self,
        label: &str,
        source: &SeriesSource,
        axes: &mut Vec<YearAxis>,
    ) -> Result<ForcingSeries> {
        let series = read_series(&source.path, &source.variable)
            .with_context(|| format!("Failed to read {} forcing from {:?}", label, source.path))?;
        axes.push(normalize_years(label, &series.time, &source.time)?);
        Ok(series)
    }

    // ========================================================================
    // Anomalies
    // ========================================================================

    pub fn anomalies(&self, inputs: &Inputs) -> Result<Vec<RunAnomaly>> {
        let engine = AnomalyEngine::new(self.config.processing.clone());
        inputs
            .runs
            .iter()
            .map(|field| {
                let result = engine
                    .process(field, &inputs.aod.values)
                    .with_context(|| format!("Anomaly computation failed for run {}", field.name))?;
                Ok(RunAnomaly {
                    name: field.name.clone(),
                    result,
                })
            })
            .collect()
    }

    fn render_anomalies(&self, anomalies: &[RunAnomaly]) -> Result<Vec<String>> {
        let dir = &self.config.output_dir;
        let style = &self.config.map;
        let coastline = self.coastline()?;
        let band = LatitudeBand::symmetric(self.config.eof.latitude_bound);
        let mut figures = Vec::new();

        for run in anomalies {
            let file = format!("{}_anomaly.png", run.name);
            save_map(dir.join(&file), &run.result.anomaly, style, coastline.as_ref())?;
            figures.push(file);

            let file = format!("{}_anomaly_band.png", run.name);
            let masked = mask_outside_band(&run.result.anomaly, band);
            save_map(dir.join(&file), &masked, style, coastline.as_ref())?;
            figures.push(file);
        }

        let zonal: Vec<(String, Vec<f64>, Vec<f64>)> = anomalies
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    a.result.anomaly.lat.clone(),
                    zonal_mean(&a.result.anomaly),
                )
            })
            .collect();
        let profiles: Vec<ZonalProfile<'_>> = zonal
            .iter()
            .map(|(name, lat, values)| ZonalProfile {
                label: name,
                lat,
                values,
            })
            .collect();
        render_zonal_profiles(dir.join("zonal_mean.png"), &profiles, style.range)?;
        figures.push("zonal_mean.png".to_string());

        render_colorbar(dir.join("colorbar.png"), &style.palette(), "Standardized anomaly")?;
        figures.push("colorbar.png".to_string());

        Ok(figures)
    }

    fn coastline(&self) -> Result<Option<Coastline>> {
        self.config
            .coastline
            .as_ref()
            .map(|path| {
                Coastline::load(path).with_context(|| format!("Failed to load coastline {:?}", path))
            })
            .transpose()
    }

    // ========================================================================
    // EOF decomposition
    // ========================================================================

    fn backend(&self) -> Box<dyn DecompositionBackend> {
        match self.config.backend {
            BackendKind::Cdo => Box::new(CdoBackend::new(self.config.cdo_binary.clone())),
            BackendKind::Native => Box::new(NativeBackend::new(self.config.eof.area_weighted)),
        }
    }

    pub fn decompose(&self, inputs: &Inputs) -> Result<(EofRun, EofArtifacts)> {
        let pipeline = EofPipeline::new(
            self.config.eof.clone(),
            self.config.processing.clone(),
            self.backend(),
        );
        let runs: Vec<&GriddedField> = inputs.runs.iter().collect();
        let run = pipeline
            .run_with_refresh(&runs, self.options.refresh_eof)
            .context("EOF decomposition failed")?;
        let artifacts = EofArtifacts::load(&run.dir, &run.manifest)
            .with_context(|| format!("Failed to load EOF artifacts from {:?}", run.dir))?;

        if let Some(first) = artifacts.explained_variance().first() {
            info!(
                modes = artifacts.modes(),
                reused = run.reused,
                eof1_variance = first,
                "EOF artifacts ready"
            );
        }
        Ok((run, artifacts))
    }

    // ========================================================================
    // Forcing correlation and spectra
    // ========================================================================

    pub fn correlate(
        &self,
        inputs: &Inputs,
        artifacts: &EofArtifacts,
    ) -> Result<BTreeMap<String, CorrelationReport>> {
        let correlator = ForcingCorrelator::new(self.config.correlator.clone())?;
        let modes: Vec<(usize, &[f64])> = artifacts
            .coefficients
            .iter()
            .map(|c| (c.mode, c.values.as_slice()))
            .collect();

        let mut reports = BTreeMap::new();
        for (label, forcing) in [("solar", &inputs.solar), ("aod", &inputs.aod)] {
            let report = correlator
                .rank(&forcing.values, &modes)
                .with_context(|| format!("Correlation with {} forcing failed", label))?;
            match report.best() {
                Some(best) => info!(
                    forcing = label,
                    mode = best.mode,
                    r = ?best.r,
                    "Best-matching EOF coefficient"
                ),
                None => warn!(forcing = label, "No mode has a defined correlation"),
            }
            reports.insert(label.to_string(), report);
        }
        Ok(reports)
    }

    pub fn spectra(&self, artifacts: &EofArtifacts) -> Result<Vec<(usize, SpectralEstimate)>> {
        let estimator = MultitaperEstimator::new(self.config.spectral.clone())?;
        let mut spectra = Vec::new();
        for &mode in &self.config.spectral.modes {
            let Some(series) = artifacts.coefficient(mode) else {
                warn!(mode, available = artifacts.modes(), "No coefficient series for mode");
                continue;
            };
            let estimate = match estimator.estimate(&series.values) {
                Ok(estimate) => estimate,
                Err(err @ AnalysisError::TooShort { .. }) => {
                    warn!(mode, error = %err, "Coefficient series too short for a spectrum");
                    continue;
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Spectral estimate of mode {} failed", mode));
                }
            };
            if let Some((period, power)) = estimate.peak() {
                info!(mode, period, power, "Spectral peak");
            }
            spectra.push((mode, estimate));
        }
        Ok(spectra)
    }

    fn render_eof_results(
        &self,
        inputs: &Inputs,
        artifacts: &EofArtifacts,
        correlations: &BTreeMap<String, CorrelationReport>,
        spectra: &[(usize, SpectralEstimate)],
    ) -> Result<Vec<String>> {
        let dir = &self.config.output_dir;
        let mut figures = Vec::new();

        let labels: Vec<String> = spectra.iter().map(|(m, _)| format!("PC{m}")).collect();
        let series: Vec<SpectrumSeries<'_>> = spectra
            .iter()
            .zip(&labels)
            .map(|((_, e), label)| SpectrumSeries {
                label,
                frequency: &e.frequency,
                power: &e.power,
                lower: &e.lower,
                upper: &e.upper,
            })
            .collect();
        if !series.is_empty() {
            render_spectra(dir.join("spectra.png"), &series)?;
            figures.push("spectra.png".to_string());
        }

        for &(mode, _) in spectra {
            if let Some(pattern) = artifacts.pattern(mode) {
                let file = format!("eof{mode}_pattern.png");
                save_map(dir.join(&file), &pattern, &pattern_style(&self.config.map, &pattern), None)?;
                figures.push(file);
            }
        }

        let best = correlations
            .get("solar")
            .and_then(|r| r.best())
            .and_then(|b| artifacts.coefficient(b.mode));
        if let Some(coefficient) = best {
            let correlator = ForcingCorrelator::new(self.config.correlator.clone())?;
            let solar = zscore(&correlator.filter(&inputs.solar.values));
            let pc = zscore(&correlator.filter(&coefficient.values));
            let time: Vec<f64> = inputs.years.years.iter().map(|&y| f64::from(y)).collect();
            let pc_label = format!("PC{}", coefficient.mode);
            render_timeseries(
                dir.join("solar_vs_best_mode.png"),
                &format!("Filtered solar forcing and {pc_label}"),
                &time,
                &[
                    TimeSeries {
                        label: "solar",
                        values: &solar,
                    },
                    TimeSeries {
                        label: &pc_label,
                        values: &pc,
                    },
                ],
            )?;
            figures.push("solar_vs_best_mode.png".to_string());
        }

        Ok(figures)
    }
}

fn required<'a>(source: &'a Option<SeriesSource>, label: &str) -> Result<&'a SeriesSource> {
    source
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Forcing source '{}' is not configured", label))
}

/// EOF patterns are not standardized; scale the palette to the pattern.
fn pattern_style(base: &MapStyle, pattern: &Field2D) -> MapStyle {
    let range = pattern
        .finite_range()
        .map(|(lo, hi)| lo.abs().max(hi.abs()))
        .filter(|r| *r > 0.0)
        .unwrap_or(1.0);
    MapStyle {
        range,
        ..base.clone()
    }
}

