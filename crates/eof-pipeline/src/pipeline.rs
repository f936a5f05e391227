//! Band crop, ensemble mean, anomaly and cached decomposition.

use std::path::{Path, PathBuf};

use chrono::Utc;
use climate_common::GriddedField;
use grid_processor::{
    crop_latitude_band, ensemble_mean, temporal_anomaly, GridProcessorConfig, LatitudeBand,
};
use tracing::{info, instrument};
use walkdir::WalkDir;

use crate::backend::{coefficient_index, DecompositionBackend, EIGENVALUES_FILE, PATTERNS_FILE};
use crate::cache::{ArtifactCache, CacheKey, EofManifest, KeyParams};
use crate::config::EofConfig;
use crate::error::{EofError, EofResult};

/// Outcome of [`EofPipeline::run`].
#[derive(Debug, Clone)]
pub struct EofRun {
    /// Cache entry directory holding the artifacts.
    pub dir: PathBuf,
    pub manifest: EofManifest,
    /// True when a cached entry was used and the backend did not run.
    pub reused: bool,
}

/// Runs the EOF analysis over a set of simulation runs.
pub struct EofPipeline<B> {
    config: EofConfig,
    processing: GridProcessorConfig,
    backend: B,
    cache: ArtifactCache,
}

impl<B: DecompositionBackend> EofPipeline<B> {
    pub fn new(config: EofConfig, processing: GridProcessorConfig, backend: B) -> Self {
        let cache = ArtifactCache::new(config.cache_dir.clone());
        Self {
            config,
            processing,
            backend,
            cache,
        }
    }

    pub fn config(&self) -> &EofConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Crop every run to the latitude band, average across runs and take
    /// the temporal anomaly.
    pub fn prepare(&self, runs: &[&GriddedField]) -> EofResult<GriddedField> {
        let band = LatitudeBand::symmetric(self.config.latitude_bound);
        let cropped = runs
            .iter()
            .map(|run| crop_latitude_band(run, band))
            .collect::<Result<Vec<_>, _>>()?;
        let members: Vec<&GriddedField> = cropped.iter().collect();

        let mean = ensemble_mean(&members, self.processing.ensemble_missing)?;
        let anomalies = temporal_anomaly(
            &mean,
            self.config.standardize,
            self.processing.zero_variance,
        )?;

        info!(
            runs = runs.len(),
            nlat = anomalies.nlat(),
            nlon = anomalies.nlon(),
            ntime = anomalies.ntime(),
            "Prepared ensemble anomaly field"
        );
        Ok(anomalies)
    }

    /// Prepare and decompose, reusing a cached entry when one matches.
    pub fn run(&self, runs: &[&GriddedField]) -> EofResult<EofRun> {
        self.run_with_refresh(runs, false)
    }

    /// Like [`run`](Self::run); with `refresh` any cached entry for the
    /// same key is discarded first.
    #[instrument(skip(self, runs), fields(backend = self.backend.name()))]
    pub fn run_with_refresh(&self, runs: &[&GriddedField], refresh: bool) -> EofResult<EofRun> {
        self.config.validate().map_err(EofError::ConfigError)?;

        let prepared = self.prepare(runs)?;
        let key = CacheKey::compute(
            &prepared,
            &KeyParams {
                modes: self.config.modes,
                latitude_bound: self.config.latitude_bound,
                standardize: self.config.standardize,
                backend: self.backend.name(),
            },
        );

        if refresh {
            self.cache.invalidate(&key)?;
        }

        if let Some(manifest) = self.cache.lookup(&key)? {
            info!(key = %key.short(), modes = manifest.modes(), "Reusing cached EOFs");
            return Ok(EofRun {
                dir: self.cache.entry_dir(&key),
                manifest,
                reused: true,
            });
        }

        let dir = self.cache.prepare(&key)?;
        self.backend
            .decompose(&prepared, self.config.modes, &dir)?;

        for required in [EIGENVALUES_FILE, PATTERNS_FILE] {
            if !dir.join(required).is_file() {
                return Err(EofError::missing_artifact(format!(
                    "{} not produced by backend '{}'",
                    required,
                    self.backend.name()
                )));
            }
        }
        let coefficient_files = list_coefficient_files(&dir)?;
        if coefficient_files.is_empty() {
            return Err(EofError::missing_artifact(format!(
                "no coefficient series produced by backend '{}'",
                self.backend.name()
            )));
        }

        let manifest = EofManifest {
            key: key.clone(),
            backend: self.backend.name().to_string(),
            variable: prepared.name.clone(),
            modes_requested: self.config.modes,
            latitude_bound: self.config.latitude_bound,
            standardize: self.config.standardize,
            ntime: prepared.ntime(),
            coefficient_files,
            created_at: Utc::now(),
        };
        let dir = self.cache.commit(&manifest)?;

        info!(key = %key.short(), modes = manifest.modes(), "Computed EOFs");
        Ok(EofRun {
            dir,
            manifest,
            reused: false,
        })
    }
}

/// Coefficient files in `dir`, ordered by mode index.
pub fn list_coefficient_files(dir: &Path) -> EofResult<Vec<String>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            EofError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(index) = coefficient_index(&name) {
            found.push((index, name));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, name)| name).collect())
}
