//! Content-addressed cache of EOF artifacts.
//!
//! An entry is a directory `<root>/eof-<key prefix>/`. It is valid only
//! once `manifest.json` has been written, which happens after every
//! artifact is in place. A directory without a manifest is an interrupted
//! run and is wiped before recomputing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use climate_common::GriddedField;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::EofResult;

pub const MANIFEST_FILE: &str = "manifest.json";

const KEY_VERSION: &[u8] = b"paleo-eof-v1";

/// Parameters that, together with the prepared field, identify an entry.
#[derive(Debug, Clone, Copy)]
pub struct KeyParams<'a> {
    pub modes: usize,
    pub latitude_bound: f64,
    pub standardize: bool,
    pub backend: &'a str,
}

/// Hex SHA-256 digest identifying a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the prepared anomaly field (name, axes, values) and parameters.
    pub fn compute(field: &GriddedField, params: &KeyParams<'_>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_VERSION);

        hasher.update((field.name.len() as u64).to_le_bytes());
        hasher.update(field.name.as_bytes());
        for axis in [&field.lon, &field.lat, &field.time] {
            hasher.update((axis.len() as u64).to_le_bytes());
            for v in axis {
                hasher.update(canonical_bits(*v).to_le_bytes());
            }
        }
        for v in field.data.iter() {
            hasher.update(canonical_bits(*v).to_le_bytes());
        }

        hasher.update((params.modes as u64).to_le_bytes());
        hasher.update(canonical_bits(params.latitude_bound).to_le_bytes());
        hasher.update([u8::from(params.standardize)]);
        hasher.update(params.backend.as_bytes());

        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 16 hex digits, used in directory names.
    pub fn short(&self) -> &str {
        &self.0[..16.min(self.0.len())]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// All NaN payloads hash alike.
fn canonical_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Written last into a complete cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EofManifest {
    pub key: CacheKey,
    pub backend: String,
    pub variable: String,
    pub modes_requested: usize,
    pub latitude_bound: f64,
    pub standardize: bool,
    pub ntime: usize,
    /// Coefficient file names, ordered by mode.
    pub coefficient_files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl EofManifest {
    /// Number of modes actually produced.
    pub fn modes(&self) -> usize {
        self.coefficient_files.len()
    }
}

/// Cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the entry for `key`, whether or not it exists.
    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("eof-{}", key.short()))
    }

    /// The manifest of a complete entry for `key`, if there is one.
    ///
    /// A manifest recording a different full key (prefix collision) or
    /// one that fails to parse counts as absent.
    pub fn lookup(&self, key: &CacheKey) -> EofResult<Option<EofManifest>> {
        let path = self.entry_dir(key).join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path)?;
        match serde_json::from_str::<EofManifest>(&text) {
            Ok(manifest) if &manifest.key == key => Ok(Some(manifest)),
            Ok(manifest) => {
                warn!(
                    expected = %key,
                    found = %manifest.key,
                    "Cache entry belongs to another key"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache manifest");
                Ok(None)
            }
        }
    }

    /// Create an empty entry directory for `key`, wiping any partial one.
    pub fn prepare(&self, key: &CacheKey) -> EofResult<PathBuf> {
        let dir = self.entry_dir(key);
        if dir.exists() {
            info!(dir = %dir.display(), "Removing incomplete cache entry");
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Mark the entry complete by writing its manifest.
    pub fn commit(&self, manifest: &EofManifest) -> EofResult<PathBuf> {
        let dir = self.entry_dir(&manifest.key);
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));

        fs::write(&tmp, serde_json::to_vec_pretty(manifest)?)?;
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "Committed cache entry");
        Ok(dir)
    }

    /// Drop the entry for `key`, complete or not.
    pub fn invalidate(&self, key: &CacheKey) -> EofResult<()> {
        let dir = self.entry_dir(key);
        if dir.exists() {
            info!(dir = %dir.display(), "Invalidating cache entry");
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
