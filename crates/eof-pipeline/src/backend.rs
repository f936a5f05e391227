//! Decomposition backends.
//!
//! A backend turns a prepared anomaly field into the on-disk artifact
//! layout the rest of the pipeline reads:
//!
//! | File            | Contents                                     |
//! |-----------------|----------------------------------------------|
//! | `anomalies.nc`  | the decomposed input field                   |
//! | `eigval.nc`     | eigenvalues, one per mode along `time`       |
//! | `eigvec.nc`     | spatial patterns, one per mode along `time`  |
//! | `pcNNNNN.nc`    | coefficient series of mode `NNNNN` (0-based) |

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use climate_common::GriddedField;
use netcdf_parser::write_gridded_field;
use tracing::{info, warn};

use crate::error::{EofError, EofResult};
use crate::tool::ExternalTool;

pub const INPUT_FILE: &str = "anomalies.nc";
pub const EIGENVALUES_FILE: &str = "eigval.nc";
pub const PATTERNS_FILE: &str = "eigvec.nc";
pub const COEFFICIENT_PREFIX: &str = "pc";

/// File name of the coefficient series for a 0-based mode index.
pub fn coefficient_file(mode: usize) -> String {
    format!("{COEFFICIENT_PREFIX}{mode:05}.nc")
}

/// Parse the 0-based mode index back out of a coefficient file name.
pub fn coefficient_index(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(COEFFICIENT_PREFIX)?
        .strip_suffix(".nc")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()
}

/// Something that can decompose an anomaly field into leading modes.
pub trait DecompositionBackend {
    /// Short identifier, part of the cache key.
    fn name(&self) -> &str;

    /// Decompose `anomalies` into at most `modes` modes, writing the
    /// artifact layout into `out_dir` (which exists and is empty).
    fn decompose(&self, anomalies: &GriddedField, modes: usize, out_dir: &Path) -> EofResult<()>;
}

impl<B: DecompositionBackend + ?Sized> DecompositionBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decompose(&self, anomalies: &GriddedField, modes: usize, out_dir: &Path) -> EofResult<()> {
        (**self).decompose(anomalies, modes, out_dir)
    }
}

/// Decomposition through the Climate Data Operators `eof` and `eofcoeff`
/// operators.
#[derive(Debug, Clone)]
pub struct CdoBackend {
    tool: ExternalTool,
}

impl CdoBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            tool: ExternalTool::new(binary),
        }
    }

    pub fn tool(&self) -> &ExternalTool {
        &self.tool
    }

    /// Check the binary starts before any input is written. Only a
    /// missing binary is fatal; some builds exit non-zero on `-V`.
    pub fn preflight(&self) -> EofResult<()> {
        match self.tool.version("-V") {
            Ok(version) => {
                info!(binary = %self.tool.binary().display(), version = %version, "Found cdo");
                Ok(())
            }
            Err(err @ EofError::DependencyMissing { .. }) => Err(err),
            Err(err) => {
                warn!(error = %err, "cdo version check failed, continuing");
                Ok(())
            }
        }
    }
}

impl DecompositionBackend for CdoBackend {
    fn name(&self) -> &str {
        "cdo"
    }

    fn decompose(&self, anomalies: &GriddedField, modes: usize, out_dir: &Path) -> EofResult<()> {
        let input = out_dir.join(INPUT_FILE);
        let eigval = out_dir.join(EIGENVALUES_FILE);
        let eigvec = out_dir.join(PATTERNS_FILE);
        let coefficients = out_dir.join(COEFFICIENT_PREFIX);

        self.preflight()?;
        write_gridded_field(&input, anomalies)?;

        info!(modes, dir = %out_dir.display(), "Computing EOFs with cdo");
        let operator = format!("eof,{modes}");
        self.tool.run([
            OsStr::new(&operator),
            input.as_os_str(),
            eigval.as_os_str(),
            eigvec.as_os_str(),
        ])?;

        self.tool.run([
            OsStr::new("eofcoeff"),
            eigvec.as_os_str(),
            input.as_os_str(),
            coefficients.as_os_str(),
        ])?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_file_names() {
        assert_eq!(coefficient_file(0), "pc00000.nc");
        assert_eq!(coefficient_file(39), "pc00039.nc");
    }

    #[test]
    fn test_coefficient_index_parses_only_coefficients() {
        assert_eq!(coefficient_index("pc00003.nc"), Some(3));
        assert_eq!(coefficient_index("pc.nc"), None);
        assert_eq!(coefficient_index("pcx0001.nc"), None);
        assert_eq!(coefficient_index("eigval.nc"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_cdo_backend_reports_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let field = test_utils::field_from_fn("tas", 2, 2, 3, |t, _, _| t as f64);
        let backend = CdoBackend::new("/nonexistent/cdo");
        let err = backend.decompose(&field, 2, dir.path()).unwrap_err();
        assert!(matches!(err, EofError::DependencyMissing { .. }));
        // preflight fails before anything is written
        assert!(!dir.path().join(INPUT_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_preflight_tolerates_failing_version_flag() {
        // `false` starts fine but exits 1
        assert!(CdoBackend::new("false").preflight().is_ok());
        assert!(CdoBackend::new("/nonexistent/cdo").preflight().is_err());
    }
}
