//! Empirical orthogonal function analysis of a simulation ensemble.
//!
//! The pipeline crops each run to a latitude band, averages the runs,
//! removes the temporal mean (optionally standardizing) and hands the
//! result to a [`DecompositionBackend`]. Artifacts land in a cache entry
//! keyed by a hash of the prepared field and the parameters, so repeated
//! runs with the same inputs skip the decomposition.
//!
//! Two backends ship with the crate:
//!
//! - [`CdoBackend`] shells out to the `cdo` `eof`/`eofcoeff` operators
//! - [`NativeBackend`] runs a dense SVD with `nalgebra`

pub mod artifacts;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod native;
pub mod pipeline;
pub mod tool;

pub use artifacts::{CoefficientSeries, EofArtifacts};
pub use backend::{
    coefficient_file, CdoBackend, DecompositionBackend, COEFFICIENT_PREFIX, EIGENVALUES_FILE,
    INPUT_FILE, PATTERNS_FILE,
};
pub use cache::{ArtifactCache, CacheKey, EofManifest, KeyParams, MANIFEST_FILE};
pub use config::EofConfig;
pub use error::{EofError, EofResult};
pub use native::NativeBackend;
pub use pipeline::{list_coefficient_files, EofPipeline, EofRun};
pub use tool::{ExternalTool, ToolOutput};
