//! Paleoclimate forcing analysis service.
//!
//! Wires the workspace crates into one batch run driven by a YAML file:
//! load and time-align the simulation runs and forcing series, compute
//! forcing-active anomalies and their maps, decompose the tropical
//! ensemble mean into EOFs, then correlate and spectrally analyse the
//! coefficient series. Results go to PNG figures and `report.json`.

pub mod analysis;
pub mod config;
pub mod report;

pub use analysis::{Analysis, Inputs, RunAnomaly, RunOptions};
pub use config::{AnalysisConfig, BackendKind, LoggingConfig, RunSource, SeriesSource};
pub use report::{AnalysisReport, REPORT_FILE};
