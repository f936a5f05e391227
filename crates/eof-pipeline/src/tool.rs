//! Checked invocation of external command-line tools.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{EofError, EofResult};

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// A command-line tool at a configured location.
///
/// Every run blocks until the process exits. A non-zero exit status is
/// reported as [`EofError::DependencyFailure`] with the captured stderr.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    binary: PathBuf,
}

impl ExternalTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run the tool with `args` and wait for it.
    pub fn run<I, S>(&self, args: I) -> EofResult<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command_line = self.command_line(&args);
        info!(command = %command_line, "Running external tool");

        let start = Instant::now();
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    EofError::DependencyMissing {
                        binary: self.binary.display().to_string(),
                        source: e,
                    }
                }
                _ => EofError::Io(e),
            })?;
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(EofError::DependencyFailure {
                command: command_line,
                status: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            command = %command_line,
            elapsed_ms = elapsed.as_millis() as u64,
            stderr = %stderr.trim(),
            "External tool finished"
        );

        Ok(ToolOutput {
            stdout,
            stderr,
            elapsed,
        })
    }

    /// First non-empty line the tool prints for `version_flag`, used as a
    /// preflight check.
    pub fn version(&self, version_flag: &str) -> EofResult<String> {
        let output = self.run([version_flag])?;
        Ok(output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string())
    }

    fn command_line(&self, args: &[OsString]) -> String {
        std::iter::once(self.binary.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_successful_run_captures_stdout() {
        let tool = ExternalTool::new("sh");
        let out = tool.run(["-c", "echo hello"]).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_nonzero_exit_is_dependency_failure() {
        let tool = ExternalTool::new("sh");
        let err = tool.run(["-c", "echo boom >&2; exit 3"]).unwrap_err();
        match err {
            EofError::DependencyFailure {
                command,
                status,
                stderr,
            } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
                assert!(command.starts_with("sh -c"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_binary() {
        let tool = ExternalTool::new("/nonexistent/definitely-not-cdo");
        let err = tool.run(["-V"]).unwrap_err();
        assert!(matches!(err, EofError::DependencyMissing { .. }));
    }

    #[test]
    fn test_stderr_is_captured_on_success() {
        let out = ExternalTool::new("sh")
            .run(["-c", "echo 'Climate Data Operators version 2.0' >&2"])
            .unwrap();
        assert!(out.stdout.is_empty());
        assert!(out.stderr.contains("version 2.0"));
    }

    #[test]
    fn test_version_is_first_non_empty_line() {
        let version = ExternalTool::new("echo").version("cdo 2.4.0").unwrap();
        assert_eq!(version, "cdo 2.4.0");
    }

    #[test]
    fn test_command_line_joins_args() {
        let tool = ExternalTool::new("cdo");
        let line = tool.command_line(&[OsString::from("eof,4"), OsString::from("in.nc")]);
        assert_eq!(line, "cdo eof,4 in.nc");
    }
}
