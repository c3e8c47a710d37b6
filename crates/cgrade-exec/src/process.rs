//! Timeout-bounded process execution

use cgrade_core::{Diagnostic, DiagnosticCode};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// How a child process is launched
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hard ceiling on wall-clock time
    pub timeout: Duration,

    /// Working directory (inherits the grader's when unset)
    pub current_dir: Option<PathBuf>,
}

impl RunOptions {
    /// Options with the given timeout and no working directory override
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            current_dir: None,
        }
    }

    /// Run the child from `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }
}

/// Everything a finished child produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the child was killed by a signal
    pub exit_code: Option<i32>,

    /// Human-readable exit status (`exit status: 1`, `signal: 11 (SIGSEGV)`)
    pub status: String,

    /// Captured standard output (lossy UTF-8)
    pub stdout: String,

    /// Captured standard error (lossy UTF-8)
    pub stderr: String,

    /// Wall-clock run time
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Whether the child exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors launching or waiting for a child
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while waiting for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Name of the program involved
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. } | Self::Timeout { program, .. } | Self::Io { program, .. } => {
                program
            }
        }
    }

    /// Whether the failure is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert to a grading diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Timeout { timeout, .. } => Diagnostic::error(
                DiagnosticCode::ExecutionTimeout,
                self.to_string(),
            )
            .with_hint(format!(
                "Make sure the program terminates and does not wait for input (limit: {} ms).",
                timeout.as_millis()
            )),
            Self::Spawn { .. } | Self::Io { .. } => {
                Diagnostic::error(DiagnosticCode::ToolFailure, self.to_string())
            }
        }
    }
}

/// Run `program` with `args`, capturing stdout and stderr fully.
///
/// Stdin is closed. The child is killed if it outlives `options.timeout`.
pub async fn run<I, S>(program: &str, args: I, options: &RunOptions) -> Result<ProcessOutput, ExecError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &options.current_dir {
        command.current_dir(dir);
    }

    tracing::debug!(program, timeout_ms = options.timeout.as_millis() as u64, "launching process");

    let started = Instant::now();
    let child = command.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(options.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ExecError::Io {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            tracing::warn!(program, "process timed out");
            return Err(ExecError::Timeout {
                program: program.to_string(),
                timeout: options.timeout,
            });
        }
    };

    let result = ProcessOutput {
        exit_code: output.status.code(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed: started.elapsed(),
    };

    tracing::debug!(program, status = %result.status, elapsed_ms = result.elapsed.as_millis() as u64, "process finished");

    Ok(result)
}
