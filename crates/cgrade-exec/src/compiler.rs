//! Compile the file under test into a throwaway executable

use crate::process::{run, ExecError, ProcessOutput, RunOptions};
use cgrade_core::{Diagnostic, DiagnosticCode, Location};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Compiler invocation settings
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Compiler binary (`cc`, `gcc`, `clang`)
    pub compiler: String,

    /// Value for `-std=`
    pub language_standard: String,

    /// Extra flags appended after the defaults
    pub extra_flags: Vec<String>,

    /// Compiler time limit
    pub timeout: Duration,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compiler: "cc".to_string(),
            language_standard: "c99".to_string(),
            extra_flags: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// An executable living in its own temporary directory.
///
/// The directory and the executable are removed when this value is dropped.
#[derive(Debug)]
pub struct CompiledArtifact {
    dir: TempDir,
    path: PathBuf,
}

impl CompiledArtifact {
    /// Path of the executable
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the executable
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Run the executable with no arguments
    pub async fn execute(&self, timeout: Duration) -> Result<ProcessOutput, ExecError> {
        let program = self.path.to_string_lossy().into_owned();
        run(&program, std::iter::empty::<&str>(), &RunOptions::with_timeout(timeout)).await
    }
}

/// Build failures
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("could not create a build directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("compilation of {source_file} failed ({status})")]
    Failed {
        source_file: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

impl CompileError {
    /// Convert to a grading diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Exec(err) => err.to_diagnostic(),
            Self::TempDir(_) => Diagnostic::error(DiagnosticCode::ToolFailure, self.to_string()),
            Self::Failed { source_file, stdout, stderr, .. } => {
                let details = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
                    (true, _) => stderr.clone(),
                    (false, true) => stdout.clone(),
                    (false, false) => format!("stdout:\n{}\nstderr:\n{}", stdout, stderr),
                };

                Diagnostic::error(DiagnosticCode::BuildFailure, self.to_string())
                    .with_location(Location::new(source_file.clone()))
                    .with_details(details)
                    .with_hint("Fix the compiler errors above; the program must build before it can be graded.")
            }
        }
    }
}

/// Compile `source` into a fresh temporary directory
pub async fn compile(source: &Path, options: &CompileOptions) -> Result<CompiledArtifact, CompileError> {
    let dir = tempfile::Builder::new()
        .prefix("cgrade-build-")
        .tempdir()
        .map_err(CompileError::TempDir)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    let path = dir.path().join(stem);

    let mut args = vec![
        format!("-std={}", options.language_standard),
        source.to_string_lossy().into_owned(),
        "-o".to_string(),
        path.to_string_lossy().into_owned(),
        // libm for <math.h> users
        "-lm".to_string(),
    ];
    args.extend(options.extra_flags.iter().cloned());

    tracing::info!(compiler = %options.compiler, source = %source.display(), "compiling");

    let output = run(&options.compiler, &args, &RunOptions::with_timeout(options.timeout)).await?;

    if !output.success() {
        return Err(CompileError::Failed {
            source_file: source.display().to_string(),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(CompiledArtifact { dir, path })
}
