//! Runs the individual checks against one submission and collects their diagnostics

use anyhow::{Context, Result};
use cgrade_ast::{ClangFrontEnd, FrontEnd, SyntaxTree};
use cgrade_core::{Config, Diagnostic, DiagnosticCode, Location, Report, Severity};
use cgrade_engine::{
    check_all, check_commit_message, check_preconditions, extract_variables, verify_process,
};
use cgrade_exec::{check_format, compile, latest_commit_subject, CompileOptions, CompiledArtifact};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All `.c` files under `folder`, sorted
pub fn find_c_sources(folder: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("c"))
        .map(|e| e.into_path())
        .collect();
    sources.sort();
    sources
}

/// Locate the file under test, explaining what was found when it is missing
pub fn resolve_source(src_folder: &Path, filename: &str) -> Result<PathBuf> {
    if !src_folder.is_dir() {
        anyhow::bail!("Source folder {} does not exist", src_folder.display());
    }

    let sources = find_c_sources(src_folder);
    if sources.is_empty() {
        anyhow::bail!("No C source files found in {}", src_folder.display());
    }

    let path = src_folder.join(filename);
    if !path.is_file() {
        let found: Vec<String> = sources
            .iter()
            .take(5)
            .map(|p| p.display().to_string())
            .collect();
        anyhow::bail!(
            "{} not found. C files in {}: {}",
            path.display(),
            src_folder.display(),
            found.join(", ")
        );
    }

    Ok(path)
}

/// Check runner for one file under test
pub struct Grader<'a> {
    config: &'a Config,
    source: PathBuf,
}

impl<'a> Grader<'a> {
    pub fn new(config: &'a Config, source: impl Into<PathBuf>) -> Self {
        Self {
            config,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn source_name(&self) -> String {
        self.source.display().to_string()
    }

    fn read_source(&self) -> Result<String> {
        std::fs::read_to_string(&self.source)
            .with_context(|| format!("Failed to read {}", self.source.display()))
    }

    /// Parse with the configured clang front-end
    pub async fn parse(&self) -> Result<SyntaxTree, Diagnostic> {
        let front_end = ClangFrontEnd::new(&self.config.tools.clang, self.config.tools.timeout());
        tracing::debug!(front_end = front_end.name(), "parsing submission");

        front_end
            .parse(&self.source, &self.config.structure.language_standard)
            .await
            .map_err(|e| e.to_diagnostic(&self.source))
    }

    /// Structural rules for every configured or discovered function
    pub async fn structure(&self, report: &mut Report) {
        let tree = match self.parse().await {
            Ok(tree) => tree,
            Err(diag) => {
                report.add_diagnostic(diag);
                return;
            }
        };

        let verdicts = check_all(&tree, &self.config.structure);
        if verdicts.is_empty() {
            report.add_diagnostic(
                Diagnostic::new(
                    DiagnosticCode::Info,
                    Severity::Info,
                    "No functions to check besides the excluded ones",
                )
                .with_location(Location::new(self.source_name())),
            );
        }

        let file = self.source_name();
        for verdict in &verdicts {
            report.summary.functions_checked += 1;
            report.extend(verdict.to_diagnostics(&file));
        }
    }

    /// Compile the submission, recording a diagnostic on failure
    pub async fn build(&self, report: &mut Report) -> Option<CompiledArtifact> {
        let options = CompileOptions {
            compiler: self.config.tools.compiler.clone(),
            language_standard: self.config.structure.language_standard.clone(),
            extra_flags: Vec::new(),
            timeout: self.config.tools.timeout(),
        };

        match compile(&self.source, &options).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                report.add_diagnostic(e.to_diagnostic());
                None
            }
        }
    }

    /// Extract the declared values, build, run, and compare the output.
    ///
    /// Zero divisors are rejected before anything is compiled.
    pub async fn behavior(&self, report: &mut Report) -> Result<()> {
        let file = self.source_name();
        let behavior = &self.config.behavior;
        let text = self.read_source()?;

        let vars = match extract_variables(&text, &behavior.variables) {
            Ok(vars) => vars,
            Err(e) => {
                report.add_diagnostic(e.to_diagnostic(&file));
                return Ok(());
            }
        };

        if let Err(e) = check_preconditions(&vars, &behavior.variables) {
            report.add_diagnostic(e.to_diagnostic(&file));
            return Ok(());
        }

        let Some(artifact) = self.build(report).await else {
            return Ok(());
        };

        let output = match artifact.execute(behavior.timeout()).await {
            Ok(output) => output,
            Err(e) => {
                report.add_diagnostic(e.to_diagnostic().with_location(Location::new(file.clone())));
                return Ok(());
            }
        };

        match verify_process(&output, &vars, behavior) {
            Ok(verdict) => {
                report.summary.lines_checked += behavior.checked_lines().count();
                report.extend(verdict.to_diagnostics(&file));
            }
            Err(e) => report.add_diagnostic(e.to_diagnostic(&file)),
        }

        Ok(())
    }

    /// clang-format compliance; the fix command is shown relative to `workspace`
    pub async fn format(&self, report: &mut Report, workspace: &Path) {
        let tools = &self.config.tools;
        match check_format(&tools.clang_format, &self.source, tools.timeout()).await {
            Ok(outcome) => {
                if let Some(diag) = outcome.to_diagnostic(&self.source, workspace) {
                    report.add_diagnostic(diag);
                }
            }
            Err(e) => report.add_diagnostic(e.to_diagnostic()),
        }
    }

    /// Commit message heuristics on `message`, or on the latest commit in `workspace`
    pub async fn commit_message(&self, report: &mut Report, workspace: &Path, message: Option<String>) {
        let message = match message {
            Some(message) => Some(message),
            None => match latest_commit_subject(workspace, self.config.tools.timeout()).await {
                Ok(subject) => subject,
                Err(e) => {
                    report.add_diagnostic(e.to_diagnostic());
                    return;
                }
            },
        };

        let Some(message) = message else {
            report.add_diagnostic(Diagnostic::new(
                DiagnosticCode::Info,
                Severity::Info,
                format!("No commit found in {}", workspace.display()),
            ));
            return;
        };

        if let Some(diag) = check_commit_message(&message, &self.config.commit) {
            report.add_diagnostic(diag);
        }
    }
}
