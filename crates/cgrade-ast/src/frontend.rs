//! Parser front-end contract and its diagnostics

use crate::tree::SyntaxTree;
use cgrade_core::{Diagnostic, DiagnosticCode, Location};
use cgrade_exec::ExecError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Severity reported by the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrontEndSeverity {
    Note,
    Warning,
    Error,
    Fatal,
}

impl FrontEndSeverity {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "note" => Some(Self::Note),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "fatal error" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Whether this severity aborts the check
    pub fn is_error(&self) -> bool {
        *self >= Self::Error
    }
}

/// One `file:line:col: severity: message` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontEndDiagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub severity: FrontEndSeverity,
    pub message: String,
}

impl std::fmt::Display for FrontEndDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
    }
}

fn diagnostic_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?):(\d+):(\d+): (note|warning|error|fatal error): (.*)$")
            .expect("diagnostic pattern is valid")
    })
}

/// Extract compiler-style diagnostics from a front-end's stderr.
///
/// Lines that are not diagnostics (source excerpts, carets, summaries) are skipped.
pub fn parse_diagnostics(stderr: &str) -> Vec<FrontEndDiagnostic> {
    stderr
        .lines()
        .filter_map(|line| {
            let caps = diagnostic_line().captures(line)?;
            Some(FrontEndDiagnostic {
                file: caps[1].to_string(),
                line: caps[2].parse().ok()?,
                column: caps[3].parse().ok()?,
                severity: FrontEndSeverity::parse(&caps[4])?,
                message: caps[5].to_string(),
            })
        })
        .collect()
}

/// Why a source file could not be turned into a tree
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("parse errors in code:\n{}", format_errors(.0))]
    Errors(Vec<FrontEndDiagnostic>),

    #[error(transparent)]
    Tool(#[from] ExecError),

    #[error("front-end produced unusable output: {0}")]
    InvalidOutput(String),
}

fn format_errors(errors: &[FrontEndDiagnostic]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

impl ParseFailure {
    /// Convert to a grading diagnostic
    pub fn to_diagnostic(&self, source: &Path) -> Diagnostic {
        match self {
            Self::Tool(err) => err.to_diagnostic(),
            Self::Errors(errors) => {
                let mut diag = Diagnostic::error(
                    DiagnosticCode::ParseFailure,
                    format!("{} could not be parsed", source.display()),
                )
                .with_details(format_errors(errors))
                .with_hint("Ensure your code compiles and uses only allowed headers (stdio.h).");

                if let Some(first) = errors.first() {
                    diag = diag.with_location(Location::with_line(first.file.clone(), first.line));
                }
                diag
            }
            Self::InvalidOutput(_) => {
                Diagnostic::error(DiagnosticCode::ParseFailure, self.to_string())
                    .with_location(Location::new(source.display().to_string()))
            }
        }
    }
}

/// Anything that can turn a C source file into a [`SyntaxTree`]
#[async_trait::async_trait]
pub trait FrontEnd: Send + Sync {
    /// Front-end name for logs
    fn name(&self) -> &'static str;

    /// Parse `source` with the given `-std=` value.
    ///
    /// Any diagnostic of error severity must fail with [`ParseFailure::Errors`].
    async fn parse(&self, source: &Path, language_standard: &str) -> Result<SyntaxTree, ParseFailure>;
}
