//! Behavioral verification of a program's standard output
//!
//! Integer lines and the separator are compared byte for byte. Float lines are
//! compared twice, once by value within a tolerance and once against the
//! required `%.8f` presentation, and each comparison is reported on its own.

use crate::expected_output::{ExpectedOutputModel, LineKind, ModelError, DIVISORS};
use crate::variables::VariableMap;
use cgrade_core::{BehaviorConfig, Diagnostic, DiagnosticCode, Location, VariableKind, VariableSpec};
use cgrade_exec::ProcessOutput;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How an output line is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Byte-identical, newline included
    Exact,

    /// Right-hand sides parsed as numbers and compared within the tolerance
    NumericTolerance,

    /// `<label> = <sign><digits>.<8 digits>`
    FormatPattern,
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::NumericTolerance => write!(f, "numeric tolerance"),
            Self::FormatPattern => write!(f, "format pattern"),
        }
    }
}

/// One comparison of one output line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineComparisonResult {
    /// 0-indexed output line
    pub index: usize,
    pub mode: ComparisonMode,
    pub passed: bool,

    /// Expected line, trailing newline included
    pub expected: String,

    /// Actual line as printed, trailing newline included when present
    pub actual: String,
}

/// Output-level failures that are not a single line comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorFailure {
    /// The output ended before a checked line
    MissingOutputLine { index: usize, expected: String },

    /// Wrong number of separator lines
    SeparatorCountMismatch { expected: usize, actual: usize },

    /// The program did not exit with status zero
    NonZeroExit { status: String, stderr: String },
}

/// Everything found while checking one program run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorVerdict {
    /// Per-line comparisons in line order (a float line appears twice)
    pub comparisons: Vec<LineComparisonResult>,

    /// Output-level failures
    pub failures: Vec<BehaviorFailure>,
}

impl BehaviorVerdict {
    /// No failure and every comparison passed
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.comparisons.iter().all(|c| c.passed)
    }

    /// Failed comparisons only
    pub fn mismatches(&self) -> impl Iterator<Item = &LineComparisonResult> {
        self.comparisons.iter().filter(|c| !c.passed)
    }

    /// One diagnostic per failure and per failed comparison
    pub fn to_diagnostics(&self, source_file: &str) -> Vec<Diagnostic> {
        let location = || Location::new(source_file);
        let mut diagnostics = Vec::new();

        for failure in &self.failures {
            let diag = match failure {
                BehaviorFailure::NonZeroExit { status, stderr } => Diagnostic::error(
                    DiagnosticCode::NonZeroExit,
                    format!("Program terminated abnormally ({})", status),
                )
                .with_details(stderr.clone())
                .with_hint("Make sure main returns 0 and the program does not crash."),
                BehaviorFailure::MissingOutputLine { index, expected } => Diagnostic::error(
                    DiagnosticCode::MissingOutputLine,
                    format!("Output line {} is missing", index),
                )
                .with_comparison(expected.trim_end_matches('\n'), "")
                .with_hint("Print every required line, each terminated by a newline."),
                BehaviorFailure::SeparatorCountMismatch { expected, actual } => Diagnostic::error(
                    DiagnosticCode::SeparatorCountMismatch,
                    format!("Expected {} separator line(s) but found {}", expected, actual),
                )
                .with_comparison(expected.to_string(), actual.to_string()),
            };
            diagnostics.push(diag.with_location(location()));
        }

        for result in self.mismatches() {
            let (code, message, hint) = match result.mode {
                ComparisonMode::Exact => (
                    DiagnosticCode::OutputMismatch,
                    format!("Output line {} does not match the expected text", result.index),
                    "Check the arithmetic and print the line exactly as shown.",
                ),
                ComparisonMode::NumericTolerance => (
                    DiagnosticCode::NumericMismatch,
                    format!("Output line {} has the wrong value", result.index),
                    "Check the floating point arithmetic.",
                ),
                ComparisonMode::FormatPattern => (
                    DiagnosticCode::FormatMismatch,
                    format!("Output line {} is not formatted with 8 decimal places", result.index),
                    "Print floating point values with %.8f.",
                ),
            };

            diagnostics.push(
                Diagnostic::error(code, message)
                    .with_location(location())
                    .with_comparison(
                        result.expected.trim_end_matches('\n'),
                        result.actual.trim_end_matches('\n'),
                    )
                    .with_hint(hint),
            );
        }

        diagnostics
    }
}

/// Reasons the output cannot be checked at all
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BehaviorError {
    #[error("variable '{name}' is 0 and is used as a divisor")]
    DivisionByZeroPrecondition { name: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid output pattern for line {index}: {message}")]
    Pattern { index: usize, message: String },
}

impl BehaviorError {
    /// Convert to a grading diagnostic
    pub fn to_diagnostic(&self, source_file: &str) -> Diagnostic {
        let location = Location::new(source_file);
        match self {
            Self::DivisionByZeroPrecondition { name } => Diagnostic::error(
                DiagnosticCode::DivisionByZeroPrecondition,
                format!("Division by zero: variable '{}' must not be 0", name),
            )
            .with_location(location)
            .with_hint(format!("Give '{}' a non-zero value.", name)),
            Self::Model(ModelError::MissingVariable(name)) => Diagnostic::error(
                DiagnosticCode::MissingDeclaration,
                self.to_string(),
            )
            .with_location(location)
            .with_hint(format!("Declare '{}' with a literal value.", name)),
            Self::Model(ModelError::DivisionByZero(name)) => {
                Diagnostic::error(DiagnosticCode::DivisionByZeroPrecondition, self.to_string())
                    .with_location(location)
                    .with_hint(format!("Give '{}' a non-zero value.", name))
            }
            Self::Model(ModelError::IndexOutOfRange(_)) | Self::Pattern { .. } => {
                Diagnostic::error(DiagnosticCode::OutputMismatch, self.to_string()).with_location(location)
            }
        }
    }
}

fn is_zero(kind: VariableKind, value: f64) -> bool {
    match kind {
        // `int` truncates
        VariableKind::Integer => value.trunc() == 0.0,
        VariableKind::Float => value == 0.0,
    }
}

/// Reject divisor variables that are zero.
///
/// `b` and `d` are always divisors of the expected output; variables flagged
/// `divisor` in the configuration are checked as well. Runs before any program
/// is executed.
pub fn check_preconditions(vars: &VariableMap, specs: &[VariableSpec]) -> Result<(), BehaviorError> {
    let flagged = specs
        .iter()
        .filter(|s| s.divisor && !DIVISORS.iter().any(|(name, _)| *name == s.name))
        .map(|s| (s.name.as_str(), s.kind));

    for (name, kind) in DIVISORS.into_iter().chain(flagged) {
        if let Some(value) = vars.value(name) {
            if is_zero(kind, value) {
                tracing::info!(name, "divisor is zero");
                return Err(BehaviorError::DivisionByZeroPrecondition {
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn rhs_value(line: &str) -> Option<f64> {
    let (_, rhs) = line.split_once('=')?;
    rhs.trim().parse().ok()
}

fn format_pattern(index: usize) -> Result<Regex, BehaviorError> {
    let label = ExpectedOutputModel::label(index)?;
    Regex::new(&format!(r"^{} = [+-]?\d+\.\d{{8}}$", regex::escape(label))).map_err(|e| {
        BehaviorError::Pattern {
            index,
            message: e.to_string(),
        }
    })
}

/// Compare captured standard output with the expected output.
///
/// Fails early only when the output cannot be checked (zero divisor, missing
/// variable). Every other problem is collected into the verdict.
pub fn verify_behavior(
    actual_output: &str,
    vars: &VariableMap,
    config: &BehaviorConfig,
) -> Result<BehaviorVerdict, BehaviorError> {
    check_preconditions(vars, &config.variables)?;
    let model = ExpectedOutputModel::from_variables(vars)?;

    let lines: Vec<&str> = actual_output.split_inclusive('\n').collect();
    let mut verdict = BehaviorVerdict::default();

    tracing::info!(lines = lines.len(), "verifying program output");

    let separator = config.separator.trim();
    let separators = lines.iter().filter(|line| line.trim() == separator).count();
    if separators != config.expected_separators {
        verdict.failures.push(BehaviorFailure::SeparatorCountMismatch {
            expected: config.expected_separators,
            actual: separators,
        });
    }

    for index in config.checked_lines() {
        let expected = model.line(index)?;

        let Some(actual) = lines.get(index).copied() else {
            tracing::debug!(index, "output line missing");
            verdict.failures.push(BehaviorFailure::MissingOutputLine { index, expected });
            continue;
        };

        let mut compare = |mode: ComparisonMode, passed: bool| {
            tracing::debug!(index, %mode, passed, "compared output line");
            verdict.comparisons.push(LineComparisonResult {
                index,
                mode,
                passed,
                expected: expected.clone(),
                actual: actual.to_string(),
            });
        };

        match ExpectedOutputModel::line_kind(index)? {
            LineKind::Integer | LineKind::Separator => {
                compare(ComparisonMode::Exact, actual == expected);
            }
            LineKind::Float => {
                let close = match (rhs_value(&expected), rhs_value(actual)) {
                    (Some(e), Some(a)) => (e - a).abs() < config.tolerance,
                    _ => false,
                };
                compare(ComparisonMode::NumericTolerance, close);

                let formatted = format_pattern(index)?.is_match(actual.trim_end_matches('\n'));
                compare(ComparisonMode::FormatPattern, formatted);
            }
        }
    }

    tracing::info!(
        passed = verdict.passed(),
        failures = verdict.failures.len(),
        mismatches = verdict.mismatches().count(),
        "finished verifying output"
    );

    Ok(verdict)
}

/// Verify a finished run: exit status first, then the output.
///
/// A non-zero exit is always a failure, and the output is still compared so
/// every problem is reported at once.
pub fn verify_process(
    output: &ProcessOutput,
    vars: &VariableMap,
    config: &BehaviorConfig,
) -> Result<BehaviorVerdict, BehaviorError> {
    let mut verdict = verify_behavior(&output.stdout, vars, config)?;

    if !output.success() {
        tracing::info!(status = %output.status, "program exited abnormally");
        verdict.failures.insert(
            0,
            BehaviorFailure::NonZeroExit {
                status: output.status.clone(),
                stderr: output.stderr.clone(),
            },
        );
    }

    Ok(verdict)
}
