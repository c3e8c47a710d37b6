//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Source declarations (1xxx)
    /// A required variable declaration was not found in the source
    MissingDeclaration,

    /// A divisor variable is zero, so the program is not executed
    DivisionByZeroPrecondition,

    // Structural rules (2xxx)
    /// The parser front-end reported an error
    ParseFailure,

    /// The function to check is not defined in the file under test
    FunctionNotFound,

    /// A loop or ternary operator was used where it is not allowed
    DisallowedConstruct,

    /// The function never uses an if statement
    MissingRequiredBranch,

    // Program behavior (3xxx)
    /// Program output ended before a checked line
    MissingOutputLine,

    /// The number of separator lines is wrong
    SeparatorCountMismatch,

    /// An integer line differs from the expected text
    OutputMismatch,

    /// A floating point line is numerically wrong
    NumericMismatch,

    /// A floating point line is not printed with the required format
    FormatMismatch,

    /// The program did not finish within the time limit
    ExecutionTimeout,

    /// The program exited with a non-zero status
    NonZeroExit,

    // Build and hygiene (4xxx)
    /// The source did not compile
    BuildFailure,

    /// clang-format would change the source
    StyleFormatViolation,

    /// The latest commit message is not descriptive
    CommitMessageTooSimple,

    /// An external tool could not be launched
    ToolFailure,

    // General (9xxx)
    /// General informational message
    Info,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDeclaration => "MISSING_DECLARATION",
            Self::DivisionByZeroPrecondition => "DIVISION_BY_ZERO_PRECONDITION",
            Self::ParseFailure => "PARSE_FAILURE",
            Self::FunctionNotFound => "FUNCTION_NOT_FOUND",
            Self::DisallowedConstruct => "DISALLOWED_CONSTRUCT",
            Self::MissingRequiredBranch => "MISSING_REQUIRED_BRANCH",
            Self::MissingOutputLine => "MISSING_OUTPUT_LINE",
            Self::SeparatorCountMismatch => "SEPARATOR_COUNT_MISMATCH",
            Self::OutputMismatch => "OUTPUT_MISMATCH",
            Self::NumericMismatch => "NUMERIC_MISMATCH",
            Self::FormatMismatch => "FORMAT_MISMATCH",
            Self::ExecutionTimeout => "EXECUTION_TIMEOUT",
            Self::NonZeroExit => "NON_ZERO_EXIT",
            Self::BuildFailure => "BUILD_FAILURE",
            Self::StyleFormatViolation => "STYLE_FORMAT_VIOLATION",
            Self::CommitMessageTooSimple => "COMMIT_MESSAGE_TOO_SIMPLE",
            Self::ToolFailure => "TOOL_FAILURE",
            Self::Info => "INFO",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the submission fails
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as given to the grader
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,

    /// How to fix the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Captured tool output (stderr, parser diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
            hint: None,
            details: None,
        }
    }

    /// Shorthand for an error-severity diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    /// Set the remediation hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach captured tool output
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.trim().is_empty() {
            self.details = Some(details);
        }
        self
    }
}
