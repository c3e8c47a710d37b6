//! Configuration schema (cgrade.toml)
//!
//! Every check receives the configuration as an explicit value; nothing here
//! is read from global state.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lines in the expected program output
pub const OUTPUT_LINE_COUNT: usize = 13;

/// Literal grammar used to read a declared value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Plain decimal integer literal, e.g. `-42`
    Integer,

    /// Decimal or scientific literal with an optional one-letter suffix, e.g. `2.5e-3f`
    Float,
}

impl std::fmt::Display for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// A variable the student must declare with a literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Identifier as written in the source
    pub name: String,

    /// Literal grammar of the initializer
    pub kind: VariableKind,

    /// C type keyword that must precede the name (`int`, `double`, ...)
    pub type_keyword: String,

    /// The variable is used as a divisor and must not be zero
    #[serde(default)]
    pub divisor: bool,
}

impl VariableSpec {
    /// Create a new variable specification
    pub fn new(
        name: impl Into<String>,
        kind: VariableKind,
        type_keyword: impl Into<String>,
        divisor: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            type_keyword: type_keyword.into(),
            divisor,
        }
    }

    /// The four declarations of the arithmetic exercise
    pub fn arithmetic_defaults() -> Vec<Self> {
        vec![
            Self::new("a", VariableKind::Integer, "int", false),
            Self::new("b", VariableKind::Integer, "int", true),
            Self::new("c", VariableKind::Float, "double", false),
            Self::new("d", VariableKind::Float, "double", true),
        ]
    }
}

/// Structural rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Functions to check; empty means every function defined in the file
    pub functions: Vec<String>,

    /// Functions never checked when discovering
    pub exclude: Vec<String>,

    /// Language standard passed to the parser and compiler (`-std=`)
    pub language_standard: String,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
            exclude: vec!["main".to_string()],
            language_standard: "c99".to_string(),
        }
    }
}

/// Behavioral verification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// First checked output line (0-indexed)
    pub first_line: usize,

    /// Last checked output line (inclusive)
    pub last_line: usize,

    /// Absolute tolerance for floating point lines
    pub tolerance: f64,

    /// Separator line printed between the integer and float blocks
    pub separator: String,

    /// Number of separator lines the output must contain
    pub expected_separators: usize,

    /// Time limit for running the compiled program
    pub timeout_ms: u64,

    /// Declarations the expected output is derived from
    pub variables: Vec<VariableSpec>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            first_line: 0,
            last_line: 12,
            tolerance: 1e-5,
            separator: "==========".to_string(),
            expected_separators: 1,
            timeout_ms: 5_000,
            variables: VariableSpec::arithmetic_defaults(),
        }
    }
}

impl BehaviorConfig {
    /// Checked line indices in ascending order
    pub fn checked_lines(&self) -> std::ops::RangeInclusive<usize> {
        self.first_line..=self.last_line
    }

    /// Program time limit
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// External tool locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// C compiler used for the build check
    pub compiler: String,

    /// clang binary used as the parser front-end
    pub clang: String,

    /// clang-format binary
    pub clang_format: String,

    /// Time limit for every tool invocation
    pub tool_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compiler: "cc".to_string(),
            clang: "clang".to_string(),
            clang_format: "clang-format".to_string(),
            tool_timeout_ms: 30_000,
        }
    }
}

impl ToolsConfig {
    /// Tool time limit
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}

/// Commit message heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Minimum message length in characters
    pub min_length: usize,

    /// Minimum number of words longer than one character
    pub min_words: usize,

    /// A too-simple message fails the run instead of warning
    pub fail_on_simple: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            min_length: 10,
            min_words: 5,
            fail_on_simple: true,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Structural rules
    #[serde(default)]
    pub structure: StructureConfig,

    /// Behavioral verification
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Commit message rules
    #[serde(default)]
    pub commit: CommitConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Reject values no check can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let behavior = &self.behavior;

        if behavior.first_line > behavior.last_line {
            return Err(ConfigError::Invalid(format!(
                "behavior.first_line ({}) is after behavior.last_line ({})",
                behavior.first_line, behavior.last_line
            )));
        }

        if behavior.last_line >= OUTPUT_LINE_COUNT {
            return Err(ConfigError::Invalid(format!(
                "behavior.last_line ({}) is past the last output line ({})",
                behavior.last_line,
                OUTPUT_LINE_COUNT - 1
            )));
        }

        if !(behavior.tolerance.is_finite() && behavior.tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "behavior.tolerance must be a positive number, got {}",
                behavior.tolerance
            )));
        }

        if behavior.timeout_ms == 0 || self.tools.tool_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 ms".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &behavior.variables {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "variable '{}' is declared twice in behavior.variables",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
