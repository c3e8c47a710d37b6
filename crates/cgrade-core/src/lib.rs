//! cgrade Core
//!
//! Core domain model with stable, versioned types shared by every grading check.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{
    BehaviorConfig, CommitConfig, Config, ConfigError, StructureConfig, ToolsConfig,
    VariableKind, VariableSpec,
};
