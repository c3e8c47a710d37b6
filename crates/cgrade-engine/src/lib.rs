//! cgrade engine - conformance checks for C submissions
//!
//! This crate implements the grading logic:
//! - Structural rules: which control-flow constructs a function uses
//! - Variable extraction from literal declarations in the source
//! - The golden output model derived from those values
//! - Behavioral verification of a program's output (exact, tolerance, format)
//! - Commit message heuristics
//!
//! Every check is a pure function of its inputs and explicit configuration.

pub mod structural;
pub mod variables;
pub mod expected_output;
pub mod behavior;
pub mod commit_message;

pub use structural::{check_all, check_function, discover_functions, Construct, ConstructOccurrence, StructuralVerdict};
pub use variables::{extract_variables, ExtractedVariable, ExtractionError, VariableMap};
pub use expected_output::{compute_expected_line, ExpectedOutputModel, LineKind, ModelError};
pub use behavior::{
    check_preconditions, verify_behavior, verify_process, BehaviorError, BehaviorFailure,
    BehaviorVerdict, ComparisonMode, LineComparisonResult,
};
pub use commit_message::{check_commit_message, is_too_simple, simplicity_reasons, SimplicityReason};
