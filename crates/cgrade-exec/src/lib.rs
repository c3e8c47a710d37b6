//! External process plumbing for the grader
//!
//! Everything that launches another program lives here:
//! - Timeout-bounded execution with full stdout/stderr capture
//! - Compiling the file under test into a temporary artifact
//! - Running clang-format in check mode and diffing against its output
//! - Reading the latest commit subject from git
//!
//! Every launched child is killed when its handle is dropped, so a timeout
//! never leaves a process behind.

pub mod process;
pub mod compiler;
pub mod formatter;
pub mod git;

pub use process::{run, ExecError, ProcessOutput, RunOptions};
pub use compiler::{compile, CompileError, CompileOptions, CompiledArtifact};
pub use formatter::{check_format, whitespace_diff, FormatOutcome};
pub use git::latest_commit_subject;
