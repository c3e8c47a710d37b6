//! clang-format compliance check
//!
//! A failing file is reported with a unified diff against clang-format's
//! output, spaces drawn as `·` and tabs as `→`.

use crate::process::{run, ExecError, RunOptions};
use cgrade_core::{Diagnostic, DiagnosticCode, Location};
use similar::TextDiff;
use std::path::Path;
use std::time::Duration;

/// Result of running clang-format in check mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// The file is already formatted
    Clean,

    /// clang-format would change the file
    Violations {
        /// clang-format's own `--dry-run` report
        report: String,

        /// Visible-whitespace diff, empty when the formatted text was unavailable
        diff: String,
    },
}

impl FormatOutcome {
    /// Diagnostic for a file needing reformatting, `None` when clean.
    ///
    /// The fix command names `source` relative to `workspace` when it lies inside it.
    pub fn to_diagnostic(&self, source: &Path, workspace: &Path) -> Option<Diagnostic> {
        let Self::Violations { report, diff } = self else {
            return None;
        };

        let relative = source.strip_prefix(workspace).unwrap_or(source);
        let details = if diff.is_empty() {
            format!(
                "No diff available (ensure clang-format is installed).\n{}",
                report
            )
        } else {
            format!("Suggested changes (diff, · = space, → = tab):\n{}", diff)
        };

        Some(
            Diagnostic::error(
                DiagnosticCode::StyleFormatViolation,
                "clang-format detected formatting issues in your code",
            )
            .with_location(Location::new(source.display().to_string()))
            .with_details(details)
            .with_hint(format!(
                "To fix, run: clang-format -i {}\n\
                 Ensure your .clang-format file matches the assignment's style (e.g., Google).",
                relative.display()
            )),
        )
    }
}

fn show_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| format!("{}\n", line.replace(' ', "·").replace('\t', "→")))
        .collect()
}

/// Unified diff from `original` to `formatted` with visible whitespace
pub fn whitespace_diff(original: &str, formatted: &str, source_name: &str) -> String {
    let before = show_whitespace(original);
    let after = show_whitespace(formatted);

    let diff = TextDiff::from_lines(&before, &after);
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(source_name, &format!("{}.formatted", source_name))
        .to_string();
    rendered
}

/// Run `clang-format --dry-run --Werror` on `source`, diffing against the
/// formatted text when it fails
pub async fn check_format(
    clang_format: &str,
    source: &Path,
    timeout: Duration,
) -> Result<FormatOutcome, ExecError> {
    let source_arg = source.to_string_lossy().into_owned();
    let options = RunOptions::with_timeout(timeout);

    let output = run(clang_format, ["--dry-run", "--Werror", source_arg.as_str()], &options).await?;
    if output.success() {
        return Ok(FormatOutcome::Clean);
    }

    tracing::info!(source = %source.display(), "formatting violations found");

    let formatted = run(clang_format, [source_arg.as_str()], &options).await?;
    let diff = match (formatted.success(), std::fs::read_to_string(source)) {
        (true, Ok(original)) => whitespace_diff(&original, &formatted.stdout, &source_arg),
        (_, Err(e)) => {
            tracing::warn!(source = %source.display(), error = %e, "could not read source for diff");
            String::new()
        }
        (false, _) => {
            tracing::warn!(status = %formatted.status, "clang-format did not produce formatted output");
            String::new()
        }
    };

    Ok(FormatOutcome::Violations {
        report: output.stderr,
        diff,
    })
}
