//! Commit metadata lookup

use crate::process::{run, ExecError, RunOptions};
use std::path::Path;
use std::time::Duration;

/// Subject line of the most recent commit in `repo`.
///
/// Returns `Ok(None)` when git fails, e.g. outside a repository or with no commits.
pub async fn latest_commit_subject(repo: &Path, timeout: Duration) -> Result<Option<String>, ExecError> {
    let output = run(
        "git",
        ["log", "-1", "--pretty=%s"],
        &RunOptions::with_timeout(timeout).in_dir(repo),
    )
    .await?;

    if !output.success() {
        tracing::warn!(repo = %repo.display(), stderr = %output.stderr.trim(), "git log failed");
        return Ok(None);
    }

    let subject = output.stdout.trim();
    Ok((!subject.is_empty()).then(|| subject.to_string()))
}
