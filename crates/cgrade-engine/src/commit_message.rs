//! Heuristics for non-descriptive commit messages

use cgrade_core::{CommitConfig, Diagnostic, DiagnosticCode, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Why a message counts as too simple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimplicityReason {
    /// The web editor's default `Update <file>` message
    DefaultUpdateMessage,

    /// A bare `fix`/`changed`/`edit`, optionally numbered
    BareFix,

    /// Nothing but digits
    DigitsOnly,

    /// Fewer characters than the configured minimum
    TooShort,

    /// Fewer words (longer than one character) than the configured minimum
    TooFewWords,
}

impl std::fmt::Display for SimplicityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultUpdateMessage => write!(f, "default \"Update <file>\" message"),
            Self::BareFix => write!(f, "bare fix/change message"),
            Self::DigitsOnly => write!(f, "digits only"),
            Self::TooShort => write!(f, "too short"),
            Self::TooFewWords => write!(f, "too few words"),
        }
    }
}

fn update_one_filename() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(update\s*[a-zA-Z0-9_-]+(?:\.[a-zA-Z0-9]+)?)[-\s\.]*\d*[-\s\.]*?$")
            .expect("update pattern is valid")
    })
}

fn bare_fix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(fix|fixed|change|changed|edit|modified|수정|변경)\s*\d*$")
            .expect("fix pattern is valid")
    })
}

/// Every rule the message breaks, in a fixed order
pub fn simplicity_reasons(message: &str, rules: &CommitConfig) -> Vec<SimplicityReason> {
    let message = message.trim();
    let mut reasons = Vec::new();

    if update_one_filename().is_match(message) {
        reasons.push(SimplicityReason::DefaultUpdateMessage);
    }
    if bare_fix().is_match(message) {
        reasons.push(SimplicityReason::BareFix);
    }
    if !message.is_empty() && message.chars().all(|c| c.is_ascii_digit()) {
        reasons.push(SimplicityReason::DigitsOnly);
    }
    if message.chars().count() < rules.min_length {
        reasons.push(SimplicityReason::TooShort);
    }

    let words = message
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .count();
    if words < rules.min_words {
        reasons.push(SimplicityReason::TooFewWords);
    }

    reasons
}

/// Whether the message breaks any rule
pub fn is_too_simple(message: &str, rules: &CommitConfig) -> bool {
    !simplicity_reasons(message, rules).is_empty()
}

/// Diagnostic for a non-descriptive message, `None` when the message is fine.
///
/// An error unless `rules.fail_on_simple` is off, then a warning.
pub fn check_commit_message(message: &str, rules: &CommitConfig) -> Option<Diagnostic> {
    let reasons = simplicity_reasons(message, rules);
    if reasons.is_empty() {
        return None;
    }

    let reasons = reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    tracing::info!(message = message.trim(), %reasons, "commit message too simple");

    let severity = if rules.fail_on_simple {
        Severity::Error
    } else {
        Severity::Warn
    };

    Some(
        Diagnostic::new(
            DiagnosticCode::CommitMessageTooSimple,
            severity,
            format!("Please use a more descriptive commit message: {}", message.trim()),
        )
        .with_details(reasons)
        .with_hint("Summarize what changed and why in at least a short sentence. See https://cbea.ms/git-commit/"),
    )
}
