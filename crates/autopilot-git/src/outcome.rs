//! Classification of pull/push results.
//!
//! git reports most of what we care about only as prose, so this module is
//! a heuristic adapter: it scans the combined output for well-known phrases.
//! Everything above it works with [`Outcome`] and never looks at text.

use serde::Serialize;

use crate::gateway::GitOutput;

/// Closed set of outcomes the sync cycle reacts to.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    UpToDate,
    Conflict,
    Rejected,
    UnknownFailure,
}

impl Outcome {
    /// Whether the operation left the working copy in a usable, synced state.
    pub fn is_ok(self) -> bool {
        matches!(self, Outcome::Success | Outcome::UpToDate)
    }
}

const UP_TO_DATE: &[&str] = &["Already up to date", "Already up-to-date", "nothing to pull"];

const REJECTED: &[&str] = &["rejected", "behind", "non-fast-forward", "fetch first"];

fn is_up_to_date(text: &str) -> bool {
    UP_TO_DATE.iter().any(|p| text.contains(p))
        || (text.contains("Current branch") && text.contains("is up to date"))
}

/// Classify a pull or rebase result.
///
/// Conflict wins over everything else on failure, mirroring how a rebase
/// stops: the output may mention rejection hints too, but the work tree is
/// what needs attention.
pub fn classify(output: &GitOutput) -> Outcome {
    let text = output.combined();
    if output.success() {
        return if is_up_to_date(&text) {
            Outcome::UpToDate
        } else {
            Outcome::Success
        };
    }
    if text.contains("CONFLICT") || text.to_lowercase().contains("conflict") {
        return Outcome::Conflict;
    }
    if is_up_to_date(&text) {
        return Outcome::UpToDate;
    }
    if REJECTED.iter().any(|p| text.contains(p)) {
        return Outcome::Rejected;
    }
    Outcome::UnknownFailure
}

/// Classify a push result.
///
/// A push never stops on a conflict, and its output echoes ref names that
/// may contain any word, so only the rejection phrases are looked for.
pub fn classify_push(output: &GitOutput) -> Outcome {
    if output.success() {
        return Outcome::Success;
    }
    let text = output.combined();
    if REJECTED.iter().any(|p| text.contains(p)) {
        Outcome::Rejected
    } else {
        Outcome::UnknownFailure
    }
}
