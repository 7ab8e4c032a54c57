use serde::{Deserialize, Serialize};

/// Maximum length of a commit subject, decoration excluded.
pub const MAX_MESSAGE_CHARS: usize = 72;

/// Message used when a group arrives without one.
pub const DEFAULT_GROUP_MESSAGE: &str = "Update files";

/// Message for the synthetic group that restores coverage.
pub const REMAINING_FILES_MESSAGE: &str = "Update remaining files";

/// Message for staged leftovers committed after every group ran.
pub const UNCATEGORIZED_MESSAGE: &str = "Update uncategorized files";

// ── Change records ──

/// Parsed form of a porcelain status code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unmerged,
    Untracked,
    Ignored,
    Other,
}

impl ChangeStatus {
    /// Classify a two-column porcelain code (`XY`).
    ///
    /// The index column wins over the worktree column, except for the
    /// two-character codes git reserves for untracked, ignored and unmerged
    /// entries.
    pub fn from_code(code: &str) -> Self {
        let mut chars = code.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');
        match (x, y) {
            ('?', '?') => ChangeStatus::Untracked,
            ('!', '!') => ChangeStatus::Ignored,
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => ChangeStatus::Unmerged,
            _ => {
                let primary = if x == ' ' { y } else { x };
                match primary {
                    'A' => ChangeStatus::Added,
                    'M' => ChangeStatus::Modified,
                    'D' => ChangeStatus::Deleted,
                    'R' => ChangeStatus::Renamed,
                    'C' => ChangeStatus::Copied,
                    'T' => ChangeStatus::TypeChanged,
                    _ => ChangeStatus::Other,
                }
            }
        }
    }
}

/// One changed file in the working copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub status: ChangeStatus,
    /// Raw porcelain code, trimmed (e.g. `M`, `??`, `RM`).
    pub code: String,
    /// Canonical path; for renames this is the destination.
    pub path: String,
    /// Source path of a rename or copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_path: Option<String>,
}

impl ChangeRecord {
    pub fn new(code: &str, path: impl Into<String>) -> Self {
        let code = code.trim();
        Self {
            status: ChangeStatus::from_code(code),
            code: code.to_string(),
            path: path.into(),
            orig_path: None,
        }
    }

    pub fn with_orig_path(mut self, orig: impl Into<String>) -> Self {
        self.orig_path = Some(orig.into());
        self
    }
}

// ── Commit groups ──

/// A set of files that will land in one commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitGroup {
    pub files: Vec<String>,
    pub message: String,
}

impl CommitGroup {
    pub fn new(files: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            files,
            message: message.into(),
        }
    }
}

/// Reduce a proposed message to a single undecorated subject line.
pub fn normalize_message(raw: &str) -> String {
    let first = raw.lines().map(str::trim).find(|l| !l.is_empty());
    match first {
        Some(line) => crate::text::truncate_chars(line, MAX_MESSAGE_CHARS)
            .trim_end()
            .to_string(),
        None => DEFAULT_GROUP_MESSAGE.to_string(),
    }
}

// ── Cycle outcome ──

/// What one sync cycle achieved.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleResult {
    pub pulled: bool,
    pub commits_created: usize,
    pub pushed: bool,
}

impl std::fmt::Display for CycleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |ok: bool| if ok { "ok" } else { "failed" };
        write!(
            f,
            "pull {}, {} commit(s), push {}",
            mark(self.pulled),
            self.commits_created,
            if self.commits_created == 0 {
                "skipped"
            } else {
                mark(self.pushed)
            }
        )
    }
}
