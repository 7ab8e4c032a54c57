use std::collections::HashSet;

use autopilot_assist::{AssistRequest, Assistant, ModelTier};
use autopilot_core::text::{strip_code_fence, truncate_chars};
use autopilot_core::Settings;
use autopilot_git::GitOps;
use serde::Serialize;
use tracing::{info, warn};

const ADD_ERROR_EXCERPT: usize = 200;

pub const OURS_MARKER: &str = "<<<<<<<";
pub const SEPARATOR_MARKER: &str = "=======";
pub const THEIRS_MARKER: &str = ">>>>>>>";

fn is_marker(line: &str) -> bool {
    line.starts_with(OURS_MARKER)
        || line.starts_with(SEPARATOR_MARKER)
        || line.starts_with(THEIRS_MARKER)
}

/// A file is in conflict iff any line starts with a marker.
pub fn has_conflict_markers(text: &str) -> bool {
    text.lines().any(is_marker)
}

/// Line content without its terminator, used for set-style comparison.
fn line_key(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    CollectingOurs,
    CollectingTheirs,
}

/// Deterministic union merge of every conflict region.
///
/// Each region becomes all of "ours" followed by the "theirs" lines not
/// already present in "ours". Markers out of sequence are plain text; a
/// region still open at end of input is emitted verbatim. Always terminates.
pub fn union_merge(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut mode = Mode::Normal;
    // Marker lines of the open region, kept so it can be emitted verbatim.
    let mut open_marker = "";
    let mut separator = "";
    let mut ours: Vec<&str> = Vec::new();
    let mut theirs: Vec<&str> = Vec::new();

    for line in text.split_inclusive('\n') {
        if line.starts_with(OURS_MARKER) {
            flush_open(&mut out, mode, open_marker, separator, &ours, &theirs);
            mode = Mode::CollectingOurs;
            open_marker = line;
            ours.clear();
            theirs.clear();
        } else if line.starts_with(SEPARATOR_MARKER) && mode == Mode::CollectingOurs {
            mode = Mode::CollectingTheirs;
            separator = line;
            theirs.clear();
        } else if line.starts_with(THEIRS_MARKER) && mode == Mode::CollectingTheirs {
            let seen: HashSet<&str> = ours.iter().map(|l| line_key(l)).collect();
            for l in &ours {
                push_line(&mut out, l);
            }
            for l in theirs.iter().filter(|l| !seen.contains(line_key(l))) {
                push_line(&mut out, l);
            }
            mode = Mode::Normal;
            ours.clear();
            theirs.clear();
        } else {
            match mode {
                Mode::Normal => out.push_str(line),
                Mode::CollectingOurs => ours.push(line),
                Mode::CollectingTheirs => theirs.push(line),
            }
        }
    }
    flush_open(&mut out, mode, open_marker, separator, &ours, &theirs);
    out
}

/// Emit a region that never closed exactly as it appeared.
fn flush_open(out: &mut String, mode: Mode, open: &str, sep: &str, ours: &[&str], theirs: &[&str]) {
    if mode == Mode::Normal {
        return;
    }
    out.push_str(open);
    ours.iter().for_each(|l| out.push_str(l));
    if mode == Mode::CollectingTheirs {
        out.push_str(sep);
        theirs.iter().for_each(|l| out.push_str(l));
    }
}

/// Append a region line, giving an unterminated last line its newline so
/// it cannot fuse with whatever follows.
fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
}

/// Prompt asking the assistant to resolve one conflicted file.
pub fn conflict_prompt(content: &str, char_limit: usize) -> String {
    format!(
        "You are an expert at resolving git merge conflicts.\n\
         Here is a file containing git conflict markers:\n\n\
         ```\n{}\n```\n\n\
         Resolve the conflict:\n\
         - Keep ALL meaningful changes from both sides\n\
         - Remove ALL conflict markers (<<<<<<<, =======, >>>>>>>)\n\
         - If both sides make the same change, keep a single copy\n\
         - Return ONLY the resolved file content, without explanations\n",
        truncate_chars(content, char_limit)
    )
}

/// How a file's conflict was settled.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Assistant,
    UnionMerge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: String,
    pub strategy: Strategy,
}

/// Resolves conflicted files: assistant first, union merge as fallback.
pub struct ConflictResolver<'a> {
    assistant: Option<&'a dyn Assistant>,
    char_limit: usize,
    max_tokens: u32,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(assistant: Option<&'a dyn Assistant>, settings: &Settings) -> Self {
        Self {
            assistant,
            char_limit: settings.diff_char_limit,
            max_tokens: settings.max_tokens_resolve,
        }
    }

    /// Resolved text for one file. Never fails.
    pub fn resolve_text(&self, path: &str, content: &str) -> Resolution {
        if let Some(text) = self.ask_assistant(path, content) {
            return Resolution {
                text,
                strategy: Strategy::Assistant,
            };
        }
        info!("  → union merge (fallback) for {path}");
        Resolution {
            text: union_merge(content),
            strategy: Strategy::UnionMerge,
        }
    }

    fn ask_assistant(&self, path: &str, content: &str) -> Option<String> {
        let assistant = self.assistant?;
        // The answer replaces the whole file, so a truncated view is useless.
        if content.chars().count() > self.char_limit {
            info!("  {path} exceeds {} chars, skipping assistant", self.char_limit);
            return None;
        }

        let request = AssistRequest::new(
            conflict_prompt(content, self.char_limit),
            ModelTier::Smart,
            self.max_tokens,
        );
        let reply = match assistant.complete(&request) {
            Ok(r) => r,
            Err(e) => {
                warn!("assistant call failed for {path}: {e}");
                return None;
            }
        };

        let body = strip_code_fence(&reply);
        if body.trim().is_empty() || has_conflict_markers(body) {
            warn!("assistant answer for {path} still conflicted or empty, discarding");
            return None;
        }
        let mut text = body.to_string();
        if content.ends_with('\n') && !text.ends_with('\n') {
            text.push('\n');
        }
        Some(text)
    }

    /// Resolve every unmerged path in the working copy and stage it.
    ///
    /// Per-file problems are logged and skipped; correctness is left to the
    /// subsequent `rebase --continue`.
    pub fn resolve_all(&self, git: &GitOps<'_>) -> Vec<ResolvedFile> {
        let files = git.unmerged_paths();
        if files.is_empty() {
            return Vec::new();
        }

        info!("resolving {} conflicted file(s): {files:?}", files.len());
        let mut resolved = Vec::new();
        for f in files {
            let path = git.root().join(&f);
            if !path.is_file() {
                continue;
            }
            let content = match std::fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("cannot read {f}: {e}");
                    continue;
                }
            };
            if !has_conflict_markers(&content) {
                continue;
            }

            info!("  resolving {f}");
            let resolution = self.resolve_text(&f, &content);
            if let Err(e) = std::fs::write(&path, &resolution.text) {
                warn!("cannot write {f}: {e}");
                continue;
            }
            let add = git.add(&f);
            if !add.success() {
                warn!("git add {f} failed: {}", add.error_excerpt(ADD_ERROR_EXCERPT));
            }
            info!("  ✓ {f}");
            resolved.push(ResolvedFile {
                path: f,
                strategy: resolution.strategy,
            });
        }
        resolved
    }
}
