use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use autopilot_assist::{AssistRequest, Assistant, ModelTier};
use autopilot_core::text::{strip_code_fence, truncate_with_marker};
use autopilot_core::{
    normalize_message, ChangeRecord, CommitGroup, Settings, MAX_MESSAGE_CHARS,
    REMAINING_FILES_MESSAGE,
};
use autopilot_git::GitOps;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ── Assistant strategy ──

/// Per-file entry of the grouping prompt.
#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub status: String,
    pub diff: String,
}

/// Shape every proposed group must have; anything else is rejected.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GroupProposal {
    pub files: Vec<String>,
    pub message: String,
}

/// Prompt asking the assistant to partition `summaries` into commits.
pub fn grouping_prompt(summaries: &[FileSummary]) -> String {
    let payload = serde_json::to_string_pretty(summaries).unwrap_or_else(|_| "[]".into());
    format!(
        "Analyze these git changes and group them into logical, semantic commits.\n\
         Each commit must be one coherent unit (feature, fix, refactoring, docs, ...).\n\n\
         Changes:\n{payload}\n\n\
         Answer ONLY with a JSON array, no explanation:\n\
         [\n  \
           {{\"files\": [\"path/a.py\", \"path/b.py\"], \"message\": \"Add user authentication\"}},\n  \
           {{\"files\": [\"README.md\"], \"message\": \"Update setup documentation\"}}\n\
         ]\n\n\
         Rules:\n\
         - Messages in English, imperative mood (Add, Fix, Update, Refactor...)\n\
         - At most {MAX_MESSAGE_CHARS} characters per message\n\
         - No emoji or other decoration (one is added automatically)\n\
         - Every file must be covered\n"
    )
}

/// Read the first JSON array in an assistant reply as group proposals.
///
/// Parsing is tried from each `[` in turn and consumes exactly one JSON
/// value, so brackets in leading prose and any trailing text are skipped.
/// An empty array carries no proposals and does not stop the search.
/// `None` when no position yields a non-empty list of the right shape.
pub fn parse_proposals(reply: &str) -> Option<Vec<GroupProposal>> {
    let body = strip_code_fence(reply);
    let mut first_err = None;
    for (start, _) in body.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&body[start..]).into_iter::<Vec<GroupProposal>>();
        match stream.next() {
            Some(Ok(groups)) if !groups.is_empty() => return Some(groups),
            Some(Err(e)) if first_err.is_none() => first_err = Some(e),
            _ => {}
        }
    }
    if let Some(e) = first_err {
        debug!("rejecting assistant grouping: {e}");
    }
    None
}

/// Turn proposals into commit groups that cover exactly `changes`.
///
/// Unknown paths and empty groups are dropped, messages normalized, and
/// any path left uncovered lands in one trailing group. Returns an empty
/// list when no proposal survives, so the caller can fall back.
pub fn validate_proposals(proposals: Vec<GroupProposal>, changes: &[ChangeRecord]) -> Vec<CommitGroup> {
    let known: HashSet<&str> = changes.iter().map(|c| c.path.as_str()).collect();
    let mut covered: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    for proposal in proposals {
        let mut seen = HashSet::new();
        let files: Vec<String> = proposal
            .files
            .into_iter()
            .filter(|f| {
                let ok = known.contains(f.as_str());
                if !ok {
                    debug!("dropping unknown path from grouping: {f}");
                }
                ok
            })
            .filter(|f| seen.insert(f.clone()))
            .collect();
        if files.is_empty() {
            continue;
        }
        covered.extend(files.iter().cloned());
        groups.push(CommitGroup::new(files, normalize_message(&proposal.message)));
    }

    if groups.is_empty() {
        return groups;
    }

    let mut missing: Vec<String> = Vec::new();
    for c in changes {
        if !covered.contains(&c.path) && !missing.contains(&c.path) {
            missing.push(c.path.clone());
        }
    }
    if !missing.is_empty() {
        groups.push(CommitGroup::new(missing, REMAINING_FILES_MESSAGE));
    }
    groups
}

// ── Heuristic strategy ──

const EXTENSION_LABELS: &[(&str, &str)] = &[
    (".py", "Update Python source files"),
    (".ts", "Update TypeScript files"),
    (".tsx", "Update React components"),
    (".js", "Update JavaScript files"),
    (".md", "Update documentation"),
    (".json", "Update configuration / data"),
    (".yml", "Update YAML configuration"),
    (".yaml", "Update YAML configuration"),
    (".css", "Update styles"),
    (".html", "Update HTML templates"),
    (".rs", "Update Rust source files"),
    (".toml", "Update TOML configuration"),
];

const CATCH_ALL_KEY: &str = "misc";

/// Bucket key: `.ext` if the file has one, else its top-level component.
pub fn bucket_key(path: &str) -> String {
    let p = Path::new(path);
    if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
        return format!(".{ext}");
    }
    p.components()
        .find_map(|c| match c {
            Component::Normal(s) => s.to_str().map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| CATCH_ALL_KEY.to_string())
}

/// Commit message for a bucket key.
pub fn bucket_label(key: &str) -> String {
    EXTENSION_LABELS
        .iter()
        .find(|(ext, _)| *ext == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| normalize_message(&format!("Update {key} files")))
}

/// One group per bucket, buckets in first-appearance order.
pub fn heuristic_groups(changes: &[ChangeRecord]) -> Vec<CommitGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
    for c in changes {
        let key = bucket_key(&c.path);
        let files = buckets.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        if !files.contains(&c.path) {
            files.push(c.path.clone());
        }
    }
    order
        .into_iter()
        .filter_map(|key| {
            let files = buckets.remove(&key)?;
            Some(CommitGroup::new(files, bucket_label(&key)))
        })
        .collect()
}

// ── Grouper ──

/// Which strategy produced a grouping.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupingSource {
    Assistant,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    pub groups: Vec<CommitGroup>,
    pub source: GroupingSource,
}

/// Partitions changed files into commit groups.
pub struct ChangeGrouper<'a> {
    assistant: Option<&'a dyn Assistant>,
    char_limit: usize,
    max_tokens: u32,
}

impl<'a> ChangeGrouper<'a> {
    pub fn new(assistant: Option<&'a dyn Assistant>, settings: &Settings) -> Self {
        Self {
            assistant,
            char_limit: settings.diff_char_limit,
            max_tokens: settings.max_tokens_grouping,
        }
    }

    /// Groups covering every path in `changes`. Never fails.
    pub fn group(&self, changes: &[ChangeRecord], git: &GitOps<'_>) -> Grouping {
        if changes.is_empty() {
            return Grouping {
                groups: Vec::new(),
                source: GroupingSource::Heuristic,
            };
        }
        if let Some(groups) = self.ask_assistant(changes, git) {
            return Grouping {
                groups,
                source: GroupingSource::Assistant,
            };
        }
        info!("  → heuristic grouping (fallback)");
        Grouping {
            groups: heuristic_groups(changes),
            source: GroupingSource::Heuristic,
        }
    }

    fn summaries(&self, changes: &[ChangeRecord], git: &GitOps<'_>) -> Vec<FileSummary> {
        changes
            .iter()
            .map(|c| FileSummary {
                file: c.path.clone(),
                status: c.code.clone(),
                diff: truncate_with_marker(&git.diff_head(&[c.path.as_str()]), self.char_limit),
            })
            .collect()
    }

    fn ask_assistant(&self, changes: &[ChangeRecord], git: &GitOps<'_>) -> Option<Vec<CommitGroup>> {
        let assistant = self.assistant?;
        let prompt = grouping_prompt(&self.summaries(changes, git));
        let reply = match assistant.complete(&AssistRequest::new(prompt, ModelTier::Fast, self.max_tokens)) {
            Ok(r) => r,
            Err(e) => {
                warn!("assistant grouping failed: {e}");
                return None;
            }
        };
        let proposals = parse_proposals(&reply)?;
        let groups = validate_proposals(proposals, changes);
        (!groups.is_empty()).then_some(groups)
    }
}
