use std::collections::HashMap;

use autopilot_core::{decorate, ChangeRecord, CommitGroup, TagPicker, UNCATEGORIZED_MESSAGE};
use autopilot_git::GitOps;
use tracing::{info, warn};

const COMMIT_ERROR_EXCERPT: usize = 120;

/// What the orchestrator did with a list of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Decorated subjects of the commits created, in order.
    pub subjects: Vec<String>,
    /// Groups that staged nothing.
    pub skipped: usize,
    pub failed: usize,
}

impl CommitSummary {
    pub fn created(&self) -> usize {
        self.subjects.len()
    }
}

/// Turns commit groups into commits, one tag per commit.
pub struct CommitOrchestrator<'a, 'g> {
    git: GitOps<'g>,
    tags: &'a mut TagPicker,
    /// Rename sources keyed by destination, staged with their group.
    orig_paths: HashMap<String, String>,
}

impl<'a, 'g> CommitOrchestrator<'a, 'g> {
    pub fn new(git: GitOps<'g>, tags: &'a mut TagPicker, changes: &[ChangeRecord]) -> Self {
        let orig_paths = changes
            .iter()
            .filter_map(|c| Some((c.path.clone(), c.orig_path.clone()?)))
            .collect();
        Self {
            git,
            tags,
            orig_paths,
        }
    }

    /// Commit every group in order, then any staged leftovers.
    pub fn commit_all(&mut self, groups: &[CommitGroup]) -> CommitSummary {
        let mut summary = CommitSummary::default();
        for group in groups {
            self.stage(&group.files);
            if self.git.staged_paths().is_empty() {
                info!("  nothing staged for \"{}\", skipping", group.message);
                summary.skipped += 1;
                continue;
            }
            self.commit(&group.message, &mut summary);
        }

        if !self.git.staged_paths().is_empty() {
            self.commit(UNCATEGORIZED_MESSAGE, &mut summary);
        }
        summary
    }

    fn stage(&self, files: &[String]) {
        for f in files {
            let out = self.git.add(f);
            if !out.success() {
                warn!("git add {f} failed: {}", out.error_excerpt(COMMIT_ERROR_EXCERPT));
            }
            if let Some(orig) = self.orig_paths.get(f) {
                self.git.add(orig);
            }
        }
    }

    fn commit(&mut self, message: &str, summary: &mut CommitSummary) {
        let subject = decorate(self.tags.next_tag(), message);
        let out = self.git.commit(&subject);
        if out.success() {
            info!("  ✓ {subject}");
            summary.subjects.push(subject);
        } else {
            warn!(
                "commit \"{subject}\" failed: {}",
                out.error_excerpt(COMMIT_ERROR_EXCERPT)
            );
            summary.failed += 1;
        }
    }
}
