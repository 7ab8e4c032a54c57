use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use autopilot_core::ChangeRecord;

use crate::gateway::{GitCli, GitOutput, RepositoryGateway};
use crate::status::{parse_porcelain, unquote};

/// Environment that keeps `rebase --continue` from opening an editor.
pub const NON_INTERACTIVE_ENV: &[(&str, &str)] = &[("GIT_EDITOR", "true"), ("GIT_MERGE_AUTOEDIT", "no")];

const ERROR_EXCERPT: usize = 200;

/// The git operations the sync cycle needs, over any gateway.
#[derive(Clone, Copy)]
pub struct GitOps<'a> {
    gw: &'a dyn RepositoryGateway,
}

impl<'a> GitOps<'a> {
    pub fn new(gw: &'a dyn RepositoryGateway) -> Self {
        Self { gw }
    }

    pub fn root(&self) -> &Path {
        self.gw.root()
    }

    /// Fail unless the root is inside a git work tree.
    pub fn verify_work_tree(&self) -> Result<()> {
        let out = self.gw.run(&["rev-parse", "--is-inside-work-tree"]);
        if !out.success() || out.stdout.trim() != "true" {
            bail!(
                "{} is not a git working copy: {}",
                self.root().display(),
                out.error_excerpt(ERROR_EXCERPT)
            );
        }
        Ok(())
    }

    /// Absolute path of the git directory (handles worktrees where `.git` is a file).
    pub fn git_dir(&self) -> Option<PathBuf> {
        let out = self.gw.run(&["rev-parse", "--absolute-git-dir"]);
        let dir = out.stdout.trim();
        (out.success() && !dir.is_empty()).then(|| PathBuf::from(dir))
    }

    pub fn pull_rebase(&self) -> GitOutput {
        self.gw.run(&["pull", "--rebase"])
    }

    pub fn push(&self) -> GitOutput {
        self.gw.run(&["push"])
    }

    /// Snapshot of every changed path, untracked files listed individually.
    pub fn status(&self) -> Vec<ChangeRecord> {
        let out = self
            .gw
            .run(&["status", "--porcelain", "--untracked-files=all"]);
        if !out.success() {
            tracing::warn!("git status failed: {}", out.error_excerpt(ERROR_EXCERPT));
            return Vec::new();
        }
        parse_porcelain(&out.stdout)
    }

    /// `git diff HEAD`, optionally scoped to `files`.
    pub fn diff_head(&self, files: &[&str]) -> String {
        let mut args = vec!["diff", "HEAD"];
        if !files.is_empty() {
            args.push("--");
            args.extend_from_slice(files);
        }
        self.gw.run(&args).stdout
    }

    /// Stage one path, including a deletion.
    pub fn add(&self, path: &str) -> GitOutput {
        self.gw.run(&["add", "-A", "--", path])
    }

    pub fn add_all(&self) -> GitOutput {
        self.gw.run(&["add", "-A"])
    }

    /// Unstage everything, keeping the working tree.
    pub fn reset_index(&self) -> GitOutput {
        self.gw.run(&["reset", "HEAD"])
    }

    /// Paths currently staged for commit.
    pub fn staged_paths(&self) -> Vec<String> {
        lines(&self.gw.run(&["diff", "--cached", "--name-only"]).stdout)
    }

    pub fn commit(&self, message: &str) -> GitOutput {
        self.gw.run(&["commit", "-m", message])
    }

    /// Paths git reports as unmerged.
    pub fn unmerged_paths(&self) -> Vec<String> {
        lines(
            &self
                .gw
                .run(&["diff", "--name-only", "--diff-filter=U"])
                .stdout,
        )
    }

    pub fn rebase_continue(&self) -> GitOutput {
        self.gw
            .execute(&["rebase", "--continue"], NON_INTERACTIVE_ENV)
    }

    pub fn rebase_abort(&self) -> GitOutput {
        self.gw.run(&["rebase", "--abort"])
    }
}

/// One path per non-blank line, with git's C-style quoting undone.
fn lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(unquote)
        .collect()
}

/// Top of the work tree containing `dir`, if any.
pub fn discover_root(dir: &Path) -> Option<PathBuf> {
    let out = GitCli::new(dir).run(&["rev-parse", "--show-toplevel"]);
    let top = out.stdout.trim();
    (out.success() && !top.is_empty()).then(|| PathBuf::from(top))
}
