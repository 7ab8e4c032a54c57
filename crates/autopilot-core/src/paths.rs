use std::path::{Path, PathBuf};

/// Well-known autopilot paths, all under the repository's `.git/` so the
/// tool never commits its own state.
#[derive(Debug, Clone)]
pub struct AutopilotPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config_json: PathBuf,
    pub lock_file: PathBuf,
    pub last_cycle_json: PathBuf,
}

impl AutopilotPaths {
    /// Derive all paths from a working-copy root. Pure computation, no I/O.
    ///
    /// Assumes `.git` is a directory; for linked worktrees and submodules
    /// (where `.git` is a file) use [`AutopilotPaths::with_git_dir`].
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let git_dir = root.join(".git");
        Self::with_git_dir(root, git_dir)
    }

    /// Derive paths from a root and an explicit git directory.
    pub fn with_git_dir(repo_root: impl Into<PathBuf>, git_dir: impl AsRef<Path>) -> Self {
        let state_dir = git_dir.as_ref().join("autopilot");
        Self {
            config_json: state_dir.join("config.json"),
            lock_file: state_dir.join("LOCK"),
            last_cycle_json: state_dir.join("last_cycle.json"),
            state_dir,
            root: repo_root.into(),
        }
    }

    /// Create the state directory. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }
}
