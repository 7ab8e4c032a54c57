use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::paths::AutopilotPaths;

/// Environment variable overriding the working-copy root.
pub const ENV_REPO_PATH: &str = "GIT_REPO_PATH";

/// Environment variable carrying the assistant credential.
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_DIFF_CHAR_LIMIT: usize = 3000;
pub const DEFAULT_MODEL_FAST: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_MODEL_SMART: &str = "claude-opus-4-5-20251101";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com/v1/";

/// Tunables read from `.git/autopilot/config.json`. Every key is optional.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Character budget per file sent to the assistant (diffs and conflicted files).
    pub diff_char_limit: usize,
    pub model_fast: String,
    pub model_smart: String,
    pub timeout_secs: u64,
    pub max_tokens_grouping: u32,
    pub max_tokens_resolve: u32,
    pub api_base_url: String,
    /// Persist `last_cycle.json` after each run.
    pub remember_last_cycle: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diff_char_limit: DEFAULT_DIFF_CHAR_LIMIT,
            model_fast: DEFAULT_MODEL_FAST.to_string(),
            model_smart: DEFAULT_MODEL_SMART.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens_grouping: 2048,
            max_tokens_resolve: 4096,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            remember_last_cycle: true,
        }
    }
}

impl Settings {
    /// Load from the config file. A missing file yields defaults; an
    /// unreadable or malformed one yields defaults and a warning.
    pub fn load(paths: &AutopilotPaths) -> Self {
        let path = &paths.config_json;
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Assistant credential from the environment; empty counts as absent.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(ENV_API_KEY)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Root override: explicit flag first, then `GIT_REPO_PATH`.
pub fn root_override(flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        std::env::var(ENV_REPO_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let s = Settings::load(&AutopilotPaths::discover(tmp.path()));
        assert_eq!(s, Settings::default());
        assert_eq!(s.diff_char_limit, 3000);
        assert_eq!(s.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn partial_file_overrides_some_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let p = AutopilotPaths::discover(tmp.path());
        p.ensure_layout().unwrap();
        std::fs::write(&p.config_json, r#"{"diff_char_limit": 500, "model_fast": "m"}"#).unwrap();

        let s = Settings::load(&p);
        assert_eq!(s.diff_char_limit, 500);
        assert_eq!(s.model_fast, "m");
        assert_eq!(s.model_smart, DEFAULT_MODEL_SMART);
        assert!(s.remember_last_cycle);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let p = AutopilotPaths::discover(tmp.path());
        p.ensure_layout().unwrap();
        std::fs::write(&p.config_json, "{not json").unwrap();
        assert_eq!(Settings::load(&p), Settings::default());
    }

    #[test]
    fn explicit_root_wins() {
        let got = root_override(Some(Path::new("/explicit")));
        assert_eq!(got, Some(PathBuf::from("/explicit")));
    }
}
