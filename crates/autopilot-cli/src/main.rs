mod cmd_plan;
mod cmd_resolve;
mod cmd_run;
mod cmd_status;

use std::path::{Path, PathBuf};

use autopilot_assist::{AnthropicAssistant, Assistant};
use autopilot_core::{config, AutopilotPaths, Settings};
use anyhow::Context;
use autopilot_git::{discover_root, GitCli, GitOps};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "autopilot",
    version,
    about = "Keep a git working copy in sync with its remote"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
    /// Working copy to operate on (default: $GIT_REPO_PATH, then the enclosing repository)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,
    /// Never call the assistant, even when ANTHROPIC_API_KEY is set
    #[arg(long, global = true)]
    no_assist: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run one cycle: pull --rebase, commit local changes in groups, push
    Run {
        /// Skip the cycle lock (for callers that already serialize runs)
        #[arg(long)]
        no_lock: bool,
    },
    /// Show the commit groups the next cycle would create, without changing anything
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve conflict markers in every unmerged file and stage the result
    Resolve,
    /// Show the last recorded cycle
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Everything a command needs to know about the working copy.
pub(crate) struct Workspace {
    pub gw: GitCli,
    pub paths: AutopilotPaths,
    pub settings: Settings,
    pub no_assist: bool,
}

impl Workspace {
    fn open(repo: Option<&Path>, no_assist: bool) -> anyhow::Result<Self> {
        let root = resolve_root(repo)?;
        let gw = GitCli::new(&root);
        let paths = match GitOps::new(&gw).git_dir() {
            Some(git_dir) => AutopilotPaths::with_git_dir(&root, git_dir),
            None => AutopilotPaths::discover(&root),
        };
        let settings = Settings::load(&paths);
        Ok(Self {
            gw,
            paths,
            settings,
            no_assist,
        })
    }

    pub fn git(&self) -> GitOps<'_> {
        GitOps::new(&self.gw)
    }

    /// The configured assistant client, or `None` for deterministic mode.
    pub fn assistant(&self) -> Option<AnthropicAssistant> {
        if self.no_assist {
            return None;
        }
        let client = AnthropicAssistant::from_env(&self.settings);
        if client.is_none() {
            tracing::info!("{} not set, using deterministic strategies", config::ENV_API_KEY);
        }
        client
    }
}

/// Explicit flag, then `GIT_REPO_PATH`, then the repository around the
/// current directory, then the current directory itself. The result is
/// canonical, so `..` segments and symlinks never reach git or the lock path.
fn resolve_root(flag: Option<&Path>) -> anyhow::Result<PathBuf> {
    let root = match config::root_override(flag) {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir()?;
            discover_root(&cwd).unwrap_or(cwd)
        }
    };
    std::fs::canonicalize(&root)
        .with_context(|| format!("cannot resolve repository root {}", root.display()))
}

pub(crate) fn as_dyn(a: &Option<AnthropicAssistant>) -> Option<&dyn Assistant> {
    a.as_ref().map(|a| a as &dyn Assistant)
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ws = Workspace::open(cli.repo.as_deref(), cli.no_assist)?;

    match cli.cmd {
        Command::Run { no_lock } => cmd_run::execute(&ws, no_lock),
        Command::Plan { json } => cmd_plan::execute(&ws, json),
        Command::Resolve => cmd_resolve::execute(&ws),
        Command::Status { json } => cmd_status::execute(&ws, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_git::RepositoryGateway;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["autopilot", "run", "--no-lock", "--repo", "/tmp/x", "-v"]).unwrap();
        assert!(matches!(cli.cmd, Command::Run { no_lock: true }));
        assert_eq!(cli.repo.as_deref(), Some(Path::new("/tmp/x")));
        assert!(cli.verbose);
        assert!(!cli.no_assist);
    }

    #[test]
    fn plan_and_status_take_json() {
        let cli = Cli::try_parse_from(["autopilot", "--no-assist", "plan", "--json"]).unwrap();
        assert!(matches!(cli.cmd, Command::Plan { json: true }));
        assert!(cli.no_assist);
        let cli = Cli::try_parse_from(["autopilot", "status"]).unwrap();
        assert!(matches!(cli.cmd, Command::Status { json: false }));
    }

    #[test]
    fn subcommand_required() {
        assert!(Cli::try_parse_from(["autopilot"]).is_err());
        assert!(Cli::try_parse_from(["autopilot", "sync"]).is_err());
    }

    #[test]
    fn workspace_paths_follow_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        GitCli::new(dir.path()).run(&["init"]);
        let ws = Workspace::open(Some(dir.path()), true).unwrap();
        assert!(ws.paths.state_dir.ends_with(".git/autopilot"));
        assert!(ws.assistant().is_none());
        assert_eq!(ws.settings, Settings::default());
    }

    #[test]
    fn repo_flag_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let dotted = dir.path().join("sub").join("..");
        let root = resolve_root(Some(&dotted)).unwrap();
        assert_eq!(root, std::fs::canonicalize(dir.path()).unwrap());

        let err = resolve_root(Some(&dir.path().join("missing"))).unwrap_err();
        assert!(err.to_string().contains("cannot resolve repository root"));
    }
}
