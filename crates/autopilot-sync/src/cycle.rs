use anyhow::Result;
use autopilot_assist::Assistant;
use autopilot_core::text::log_excerpt;
use autopilot_core::{now_rfc3339, CycleResult, Settings, TagPicker};
use autopilot_git::{classify, classify_push, GitOps, Outcome, RepositoryGateway};
use tracing::{info, warn};

use crate::commit::CommitOrchestrator;
use crate::conflict::ConflictResolver;
use crate::group::{ChangeGrouper, Grouping};
use crate::machine::{CycleMachine, CycleState};
use crate::report::CycleReport;

/// Upper bound on resolve/continue rounds within one rebase.
pub const MAX_CONTINUE_ROUNDS: usize = 10;

const CONTINUE_EXCERPT: usize = 200;
const UNEXPECTED_EXCERPT: usize = 300;

/// One pull → commit → push cycle over a working copy.
pub struct SyncCycle<'a> {
    git: GitOps<'a>,
    assistant: Option<&'a dyn Assistant>,
    settings: Settings,
    tags: TagPicker,
    machine: CycleMachine,
    resolved: Vec<String>,
    commits: Vec<String>,
}

impl<'a> SyncCycle<'a> {
    pub fn new(
        gw: &'a dyn RepositoryGateway,
        assistant: Option<&'a dyn Assistant>,
        settings: &Settings,
        tags: TagPicker,
    ) -> Self {
        Self {
            git: GitOps::new(gw),
            assistant,
            settings: settings.clone(),
            tags,
            machine: CycleMachine::new(),
            resolved: Vec::new(),
            commits: Vec::new(),
        }
    }

    /// Run the cycle to completion.
    ///
    /// Only an unusable working copy is an error; pull, commit and push
    /// problems are logged and reflected in the report.
    pub fn run(mut self) -> Result<CycleReport> {
        let started_at = now_rfc3339();
        self.git.verify_work_tree()?;
        info!("=== autopilot cycle: {} ===", self.git.root().display());
        match self.assistant {
            Some(a) => info!("  assistant: {}", a.name()),
            None => info!("  assistant: none, deterministic mode"),
        }

        self.machine.advance(CycleState::Pulling)?;
        let pulled = self.pull()?;
        if !pulled {
            warn!("  pull had problems, continuing with local work");
        }

        self.machine.advance(CycleState::Committing)?;
        let commits_created = self.commit_changes();

        let pushed = if commits_created > 0 {
            info!("  {commits_created} commit(s) created");
            self.machine.advance(CycleState::Pushing)?;
            self.push()?
        } else {
            info!("  nothing to push");
            self.machine.advance(CycleState::Done)?;
            false
        };

        let result = CycleResult {
            pulled,
            commits_created,
            pushed,
        };
        info!("=== done: {result} ===");
        Ok(CycleReport {
            started_at,
            finished_at: now_rfc3339(),
            root: self.git.root().display().to_string(),
            assistant: self.assistant.is_some(),
            result,
            states: self.machine.history().to_vec(),
            resolved: self.resolved,
            commits: self.commits,
        })
    }

    // ── Pulling ──

    /// Rebase-pull, resolving conflicts if it stops on any. `Ok(false)`
    /// means the pull failed and any rebase in progress was aborted.
    fn pull(&mut self) -> Result<bool> {
        info!("► git pull --rebase");
        let out = self.git.pull_rebase();
        match classify(&out) {
            Outcome::Success => {
                info!("  ✓ pull ok");
                Ok(true)
            }
            Outcome::UpToDate => {
                info!("  ✓ already up to date");
                Ok(true)
            }
            Outcome::Conflict => {
                info!("  conflicts detected, resolving");
                self.resolve_rebase()
            }
            outcome => {
                warn!(
                    "unexpected pull outcome ({outcome:?}): {}",
                    log_excerpt(&out.combined(), UNEXPECTED_EXCERPT)
                );
                Ok(false)
            }
        }
    }

    fn resolve_rebase(&mut self) -> Result<bool> {
        let resolver = ConflictResolver::new(self.assistant, &self.settings);
        for round in 1..=MAX_CONTINUE_ROUNDS {
            self.machine.advance(CycleState::Resolving)?;
            let fixed = resolver.resolve_all(&self.git);
            let progressed = !fixed.is_empty();
            self.resolved.extend(fixed.into_iter().map(|f| f.path));

            self.machine.advance(CycleState::Continuing)?;
            let out = self.git.rebase_continue();
            if out.success() {
                info!("  ✓ rebase continued");
                return Ok(true);
            }
            // The rebase stopped again on a later commit.
            if classify(&out) == Outcome::Conflict && progressed && round < MAX_CONTINUE_ROUNDS {
                info!("  rebase stopped on another conflict (round {round})");
                continue;
            }
            warn!(
                "rebase --continue failed: {}",
                log_excerpt(&out.combined(), CONTINUE_EXCERPT)
            );
            break;
        }

        let abort = self.git.rebase_abort();
        if !abort.success() {
            warn!("rebase --abort failed: {}", abort.error_excerpt(CONTINUE_EXCERPT));
        }
        Ok(false)
    }

    // ── Committing ──

    fn commit_changes(&mut self) -> usize {
        let changes = self.git.status();
        if changes.is_empty() {
            info!("no local changes");
            return 0;
        }
        info!("► {} changed file(s), grouping", changes.len());

        // Stage everything once so the index sees every change, then clear
        // it for per-group staging.
        self.git.add_all();
        self.git.reset_index();

        let grouping = ChangeGrouper::new(self.assistant, &self.settings).group(&changes, &self.git);
        info!(
            "  → {} commit(s) planned ({:?})",
            grouping.groups.len(),
            grouping.source
        );

        let summary = CommitOrchestrator::new(self.git, &mut self.tags, &changes).commit_all(&grouping.groups);
        let created = summary.created();
        self.commits.extend(summary.subjects);
        created
    }

    // ── Pushing ──

    fn push(&mut self) -> Result<bool> {
        info!("► git push");
        let out = self.git.push();
        if out.success() {
            info!("  ✓ push ok");
            self.machine.advance(CycleState::Done)?;
            return Ok(true);
        }
        if classify_push(&out) != Outcome::Rejected {
            warn!("✗ push failed: {}", log_excerpt(&out.combined(), UNEXPECTED_EXCERPT));
            self.machine.advance(CycleState::Done)?;
            return Ok(false);
        }

        info!("  push rejected (remote ahead), pulling and retrying once");
        self.machine.advance(CycleState::RejectedRetry)?;
        self.machine.advance(CycleState::Pulling)?;
        if !self.pull()? {
            warn!("✗ push failed: re-pull did not succeed");
            self.machine.advance(CycleState::Done)?;
            return Ok(false);
        }

        self.machine.advance(CycleState::Pushing)?;
        let retry = self.git.push();
        self.machine.advance(CycleState::Done)?;
        if retry.success() {
            info!("  ✓ push ok after pull");
            Ok(true)
        } else {
            warn!("✗ push failed after retry: {}", log_excerpt(&retry.combined(), UNEXPECTED_EXCERPT));
            Ok(false)
        }
    }
}

/// Proposed commit groups for the current changes, without touching the
/// index, the history or the remote.
pub fn preview_groups(
    gw: &dyn RepositoryGateway,
    assistant: Option<&dyn Assistant>,
    settings: &Settings,
) -> Result<Grouping> {
    let git = GitOps::new(gw);
    git.verify_work_tree()?;
    let changes = git.status();
    Ok(ChangeGrouper::new(assistant, settings).group(&changes, &git))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_assist::ScriptedAssistant;
    use autopilot_git::{GitOutput, ScriptedGateway};
    use CycleState::*;

    const REJECTED: &str = " ! [rejected]        main -> main (fetch first)\nerror: failed to push some refs";

    fn gateway() -> ScriptedGateway {
        let gw = ScriptedGateway::new("/repo");
        gw.respond(&["rev-parse", "--is-inside-work-tree"], vec![GitOutput::ok("true\n")]);
        gw
    }

    fn with_two_changes(gw: &ScriptedGateway) {
        gw.respond(&["status"], vec![GitOutput::ok(" M a.py\n M README.md\n")]);
        gw.respond(
            &["diff", "--cached"],
            vec![
                GitOutput::ok("a.py\n"),
                GitOutput::ok("README.md\n"),
                GitOutput::ok(""),
            ],
        );
    }

    fn run(gw: &ScriptedGateway) -> CycleReport {
        SyncCycle::new(gw, None, &Settings::default(), TagPicker::seeded(9))
            .run()
            .unwrap()
    }

    #[test]
    fn not_a_work_tree_is_fatal() {
        let gw = ScriptedGateway::new("/tmp/plain");
        gw.respond(&["rev-parse"], vec![GitOutput::failed(128, "fatal: not a git repository")]);
        let err = SyncCycle::new(&gw, None, &Settings::default(), TagPicker::seeded(0))
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("not a git working copy"));
        assert_eq!(gw.count(&["pull"]), 0);
    }

    #[test]
    fn idle_on_empty() {
        let gw = gateway();
        let report = run(&gw);
        assert_eq!(report.result.commits_created, 0);
        assert!(!report.result.pushed);
        assert_eq!(gw.count(&["push"]), 0);
        assert_eq!(gw.count(&["commit"]), 0);
        assert_eq!(report.states, vec![Idle, Pulling, Committing, Done]);
    }

    #[test]
    fn two_files_two_commits_one_push() {
        let gw = gateway();
        with_two_changes(&gw);
        let report = run(&gw);

        assert!(report.result.pulled);
        assert_eq!(report.result.commits_created, 2);
        assert!(report.result.pushed);
        assert_eq!(gw.count(&["push"]), 1);
        assert!(report.commits[0].ends_with("Update Python source files"));
        assert!(report.commits[1].ends_with("Update documentation"));
        assert_ne!(
            report.commits[0].split(' ').next(),
            report.commits[1].split(' ').next()
        );

        let calls = gw.calls();
        let add_all = calls.iter().position(|c| c == &["add", "-A"]).unwrap();
        let reset = calls.iter().position(|c| c == &["reset", "HEAD"]).unwrap();
        assert!(add_all < reset);
    }

    #[test]
    fn push_rejected_retries_exactly_once() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(
            &["push"],
            vec![GitOutput::failed(1, REJECTED), GitOutput::failed(1, REJECTED)],
        );
        let report = run(&gw);

        assert_eq!(gw.count(&["push"]), 2);
        assert_eq!(gw.count(&["pull"]), 2);
        assert!(!report.result.pushed);
        assert_eq!(report.result.commits_created, 2);
        assert_eq!(
            report.states,
            vec![Idle, Pulling, Committing, Pushing, RejectedRetry, Pulling, Pushing, Done]
        );
    }

    #[test]
    fn rejected_push_of_conflict_named_branch_is_retried() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(
            &["push"],
            vec![GitOutput::failed(
                1,
                " ! [rejected]        fix-merge-conflict -> fix-merge-conflict (fetch first)\nerror: failed to push some refs",
            )],
        );
        let report = run(&gw);
        assert_eq!(gw.count(&["push"]), 2);
        assert_eq!(gw.count(&["pull"]), 2);
        assert!(report.result.pushed);
        assert!(report.states.contains(&RejectedRetry));
    }

    #[test]
    fn push_succeeds_after_recovery() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(&["push"], vec![GitOutput::failed(1, REJECTED)]);
        let report = run(&gw);
        assert!(report.result.pushed);
        assert_eq!(gw.count(&["push"]), 2);
    }

    #[test]
    fn failed_repull_skips_second_push() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(&["push"], vec![GitOutput::failed(1, REJECTED)]);
        gw.respond(
            &["pull"],
            vec![
                GitOutput::ok("Already up to date.\n"),
                GitOutput::failed(1, "fatal: unable to access remote"),
            ],
        );
        let report = run(&gw);
        assert_eq!(gw.count(&["push"]), 1);
        assert!(!report.result.pushed);
        assert_eq!(report.states.last(), Some(&Done));
    }

    #[test]
    fn other_push_failure_not_retried() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(&["push"], vec![GitOutput::failed(128, "fatal: no upstream configured")]);
        let report = run(&gw);
        assert_eq!(gw.count(&["push"]), 1);
        assert_eq!(gw.count(&["pull"]), 1);
        assert!(!report.result.pushed);
    }

    #[test]
    fn unexpected_pull_failure_still_commits() {
        let gw = gateway();
        with_two_changes(&gw);
        gw.respond(
            &["pull"],
            vec![GitOutput::failed(128, "error: cannot pull with rebase: You have unstaged changes.")],
        );
        let report = run(&gw);
        assert!(!report.result.pulled);
        assert_eq!(report.result.commits_created, 2);
        assert_eq!(gw.count(&["rebase"]), 0);
    }

    #[test]
    fn conflict_resolved_and_continued() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("x.txt"),
            "<<<<<<< HEAD\nfoo\n=======\nbar\n>>>>>>> branch",
        )
        .unwrap();
        let gw = ScriptedGateway::new(dir.path());
        gw.respond(&["rev-parse", "--is-inside-work-tree"], vec![GitOutput::ok("true\n")]);
        gw.respond(&["pull"], vec![GitOutput::failed(1, "CONFLICT (content): Merge conflict in x.txt")]);
        gw.respond(&["diff", "--name-only", "--diff-filter=U"], vec![GitOutput::ok("x.txt\n")]);
        let report = run(&gw);

        assert!(report.result.pulled);
        assert_eq!(report.resolved, vec!["x.txt"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("x.txt")).unwrap(), "foo\nbar\n");
        assert_eq!(gw.count(&["rebase", "--continue"]), 1);
        assert_eq!(gw.count(&["rebase", "--abort"]), 0);
        assert_eq!(
            report.states,
            vec![Idle, Pulling, Resolving, Continuing, Committing, Done]
        );
    }

    #[test]
    fn failed_continue_aborts_rebase() {
        let gw = gateway();
        gw.respond(&["pull"], vec![GitOutput::failed(1, "CONFLICT (modify/delete): gone.txt")]);
        gw.respond(
            &["rebase", "--continue"],
            vec![GitOutput::failed(1, "error: you must edit all merge conflicts")],
        );
        let report = run(&gw);
        assert!(!report.result.pulled);
        assert_eq!(gw.count(&["rebase", "--continue"]), 1);
        assert_eq!(gw.count(&["rebase", "--abort"]), 1);
    }

    #[test]
    fn multi_commit_rebase_loops_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let conflicted = "<<<<<<< HEAD\na\n=======\nb\n>>>>>>> c\n";
        std::fs::write(dir.path().join("one.txt"), conflicted).unwrap();
        std::fs::write(dir.path().join("two.txt"), conflicted).unwrap();
        let gw = ScriptedGateway::new(dir.path());
        gw.respond(&["rev-parse", "--is-inside-work-tree"], vec![GitOutput::ok("true\n")]);
        gw.respond(&["pull"], vec![GitOutput::failed(1, "CONFLICT (content): Merge conflict in one.txt")]);
        gw.respond(
            &["diff", "--name-only", "--diff-filter=U"],
            vec![GitOutput::ok("one.txt\n"), GitOutput::ok("two.txt\n")],
        );
        gw.respond(
            &["rebase", "--continue"],
            vec![GitOutput::failed(1, "CONFLICT (content): Merge conflict in two.txt")],
        );
        let report = run(&gw);

        assert!(report.result.pulled);
        assert_eq!(report.resolved, vec!["one.txt", "two.txt"]);
        assert_eq!(gw.count(&["rebase", "--continue"]), 2);
    }

    #[test]
    fn assistant_used_for_grouping() {
        let gw = gateway();
        gw.respond(&["status"], vec![GitOutput::ok(" M a.py\n M README.md\n")]);
        gw.respond(
            &["diff", "--cached"],
            vec![GitOutput::ok("a.py\nREADME.md\n"), GitOutput::ok("")],
        );
        let a = ScriptedAssistant::with_replies(vec![Ok(
            r#"[{"files":["a.py","README.md"],"message":"Add parser and docs"}]"#.into(),
        )]);
        let report = SyncCycle::new(&gw, Some(&a), &Settings::default(), TagPicker::seeded(1))
            .run()
            .unwrap();
        assert!(report.assistant);
        assert_eq!(report.result.commits_created, 1);
        assert!(report.commits[0].ends_with("Add parser and docs"));
    }

    #[test]
    fn preview_does_not_stage_or_commit() {
        let gw = gateway();
        gw.respond(&["status"], vec![GitOutput::ok(" M a.py\n?? notes.md\n")]);
        let grouping = preview_groups(&gw, None, &Settings::default()).unwrap();
        assert_eq!(grouping.groups.len(), 2);
        assert_eq!(gw.count(&["add"]), 0);
        assert_eq!(gw.count(&["reset"]), 0);
        assert_eq!(gw.count(&["commit"]), 0);
    }
}
