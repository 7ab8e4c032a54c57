//! The autopilot sync cycle: pull with rebase (resolving conflicts), group
//! and commit local changes, push with one recovery attempt.

pub mod commit;
pub mod conflict;
pub mod cycle;
pub mod group;
pub mod machine;
pub mod report;

pub use commit::{CommitOrchestrator, CommitSummary};
pub use conflict::{has_conflict_markers, union_merge, ConflictResolver, ResolvedFile, Strategy};
pub use cycle::{preview_groups, SyncCycle, MAX_CONTINUE_ROUNDS};
pub use group::{heuristic_groups, ChangeGrouper, Grouping, GroupingSource};
pub use machine::{CycleMachine, CycleState};
pub use report::{load_report, save_report, CycleReport};
