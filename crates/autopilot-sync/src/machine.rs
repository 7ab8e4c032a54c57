use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

// ── States ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Pulling,
    Resolving,
    Continuing,
    Committing,
    Pushing,
    RejectedRetry,
    Done,
}

// ── Valid transitions ──

const VALID_TRANSITIONS: &[(CycleState, &[CycleState])] = &[
    (CycleState::Idle, &[CycleState::Pulling]),
    (
        CycleState::Pulling,
        &[
            CycleState::Resolving,
            CycleState::Committing,
            CycleState::Pushing,
            CycleState::Done,
        ],
    ),
    (CycleState::Resolving, &[CycleState::Continuing]),
    (
        CycleState::Continuing,
        &[
            CycleState::Resolving,
            CycleState::Committing,
            CycleState::Pushing,
            CycleState::Done,
        ],
    ),
    (
        CycleState::Committing,
        &[CycleState::Pushing, CycleState::Done],
    ),
    (
        CycleState::Pushing,
        &[CycleState::RejectedRetry, CycleState::Done],
    ),
    (CycleState::RejectedRetry, &[CycleState::Pulling]),
    // Done is terminal
];

fn is_valid_transition(from: CycleState, to: CycleState) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

// ── Machine ──

/// Tracks the current state of one cycle and every state it entered.
#[derive(Debug, Clone)]
pub struct CycleMachine {
    current: CycleState,
    history: Vec<CycleState>,
}

impl Default for CycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleMachine {
    pub fn new() -> Self {
        Self {
            current: CycleState::Idle,
            history: vec![CycleState::Idle],
        }
    }

    pub fn current(&self) -> CycleState {
        self.current
    }

    pub fn history(&self) -> &[CycleState] {
        &self.history
    }

    pub fn is_done(&self) -> bool {
        self.current == CycleState::Done
    }

    /// Move to `to`, failing on a transition outside the table.
    pub fn advance(&mut self, to: CycleState) -> Result<()> {
        let from = self.current;
        if !is_valid_transition(from, to) {
            bail!("invalid cycle transition: {from:?} → {to:?}");
        }
        tracing::debug!("cycle state {from:?} → {to:?}");
        self.current = to;
        self.history.push(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CycleState::*;

    #[test]
    fn happy_path() {
        let mut m = CycleMachine::new();
        for s in [Pulling, Committing, Pushing, Done] {
            m.advance(s).unwrap();
        }
        assert!(m.is_done());
        assert_eq!(m.history(), &[Idle, Pulling, Committing, Pushing, Done]);
    }

    #[test]
    fn conflict_then_rejection_path() {
        let mut m = CycleMachine::new();
        for s in [
            Pulling,
            Resolving,
            Continuing,
            Resolving,
            Continuing,
            Committing,
            Pushing,
            RejectedRetry,
            Pulling,
            Pushing,
            Done,
        ] {
            m.advance(s).unwrap();
        }
        assert_eq!(m.history().len(), 12);
    }

    #[test]
    fn rejects_skipping_states() {
        let mut m = CycleMachine::new();
        assert!(m.advance(Committing).is_err());
        assert_eq!(m.current(), Idle);
        m.advance(Pulling).unwrap();
        assert!(m.advance(Continuing).is_err());
        assert!(m.advance(RejectedRetry).is_err());
    }

    #[test]
    fn done_is_terminal() {
        let mut m = CycleMachine::new();
        m.advance(Pulling).unwrap();
        m.advance(Committing).unwrap();
        m.advance(Done).unwrap();
        for s in [Idle, Pulling, Committing, Pushing, Done] {
            assert!(m.advance(s).is_err(), "{s:?} accepted after Done");
        }
    }

    #[test]
    fn states_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&RejectedRetry).unwrap(),
            "\"rejected_retry\""
        );
    }
}
