//! The five-kind error taxonomy the coordinator classifies every internal
//! failure into before anything reaches `next_move`'s caller. None of these
//! variants ever escape the library: they exist so the coordinator can log
//! a reason and fall through to a legal action.

use maze_core::{BaitError, GridError};

/// Internal decision-agent errors. Always handled locally; `next_move`
/// itself is infallible.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("not ready: {0}")]
    NotReady(&'static str),

    #[error("no plan: {0}")]
    NoPlan(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("planner budget exceeded after {expansions} expansions")]
    BudgetExceeded { expansions: u32 },

    #[error("stale target: committed bait at ({x}, {y}) no longer exists")]
    StaleTarget { x: u32, y: u32 },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Bait(#[from] BaitError),
}

impl AgentError {
    /// The taxonomy kind this error maps to, used for `tracing` level
    /// selection and as the coordinator's exhaustive match target.
    pub fn kind(&self) -> DecisionKind {
        match self {
            AgentError::NotReady(_) => DecisionKind::NotReady,
            AgentError::NoPlan(_) => DecisionKind::NoPlan,
            AgentError::InvalidInput(_) | AgentError::Grid(_) | AgentError::Bait(_) => {
                DecisionKind::InvalidInput
            }
            AgentError::BudgetExceeded { .. } => DecisionKind::BudgetExceeded,
            AgentError::StaleTarget { .. } => DecisionKind::StaleTarget,
        }
    }
}

/// The five legal "reasons nothing concrete happened", independent of any
/// particular error value. The coordinator's state machine is keyed on
/// this, not on `AgentError` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    NotReady,
    NoPlan,
    InvalidInput,
    BudgetExceeded,
    StaleTarget,
}
