//! Shared data model for the maze decision agent: the walkable grid, the
//! live bait registry and the agent registry. These are the leaf
//! components the search and planning crates build on.

mod action;
mod agent;
mod bait;
mod error;
mod grid;

pub use action::{Action, Facing};
pub use agent::{AgentId, AgentRegistry, AgentSnapshot};
pub use bait::{label_for_score, Bait, BaitKind, BaitRegistry};
pub use error::{BaitError, GridError};
pub use grid::{GridModel, GridStore};
