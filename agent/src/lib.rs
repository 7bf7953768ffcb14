//! The per-tick decision agent: wires the grid/bait/agent registries, the
//! reward planner and the target stabilizer into one `next_move` entry
//! point, with collision avoidance as the last thing applied before an
//! action leaves the library.

mod config;
mod coordinator;
mod error;
mod stabilizer;
mod world;

pub use config::Config;
pub use coordinator::DecisionCoordinator;
pub use error::{AgentError, DecisionKind};
pub use stabilizer::TargetStabilizer;
pub use world::{ControlPanel, SinkState, VisualizationSink, World, WorldProvider};
