//! The trait boundary standing in for the source's reflection-based host
//! access: the coordinator only ever reaches the live grid, bait registry
//! and agent registry through [`WorldProvider`], never past it. A matching
//! pair of output traits ([`VisualizationSink`], [`ControlPanel`]) covers
//! the pulled outputs from §6.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use maze_core::{AgentId, AgentRegistry, AgentSnapshot, Bait, BaitRegistry, GridModel, GridStore};
use tracing::debug;

use crate::error::AgentError;

/// Read access to the current world state at tick start. The coordinator
/// is generic over this trait rather than holding the registries directly,
/// so tests can substitute a fixed fixture instead of live event plumbing.
pub trait WorldProvider {
    fn grid(&self) -> Option<Arc<GridModel>>;
    fn baits(&self) -> Vec<Bait>;
    fn self_snapshot(&self) -> Option<AgentSnapshot>;
    fn other_agents(&self) -> Vec<AgentSnapshot>;
}

/// Outputs pulled by the engine's renderer each tick.
pub trait VisualizationSink {
    fn set_target(&self, x: u32, y: u32, label: Option<&'static str>);
    fn clear_target(&self);
    fn set_planned_path(&self, path: &[(u32, u32)]);
}

/// Exposes the external pause flag; flipped by `on_pause_toggle`.
pub trait ControlPanel {
    fn paused(&self) -> bool;
}

/// The live [`WorldProvider`] implementation: the three concurrent
/// registries plus the event-ingestion methods the engine calls on its I/O
/// thread. Mirrors the teacher's single-writer/many-reader convention
/// (`RwLock`-guarded state, snapshot-on-read).
#[derive(Debug, Default)]
pub struct World {
    grid: GridStore,
    baits: BaitRegistry,
    agents: AgentRegistry,
    paused: AtomicBool,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_maze(&self, width: u32, height: u32, rows: &[impl AsRef<str>]) -> Result<(), AgentError> {
        let model = GridModel::parse(width, height, rows)?;
        self.baits.observe_bounds(width, height);
        self.grid.update(model);
        Ok(())
    }

    pub fn on_bait_appeared(&self, bait: Bait) -> Result<(), AgentError> {
        self.baits.insert(bait)?;
        Ok(())
    }

    pub fn on_bait_vanished(&self, x: u32, y: u32) {
        self.baits.remove_at(x, y);
    }

    pub fn on_self_login(&self, snapshot: AgentSnapshot) {
        debug!(id = snapshot.id.0, nickname = snapshot.nickname.as_deref().unwrap_or("?"), "self login");
        self.agents.set_self(snapshot.id);
        self.agents.update(snapshot);
    }

    pub fn on_self_update(&self, snapshot: AgentSnapshot) {
        self.agents.update(snapshot);
    }

    pub fn on_self_vanish(&self, id: AgentId) {
        self.agents.remove(id);
    }

    pub fn on_agent(&self, snapshot: AgentSnapshot) {
        debug!(id = snapshot.id.0, nickname = snapshot.nickname.as_deref().unwrap_or("?"), "agent update");
        self.agents.update(snapshot);
    }

    pub fn on_agent_vanish(&self, id: AgentId) {
        self.agents.remove(id);
    }

    pub fn on_pause_toggle(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

impl WorldProvider for World {
    fn grid(&self) -> Option<Arc<GridModel>> {
        self.grid.snapshot()
    }

    fn baits(&self) -> Vec<Bait> {
        self.baits.snapshot()
    }

    fn self_snapshot(&self) -> Option<AgentSnapshot> {
        self.agents.self_snapshot()
    }

    fn other_agents(&self) -> Vec<AgentSnapshot> {
        self.agents.others()
    }
}

impl ControlPanel for World {
    fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// In-memory [`VisualizationSink`]: the CLI demo renders from this, and
/// tests assert against it directly instead of a mock.
#[derive(Debug, Default)]
pub struct SinkState {
    target: RwLock<Option<(u32, u32, Option<&'static str>)>>,
    path: RwLock<Vec<(u32, u32)>>,
}

impl SinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<(u32, u32, Option<&'static str>)> {
        *self.target.read().expect("sink state poisoned")
    }

    pub fn planned_path(&self) -> Vec<(u32, u32)> {
        self.path.read().expect("sink state poisoned").clone()
    }
}

impl VisualizationSink for SinkState {
    fn set_target(&self, x: u32, y: u32, label: Option<&'static str>) {
        *self.target.write().expect("sink state poisoned") = Some((x, y, label));
    }

    fn clear_target(&self) {
        *self.target.write().expect("sink state poisoned") = None;
    }

    fn set_planned_path(&self, path: &[(u32, u32)]) {
        *self.path.write().expect("sink state poisoned") = path.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_core::Facing;
    use pretty_assertions::assert_eq;

    #[test]
    fn world_reports_not_ready_until_maze_and_self_are_known() {
        let world = World::new();
        assert!(world.grid().is_none());
        assert!(world.self_snapshot().is_none());
        world.on_maze(3, 3, &["...", "...", "..."]).unwrap();
        assert!(world.grid().is_some());
    }

    #[test]
    fn self_login_then_update_keeps_self_out_of_others() {
        let world = World::new();
        world.on_self_login(AgentSnapshot::new(AgentId(1), 0, 0, Facing::North));
        world.on_agent(AgentSnapshot::new(AgentId(2), 1, 1, Facing::East));
        assert_eq!(world.self_snapshot().unwrap().id, AgentId(1));
        assert_eq!(world.other_agents().len(), 1);
    }

    #[test]
    fn pause_toggle_flips_control_panel_state() {
        let world = World::new();
        assert!(!world.paused());
        world.on_pause_toggle(true);
        assert!(world.paused());
    }

    #[test]
    fn bait_appear_then_vanish_round_trips() {
        let world = World::new();
        world.on_maze(3, 3, &["...", "...", "..."]).unwrap();
        world.on_bait_appeared(Bait::gem(1, 1)).unwrap();
        assert_eq!(world.baits().len(), 1);
        world.on_bait_vanished(1, 1);
        assert!(world.baits().is_empty());
    }

    #[test]
    fn sink_state_round_trips_and_clears() {
        let sink = SinkState::new();
        sink.set_target(2, 3, Some("GEM"));
        sink.set_planned_path(&[(0, 0), (1, 0), (2, 0)]);
        assert_eq!(sink.target(), Some((2, 3, Some("GEM"))));
        assert_eq!(sink.planned_path().len(), 3);
        sink.clear_target();
        assert_eq!(sink.target(), None);
    }
}
