//! Agent registry: mirrors server events about this agent and others.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::action::Facing;

/// Opaque agent identifier, as handed out by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub u64);

/// Immutable point-in-time view of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub x: u32,
    pub y: u32,
    pub facing: Facing,
    pub nickname: Option<String>,
}

impl AgentSnapshot {
    pub fn new(id: AgentId, x: u32, y: u32, facing: Facing) -> Self {
        Self {
            id,
            x,
            y,
            facing,
            nickname: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_position(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

/// Concurrent registry of agent snapshots. `self`'s id is latched on login
/// and invalidated on vanish; an agent is never listed in both own-id and
/// others simultaneously.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    self_id: RwLock<Option<AgentId>>,
    agents: RwLock<HashMap<AgentId, AgentSnapshot>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            self_id: RwLock::new(None),
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_self(&self, id: AgentId) {
        *self.self_id.write().expect("agent registry poisoned") = Some(id);
    }

    pub fn update(&self, snapshot: AgentSnapshot) {
        self.agents
            .write()
            .expect("agent registry poisoned")
            .insert(snapshot.id, snapshot);
    }

    pub fn remove(&self, id: AgentId) {
        self.agents
            .write()
            .expect("agent registry poisoned")
            .remove(&id);
        let mut self_id = self.self_id.write().expect("agent registry poisoned");
        if *self_id == Some(id) {
            *self_id = None;
        }
    }

    pub fn self_snapshot(&self) -> Option<AgentSnapshot> {
        let self_id = (*self.self_id.read().expect("agent registry poisoned"))?;
        self.agents
            .read()
            .expect("agent registry poisoned")
            .get(&self_id)
            .cloned()
    }

    /// Every known agent other than self, regardless of self validity.
    pub fn others(&self) -> Vec<AgentSnapshot> {
        let self_id = *self.self_id.read().expect("agent registry poisoned");
        self.agents
            .read()
            .expect("agent registry poisoned")
            .values()
            .filter(|snap| Some(snap.id) != self_id)
            .cloned()
            .collect()
    }
}
