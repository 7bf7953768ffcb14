//! Per-opponent oriented distance fields used to estimate who reaches a
//! given bait first. Local contest prediction only — no global
//! multi-agent optimization.

use maze_core::{AgentSnapshot, GridModel};

use crate::search::OrientedSearch;

/// Computes and holds one oriented distance field per (sampled) opponent.
#[derive(Debug, Default)]
pub struct ContestPredictor {
    fields: Vec<OrientedSearch>,
}

impl ContestPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the distance fields for `opponents`. If there are more
    /// than `max_opponents`, only the geometrically nearest (by Manhattan
    /// distance to `self_pos`) are sampled, in deterministic order.
    pub fn compute(
        &mut self,
        grid: &GridModel,
        opponents: &[AgentSnapshot],
        self_pos: (u32, u32),
        max_opponents: usize,
    ) {
        let mut sampled: Vec<&AgentSnapshot> = opponents.iter().collect();
        sampled.sort_by_key(|a| manhattan(self_pos, (a.x, a.y)));
        sampled.truncate(max_opponents);

        self.fields.clear();
        for opponent in sampled {
            let mut search = OrientedSearch::new();
            // No danger memory, no occupancy bias from this agent's own
            // state: the opponent is assumed to move freely on the grid.
            search.run(grid, (opponent.x, opponent.y, opponent.facing), &|_, _| false);
            self.fields.push(search);
        }
    }

    /// Minimum number of actions any sampled opponent needs to reach
    /// `(x, y)`; `None` if no opponent can reach it (or none were sampled).
    pub fn min_opponent_ticks_to(&self, x: u32, y: u32) -> Option<u32> {
        self.fields
            .iter()
            .filter_map(|field| field.distance_to(x, y))
            .min()
    }
}

fn manhattan(a: (u32, u32), b: (u32, u32)) -> u32 {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}
