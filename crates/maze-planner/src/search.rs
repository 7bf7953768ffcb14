//! Unweighted BFS over oriented states `(x, y, facing)` where every edge
//! (turn left, turn right, step forward) costs exactly one action.

use std::collections::VecDeque;

use maze_core::{Action, Facing, GridModel};

const SENTINEL: u32 = u32::MAX;

/// Reusable working arrays for one oriented BFS. The same instance can be
/// re-run from a new origin without reallocating, as long as the grid
/// dimensions don't shrink the required capacity below what's stored.
#[derive(Debug, Default)]
pub struct OrientedSearch {
    width: u32,
    height: u32,
    dist: Vec<u32>,
    prev_state: Vec<i64>,
    first_action: Vec<Option<Action>>,
    origin_state: usize,
}

impl OrientedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_index(width: u32, x: u32, y: u32, facing: Facing) -> usize {
        ((y * width + x) * 4 + facing.index() as u32) as usize
    }

    fn ensure_capacity(&mut self, width: u32, height: u32) {
        let len = (width as usize) * (height as usize) * 4;
        if self.width != width || self.height != height || self.dist.len() != len {
            self.width = width;
            self.height = height;
            self.dist = vec![SENTINEL; len];
            self.prev_state = vec![-1; len];
            self.first_action = vec![None; len];
        }
    }

    /// Run the BFS from `origin`. `blocked(x, y)` is an overlay the caller
    /// supplies (traps, occupancy, danger memory); admissibility is
    /// `in_bounds && walkable && !blocked`. The overlay is only consulted
    /// for cells being *stepped into* — the origin cell is always a valid
    /// place to start from, even if the overlay marks it blocked.
    pub fn run(
        &mut self,
        grid: &GridModel,
        origin: (u32, u32, Facing),
        blocked: &dyn Fn(u32, u32) -> bool,
    ) {
        let (ox, oy, ofacing) = origin;
        self.ensure_capacity(grid.width(), grid.height());
        self.dist.fill(SENTINEL);
        self.prev_state.fill(-1);
        self.first_action.fill(None);

        let width = self.width;
        let origin_state = Self::state_index(width, ox, oy, ofacing);
        self.origin_state = origin_state;
        self.dist[origin_state] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(origin_state);

        while let Some(state) = queue.pop_front() {
            let facing_idx = (state % 4) as u8;
            let cell_idx = state / 4;
            let x = (cell_idx as u32) % width;
            let y = (cell_idx as u32) / width;
            let facing = Facing::from_index(facing_idx);
            let d = self.dist[state];

            // Right before left: when two turn directions reach the same
            // state in equal distance (e.g. a symmetric open room), the
            // first-discovered path wins, and the right-hand one should.
            let right_state = Self::state_index(width, x, y, facing.turn_right());
            Self::try_edge(
                &mut self.dist,
                &mut self.prev_state,
                &mut self.first_action,
                &mut queue,
                origin_state,
                state,
                d,
                right_state,
                Action::TurnRight,
            );
            let left_state = Self::state_index(width, x, y, facing.turn_left());
            Self::try_edge(
                &mut self.dist,
                &mut self.prev_state,
                &mut self.first_action,
                &mut queue,
                origin_state,
                state,
                d,
                left_state,
                Action::TurnLeft,
            );

            let (dx, dy) = facing.step_delta();
            let nx = x as i64 + dx as i64;
            let ny = y as i64 + dy as i64;
            if grid.walkable(nx, ny) && !blocked(nx as u32, ny as u32) {
                let step_state = Self::state_index(width, nx as u32, ny as u32, facing);
                Self::try_edge(
                    &mut self.dist,
                    &mut self.prev_state,
                    &mut self.first_action,
                    &mut queue,
                    origin_state,
                    state,
                    d,
                    step_state,
                    Action::Step,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_edge(
        dist: &mut [u32],
        prev_state: &mut [i64],
        first_action: &mut [Option<Action>],
        queue: &mut VecDeque<usize>,
        origin_state: usize,
        state: usize,
        d: u32,
        new_state: usize,
        action: Action,
    ) {
        if dist[new_state] == SENTINEL {
            dist[new_state] = d + 1;
            prev_state[new_state] = state as i64;
            first_action[new_state] = Some(if state == origin_state {
                action
            } else {
                first_action[state].unwrap_or(action)
            });
            queue.push_back(new_state);
        }
    }

    fn best_facing_for_cell(&self, x: u32, y: u32) -> Option<(Facing, u32)> {
        let mut best: Option<(Facing, u32)> = None;
        for facing in Facing::ALL {
            let idx = Self::state_index(self.width, x, y, facing);
            let d = self.dist[idx];
            if d == SENTINEL {
                continue;
            }
            match best {
                None => best = Some((facing, d)),
                Some((_, bd)) if d < bd => best = Some((facing, d)),
                _ => {}
            }
        }
        best
    }

    /// Minimum number of actions to align `(cell, any facing)`; `None` if
    /// unreachable under the admissibility used for this search.
    pub fn distance_to(&self, x: u32, y: u32) -> Option<u32> {
        self.best_facing_for_cell(x, y).map(|(_, d)| d)
    }

    /// First action along the shortest path to `(x, y)`; ties broken by
    /// lowest facing index.
    pub fn first_action_to(&self, x: u32, y: u32) -> Option<Action> {
        let (facing, _) = self.best_facing_for_cell(x, y)?;
        let idx = Self::state_index(self.width, x, y, facing);
        self.first_action[idx]
    }

    /// Cells from the origin to `(x, y)` inclusive, de-duplicated (turns
    /// contribute no new cell).
    pub fn path_to(&self, x: u32, y: u32) -> Option<Vec<(u32, u32)>> {
        let (facing, _) = self.best_facing_for_cell(x, y)?;
        let mut state = Self::state_index(self.width, x, y, facing) as i64;
        let mut cells = Vec::new();
        loop {
            let cell_idx = (state as usize) / 4;
            let cx = (cell_idx as u32) % self.width;
            let cy = (cell_idx as u32) / self.width;
            if cells.last() != Some(&(cx, cy)) {
                cells.push((cx, cy));
            }
            if state as usize == self.origin_state {
                break;
            }
            state = self.prev_state[state as usize];
        }
        cells.reverse();
        Some(cells)
    }
}
