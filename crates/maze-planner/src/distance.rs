//! Plain-grid distance: a cheap step-only BFS (no facing, no turn cost)
//! used as a pre-filter before the oriented search and reward planner run.

use std::collections::VecDeque;

use maze_core::GridModel;

const SENTINEL: u32 = u32::MAX;

/// Reusable step-only BFS distance field from a single origin cell.
#[derive(Debug, Default)]
pub struct PlainDistance {
    width: u32,
    height: u32,
    dist: Vec<u32>,
}

impl PlainDistance {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, width: u32, height: u32) {
        let len = (width as usize) * (height as usize);
        if self.width != width || self.height != height || self.dist.len() != len {
            self.width = width;
            self.height = height;
            self.dist = vec![SENTINEL; len];
        }
    }

    pub fn run(&mut self, grid: &GridModel, origin: (u32, u32), blocked: &dyn Fn(u32, u32) -> bool) {
        self.ensure_capacity(grid.width(), grid.height());
        self.dist.fill(SENTINEL);

        let width = self.width;
        let (ox, oy) = origin;
        let origin_idx = (oy * width + ox) as usize;
        self.dist[origin_idx] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(origin_idx);

        const DELTAS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

        while let Some(idx) = queue.pop_front() {
            let x = (idx as u32) % width;
            let y = (idx as u32) / width;
            let d = self.dist[idx];
            for (dx, dy) in DELTAS {
                let nx = x as i64 + dx as i64;
                let ny = y as i64 + dy as i64;
                if !grid.walkable(nx, ny) || blocked(nx as u32, ny as u32) {
                    continue;
                }
                let nidx = (ny as u32 * width + nx as u32) as usize;
                if self.dist[nidx] == SENTINEL {
                    self.dist[nidx] = d + 1;
                    queue.push_back(nidx);
                }
            }
        }
    }

    pub fn distance_to(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) as usize;
        match self.dist[idx] {
            SENTINEL => None,
            d => Some(d),
        }
    }
}
