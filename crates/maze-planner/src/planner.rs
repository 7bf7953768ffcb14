//! The Reward Planner: a bounded best-first branch-and-bound search over
//! `(x, y, facing, collected-bait-bitmask)` nodes that picks the single
//! best first action toward a positive-utility run through reachable
//! baits, discounting candidates another agent would reach first and
//! retrying with traps permitted if the trap-forbidden pass can't clear
//! zero utility.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use maze_core::{label_for_score, Action, Bait, Facing, GridModel};

use crate::contest::ContestPredictor;
use crate::distance::PlainDistance;
use crate::node::{PlannerConfig, PlannerNode, PlanResult, Target};
use crate::search::OrientedSearch;

/// Utility deltas below this are treated as ties, never as an improvement.
const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: u32,
    y: u32,
    score: i32,
}

/// One entry in the best-first open set. Ordered by fixed-point utility
/// bound (scaled `x1000` so `BinaryHeap`'s `Ord` requirement is satisfied
/// without pulling in a float-ordering crate), then step-expansions before
/// turn-expansions, then oldest-inserted-first — all deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    bound_fixed: i64,
    is_step: bool,
    seq: u64,
    node_idx: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound_fixed
            .cmp(&other.bound_fixed)
            .then_with(|| self.is_step.cmp(&other.is_step))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn fixed(utility: f64) -> i64 {
    (utility * 1000.0).round() as i64
}

/// Reward-maximizing planner: picks up to `candidate_baits` reachable,
/// uncontested positive-score baits and searches for the best first action
/// toward collecting as many as the lookahead budget allows.
#[derive(Debug, Default)]
pub struct RewardPlanner {
    plain: PlainDistance,
    self_reach: OrientedSearch,
}

impl RewardPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan one tick's action. `occupancy_blocked(x, y)` should report any
    /// cell the agent must not step into regardless of reward (other
    /// agents, danger memory). Returns `None` when no positive-utility
    /// plan exists, in either phase.
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        &mut self,
        grid: &GridModel,
        baits: &[Bait],
        self_pos: (u32, u32),
        self_facing: Facing,
        occupancy_blocked: &dyn Fn(u32, u32) -> bool,
        contest: &ContestPredictor,
        cfg: &PlannerConfig,
    ) -> Option<PlanResult> {
        self.plain.run(grid, self_pos, &|_, _| false);

        // Rank by score/(distance+2) descending, nearer high-value baits
        // first; ties broken by coordinate for determinism.
        let mut ranked: Vec<(Candidate, f64)> = baits
            .iter()
            .filter(|b| b.score() > 0)
            .filter_map(|b| self.plain.distance_to(b.x(), b.y()).map(|d| (b, d)))
            .map(|(b, d)| {
                let ratio = b.score() as f64 / (d as f64 + 2.0);
                (Candidate { x: b.x(), y: b.y(), score: b.score() }, ratio)
            })
            .collect();
        ranked.sort_by(|(ca, ra), (cb, rb)| {
            rb.partial_cmp(ra)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ca.x.cmp(&cb.x))
                .then_with(|| ca.y.cmp(&cb.y))
        });
        ranked.truncate(cfg.candidate_baits.min(64));
        let mut candidates: Vec<Candidate> = ranked.into_iter().map(|(c, _)| c).collect();

        if candidates.is_empty() {
            return None;
        }

        // Contested-bait discounting: drop any candidate a sampled
        // opponent strictly reaches sooner than we do.
        self.self_reach.run(grid, (self_pos.0, self_pos.1, self_facing), &|_, _| false);
        candidates.retain(|c| {
            let ours = self.self_reach.distance_to(c.x, c.y);
            match (ours, contest.min_opponent_ticks_to(c.x, c.y)) {
                (Some(our_ticks), Some(their_ticks)) => their_ticks >= our_ticks,
                _ => true,
            }
        });

        if candidates.is_empty() {
            return None;
        }

        run_two_phase(grid, baits, &candidates, occupancy_blocked, self_pos, self_facing, cfg)
    }

    /// Plan toward exactly one bait, ignoring every other candidate and
    /// skipping contested-bait discounting. Used by the target stabilizer
    /// to evaluate "keep chasing the committed bait" against a fresh
    /// [`Self::plan`] result, without re-deriving the full candidate set.
    /// Returns `None` if `forced_target` is no longer a live, positive,
    /// reachable bait.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_forced(
        &mut self,
        grid: &GridModel,
        baits: &[Bait],
        self_pos: (u32, u32),
        self_facing: Facing,
        occupancy_blocked: &dyn Fn(u32, u32) -> bool,
        cfg: &PlannerConfig,
        forced_target: (u32, u32),
    ) -> Option<PlanResult> {
        let bait = baits
            .iter()
            .find(|b| b.x() == forced_target.0 && b.y() == forced_target.1 && b.score() > 0)?;
        self.plain.run(grid, self_pos, &|_, _| false);
        self.plain.distance_to(bait.x(), bait.y())?;
        let candidates = [Candidate { x: bait.x(), y: bait.y(), score: bait.score() }];
        run_two_phase(grid, baits, &candidates, occupancy_blocked, self_pos, self_facing, cfg)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_two_phase(
    grid: &GridModel,
    baits: &[Bait],
    candidates: &[Candidate],
    occupancy_blocked: &dyn Fn(u32, u32) -> bool,
    self_pos: (u32, u32),
    self_facing: Facing,
    cfg: &PlannerConfig,
) -> Option<PlanResult> {
    let trap_cells: HashMap<(u32, u32), i32> = baits
        .iter()
        .filter(|b| b.is_trap())
        .map(|b| ((b.x(), b.y()), b.score()))
        .collect();

    if let Some(result) = search_phase(
        grid,
        candidates,
        &trap_cells,
        occupancy_blocked,
        self_pos,
        self_facing,
        cfg,
        false,
    ) {
        if result.utility > 0.0 {
            return Some(result);
        }
    }

    search_phase(
        grid,
        candidates,
        &trap_cells,
        occupancy_blocked,
        self_pos,
        self_facing,
        cfg,
        true,
    )
}

#[allow(clippy::too_many_arguments)]
fn search_phase(
    grid: &GridModel,
    candidates: &[Candidate],
    trap_cells: &HashMap<(u32, u32), i32>,
    occupancy_blocked: &dyn Fn(u32, u32) -> bool,
    self_pos: (u32, u32),
    self_facing: Facing,
    cfg: &PlannerConfig,
    traps_permitted: bool,
) -> Option<PlanResult> {
    let mut arena: Vec<PlannerNode> = Vec::with_capacity(cfg.max_expansions as usize + 1);
    let mut closed: HashMap<(u32, u32, u8, u64), f64> = HashMap::new();
    let mut open: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut seq: u64 = 0;

    let root = PlannerNode::root(self_pos.0, self_pos.1, self_facing);
    arena.push(root);
    let root_u = root.utility(cfg, traps_permitted);
    closed.insert((root.x, root.y, root.facing.index(), root.collected_mask), root_u);
    let root_bound = root_u + optimistic_remaining(&root, candidates, cfg.max_depth);
    open.push(HeapEntry { bound_fixed: fixed(root_bound), is_step: false, seq, node_idx: 0 });
    seq += 1;

    let deadline = Instant::now() + Duration::from_millis(cfg.wall_clock_budget_ms);
    let mut expansions: u32 = 0;
    let mut best: Option<(usize, f64)> = None;

    while let Some(entry) = open.pop() {
        if expansions >= cfg.max_expansions || Instant::now() >= deadline {
            break;
        }
        let node = arena[entry.node_idx];
        let key = (node.x, node.y, node.facing.index(), node.collected_mask);
        let current_u = node.utility(cfg, traps_permitted);
        if let Some(&recorded) = closed.get(&key) {
            if recorded > current_u + EPS {
                continue; // superseded by a better node for this key since this entry was pushed
            }
        }
        expansions += 1;

        if node.reward > 0 && node.first_action.is_some() {
            let improves = match best {
                None => true,
                Some((_, bu)) => current_u > bu + EPS,
            };
            if improves {
                best = Some((entry.node_idx, current_u));
            }
        }

        if node.moves >= cfg.max_depth {
            continue;
        }

        let left = PlannerNode {
            x: node.x,
            y: node.y,
            facing: node.facing.turn_left(),
            moves: node.moves + 1,
            reward: node.reward,
            trap_steps: node.trap_steps,
            collected_mask: node.collected_mask,
            first_action: Some(node.first_action.unwrap_or(Action::TurnLeft)),
            parent: Some(entry.node_idx),
        };
        try_push_child(&mut arena, &mut closed, &mut open, &mut seq, cfg, candidates, traps_permitted, false, left);

        let right = PlannerNode {
            x: node.x,
            y: node.y,
            facing: node.facing.turn_right(),
            moves: node.moves + 1,
            reward: node.reward,
            trap_steps: node.trap_steps,
            collected_mask: node.collected_mask,
            first_action: Some(node.first_action.unwrap_or(Action::TurnRight)),
            parent: Some(entry.node_idx),
        };
        try_push_child(&mut arena, &mut closed, &mut open, &mut seq, cfg, candidates, traps_permitted, false, right);

        let (dx, dy) = node.facing.step_delta();
        let nx = node.x as i64 + dx as i64;
        let ny = node.y as i64 + dy as i64;
        if grid.walkable(nx, ny) && !occupancy_blocked(nx as u32, ny as u32) {
            let (ux, uy) = (nx as u32, ny as u32);
            let trap_score = trap_cells.get(&(ux, uy)).copied();
            if trap_score.is_none() || traps_permitted {
                let mut reward = node.reward;
                let mut mask = node.collected_mask;
                let mut trap_steps = node.trap_steps;
                if let Some(score) = trap_score {
                    reward += score as i64;
                    trap_steps += 1;
                }
                if let Some(ci) = candidates.iter().position(|c| c.x == ux && c.y == uy) {
                    let bit = 1u64 << ci;
                    if mask & bit == 0 {
                        mask |= bit;
                        reward += candidates[ci].score as i64;
                    }
                }
                let step_node = PlannerNode {
                    x: ux,
                    y: uy,
                    facing: node.facing,
                    moves: node.moves + 1,
                    reward,
                    trap_steps,
                    collected_mask: mask,
                    first_action: Some(node.first_action.unwrap_or(Action::Step)),
                    parent: Some(entry.node_idx),
                };
                try_push_child(&mut arena, &mut closed, &mut open, &mut seq, cfg, candidates, traps_permitted, true, step_node);
            }
        }
    }

    let (best_idx, best_u) = best?;
    let path = build_path(&arena, best_idx);
    let target = path.iter().find_map(|&(x, y)| {
        candidates
            .iter()
            .find(|c| c.x == x && c.y == y)
            .map(|c| Target { x, y, label: label_for_score(c.score) })
    });

    Some(PlanResult {
        first_action: arena[best_idx].first_action.expect("non-root best node always has a first action"),
        utility: best_u,
        path,
        target,
    })
}

#[allow(clippy::too_many_arguments)]
fn try_push_child(
    arena: &mut Vec<PlannerNode>,
    closed: &mut HashMap<(u32, u32, u8, u64), f64>,
    open: &mut BinaryHeap<HeapEntry>,
    seq: &mut u64,
    cfg: &PlannerConfig,
    candidates: &[Candidate],
    traps_permitted: bool,
    is_step: bool,
    child: PlannerNode,
) {
    let key = (child.x, child.y, child.facing.index(), child.collected_mask);
    let u = child.utility(cfg, traps_permitted);
    let improves = match closed.get(&key) {
        None => true,
        Some(&recorded) => u > recorded + EPS,
    };
    if !improves {
        return;
    }
    closed.insert(key, u);
    let node_idx = arena.len();
    arena.push(child);
    let bound = u + optimistic_remaining(&arena[node_idx], candidates, cfg.max_depth);
    open.push(HeapEntry { bound_fixed: fixed(bound), is_step, seq: *seq, node_idx });
    *seq += 1;
}

/// Optimistic upper bound on additional reward collectable in the
/// remaining lookahead: the top `min(remaining_moves, candidates.len())`
/// uncollected candidate scores, summed.
fn optimistic_remaining(node: &PlannerNode, candidates: &[Candidate], max_depth: u32) -> f64 {
    let remaining_moves = max_depth.saturating_sub(node.moves) as usize;
    if remaining_moves == 0 {
        return 0.0;
    }
    let mut uncollected: Vec<i64> = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| node.collected_mask & (1u64 << i) == 0)
        .map(|(_, c)| c.score as i64)
        .collect();
    uncollected.sort_unstable();
    let cap = remaining_moves.min(uncollected.len());
    uncollected[uncollected.len() - cap..].iter().sum::<i64>() as f64
}

fn build_path(arena: &[PlannerNode], mut idx: usize) -> Vec<(u32, u32)> {
    let mut cells = Vec::new();
    loop {
        let n = arena[idx];
        if cells.last() != Some(&(n.x, n.y)) {
            cells.push((n.x, n.y));
        }
        match n.parent {
            Some(p) => idx = p,
            None => break,
        }
    }
    cells.reverse();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_core::{Bait, GridModel};
    use pretty_assertions::assert_eq;

    fn open_grid(w: u32, h: u32) -> GridModel {
        let rows: Vec<String> = (0..h).map(|_| ".".repeat(w as usize)).collect();
        GridModel::parse(w, h, &rows).unwrap()
    }

    #[test]
    fn plans_toward_the_only_reachable_gem() {
        let grid = open_grid(5, 1);
        let baits = vec![Bait::gem(4, 0)];
        let contest = ContestPredictor::new();
        let mut planner = RewardPlanner::new();
        let result = planner
            .plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &PlannerConfig::default())
            .expect("gem is reachable and profitable");
        assert_eq!(result.first_action, Action::Step);
        assert!(result.utility > 0.0);
        assert_eq!(result.target.map(|t| t.label), Some("GEM"));
    }

    #[test]
    fn no_candidates_means_no_plan() {
        let grid = open_grid(3, 3);
        let contest = ContestPredictor::new();
        let mut planner = RewardPlanner::new();
        let result = planner.plan(&grid, &[], (0, 0), Facing::East, &|_, _| false, &contest, &PlannerConfig::default());
        assert!(result.is_none());
    }

    #[test]
    fn single_far_gem_with_tiny_budget_can_fail_to_pay_off_moves() {
        // Move cost dominates a gem so far away a tiny max_depth can't reach it.
        let grid = open_grid(50, 1);
        let baits = vec![Bait::food(49, 0)]; // low value, very far
        let contest = ContestPredictor::new();
        let mut planner = RewardPlanner::new();
        let cfg = PlannerConfig { max_depth: 2, ..PlannerConfig::default() };
        let result = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        assert!(result.is_none(), "food is unreachable within two moves, no positive-reward node exists");
    }

    #[test]
    fn trap_blocks_phase_one_but_phase_two_can_cross_it() {
        // Corridor: self at 0, trap at 1, gem at 2. Only path to the gem
        // crosses the trap, so the trap-forbidden phase has nothing to
        // plan toward and the trap-permitted fallback takes over.
        let grid = open_grid(3, 1);
        let baits = vec![Bait::trap(1, 0), Bait::gem(2, 0)];
        let contest = ContestPredictor::new();
        let mut planner = RewardPlanner::new();
        let cfg = PlannerConfig { move_cost: 1.0, ..PlannerConfig::default() };
        let result = planner
            .plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg)
            .expect("fallback phase still finds the gem, crossing the trap");
        assert_eq!(result.first_action, Action::Step);
        assert!(result.path.contains(&(2, 0)));
    }

    #[test]
    fn contested_bait_reached_sooner_by_opponent_is_pruned() {
        use maze_core::{AgentId, AgentSnapshot};
        let grid = open_grid(7, 1);
        let baits = vec![Bait::gem(6, 0)];
        let mut contest = ContestPredictor::new();
        // Opponent is three actions from the gem (two turns to face it,
        // then a step); we are six steps away facing the right way already.
        let opponents = vec![AgentSnapshot::new(AgentId(1), 5, 0, Facing::West)];
        contest.compute(&grid, &opponents, (0, 0), 5);
        let mut planner = RewardPlanner::new();
        let result = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &PlannerConfig::default());
        assert!(result.is_none(), "opponent wins the race to the only candidate, nothing left to plan toward");
    }

    #[test]
    fn occupancy_overlay_forbids_stepping_into_a_blocked_cell() {
        let grid = open_grid(3, 1);
        let baits = vec![Bait::gem(2, 0)];
        let contest = ContestPredictor::new();
        let mut planner = RewardPlanner::new();
        // (1,0) is occupied by another agent; the only route to the gem is blocked.
        let result = planner.plan(&grid, &baits, (0, 0), Facing::East, &|x, y| (x, y) == (1, 0), &contest, &PlannerConfig::default());
        assert!(result.is_none());
    }
}
