//! The Decision Coordinator (§4.9): the state machine that turns a world
//! snapshot into exactly one legal action per tick, plus last-mile
//! collision avoidance (§4.8) applied to whatever the planner/stabilizer
//! agreed on.

use std::collections::HashMap;

use maze_core::{Action, AgentSnapshot, Facing, GridModel};
use maze_planner::{ContestPredictor, RewardPlanner};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AgentError, DecisionKind};
use crate::stabilizer::TargetStabilizer;
use crate::world::{ControlPanel, VisualizationSink, WorldProvider};

/// Cells the agent recently swerved away from, biased against for a few
/// ticks so it doesn't immediately route straight back into the same
/// near-miss. TTL per `Config::danger_memory_ticks`.
#[derive(Debug, Default)]
struct DangerMemory {
    expires_at: HashMap<(u32, u32), u64>,
}

impl DangerMemory {
    fn mark(&mut self, cell: (u32, u32), current_tick: u64, ttl: u32) {
        self.expires_at.insert(cell, current_tick + ttl as u64);
    }

    fn is_dangerous(&self, cell: (u32, u32), current_tick: u64) -> bool {
        matches!(self.expires_at.get(&cell), Some(&expiry) if expiry > current_tick)
    }
}

/// Ties the planner, contest predictor and stabilizer together into the
/// single `next_move` entry point the tick driver calls.
#[derive(Debug, Default)]
pub struct DecisionCoordinator {
    planner: RewardPlanner,
    contest: ContestPredictor,
    stabilizer: TargetStabilizer,
    danger: DangerMemory,
    tick: u64,
}

impl DecisionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_move(
        &mut self,
        world: &dyn WorldProvider,
        sink: &dyn VisualizationSink,
        control: &dyn ControlPanel,
        cfg: &Config,
    ) -> Action {
        let tick = self.tick;
        self.tick += 1;

        let grid = match world.grid().ok_or(AgentError::NotReady("maze not ready")) {
            Ok(grid) => grid,
            Err(err) => return log_and_classify(err, tick),
        };
        let self_snapshot = match world.self_snapshot().ok_or(AgentError::NotReady("self not known")) {
            Ok(snapshot) => snapshot,
            Err(err) => return log_and_classify(err, tick),
        };

        if control.paused() {
            debug!(tick, "paused");
            return Action::DoNothing;
        }

        let self_pos = (self_snapshot.x, self_snapshot.y);
        let self_facing = self_snapshot.facing;
        let baits = world.baits();
        let others = world.other_agents();

        self.contest.compute(&grid, &others, self_pos, cfg.contest_max_opponents);

        let danger = &self.danger;
        let occupancy_blocked = |x: u32, y: u32| -> bool {
            others.iter().any(|o| o.x == x && o.y == y) || danger.is_dangerous((x, y), tick)
        };

        let planner_cfg = cfg.planner_config();
        let fresh = self.planner.plan(&grid, &baits, self_pos, self_facing, &occupancy_blocked, &self.contest, &planner_cfg);

        let chosen = self.stabilizer.reconcile(
            &mut self.planner,
            &grid,
            &baits,
            self_pos,
            self_facing,
            &occupancy_blocked,
            &planner_cfg,
            cfg.switch_margin(),
            cfg.commit_window_ticks,
            tick,
            fresh,
        );

        let plan = match chosen.ok_or(AgentError::NoPlan("planner found no positive-utility route")) {
            Ok(plan) => plan,
            Err(err) => {
                sink.clear_target();
                sink.set_planned_path(&[]);
                let fallback = fallback_action(&grid, self_pos, self_facing, &occupancy_blocked);
                return log_and_classify_with(err, tick, fallback);
            }
        };

        match plan.target {
            Some(t) => sink.set_target(t.x, t.y, Some(t.label)),
            None => sink.clear_target(),
        }
        sink.set_planned_path(&plan.path);

        let action = last_mile(plan.first_action, &grid, self_pos, self_facing, &occupancy_blocked, &others);
        if plan.first_action == Action::Step && action != Action::Step {
            let (dx, dy) = self_facing.step_delta();
            let forward = (
                (self_pos.0 as i64 + dx as i64) as u32,
                (self_pos.1 as i64 + dy as i64) as u32,
            );
            self.danger.mark(forward, tick, cfg.danger_memory_ticks);
        }
        action
    }
}

/// Maps an error onto its `DecisionKind` and the bare `DoNothing` every
/// kind resolves to before any plan or fallback has been computed.
/// `NotReady` is the only kind `next_move` raises at this point; the rest
/// are matched so the conversion stays exhaustive against `DecisionKind`
/// per §7 — `InvalidInput` is dropped at the `world.rs` ingestion
/// boundary, `BudgetExceeded` is absorbed by the planner as a best-effort
/// result rather than surfaced, and `StaleTarget` is cleared inside the
/// stabilizer, so none of the three ever reach here in practice.
fn log_and_classify(err: AgentError, tick: u64) -> Action {
    match err.kind() {
        DecisionKind::NotReady => {
            debug!(tick, %err, "idle");
        }
        DecisionKind::NoPlan
        | DecisionKind::InvalidInput
        | DecisionKind::BudgetExceeded
        | DecisionKind::StaleTarget => {
            debug!(tick, %err, "decision error with no fallback computed, doing nothing");
        }
    }
    Action::DoNothing
}

/// As [`log_and_classify`], but for the point in `next_move` where a
/// fallback action has already been computed: `NoPlan` is the kind raised
/// here, logged at `warn` per §7, and resolves to that fallback.
fn log_and_classify_with(err: AgentError, tick: u64, fallback: Action) -> Action {
    match err.kind() {
        DecisionKind::NoPlan => {
            warn!(tick, %err, "no plan: falling back");
        }
        DecisionKind::NotReady
        | DecisionKind::InvalidInput
        | DecisionKind::BudgetExceeded
        | DecisionKind::StaleTarget => {
            debug!(tick, %err, "unexpected decision error, falling back anyway");
        }
    }
    fallback
}

fn cell_admissible(grid: &GridModel, pos: (u32, u32), facing: Facing, occupancy_blocked: &dyn Fn(u32, u32) -> bool) -> bool {
    let (dx, dy) = facing.step_delta();
    let nx = pos.0 as i64 + dx as i64;
    let ny = pos.1 as i64 + dy as i64;
    grid.walkable(nx, ny) && !occupancy_blocked(nx as u32, ny as u32)
}

/// `Fallback` state (§4.9): step forward if admissible, otherwise turn
/// left. Exists purely to avoid the "does nothing" failure mode.
fn fallback_action(grid: &GridModel, self_pos: (u32, u32), self_facing: Facing, occupancy_blocked: &dyn Fn(u32, u32) -> bool) -> Action {
    if cell_admissible(grid, self_pos, self_facing, occupancy_blocked) {
        Action::Step
    } else {
        Action::TurnLeft
    }
}

/// Last-mile collision avoidance (§4.8). Only `Step` is second-guessed;
/// turns and `DoNothing` pass straight through.
fn last_mile(
    action: Action,
    grid: &GridModel,
    self_pos: (u32, u32),
    self_facing: Facing,
    occupancy_blocked: &dyn Fn(u32, u32) -> bool,
    others: &[AgentSnapshot],
) -> Action {
    if action != Action::Step {
        return action;
    }

    let (dx, dy) = self_facing.step_delta();
    let nx = self_pos.0 as i64 + dx as i64;
    let ny = self_pos.1 as i64 + dy as i64;
    let admissible = grid.walkable(nx, ny) && !occupancy_blocked(nx as u32, ny as u32);
    let collision = others.iter().any(|o| {
        let (odx, ody) = o.facing.step_delta();
        let ox = o.x as i64 + odx as i64;
        let oy = o.y as i64 + ody as i64;
        ox == nx && oy == ny
    });

    if admissible && !collision {
        return Action::Step;
    }

    let left = self_facing.turn_left();
    let right = self_facing.turn_right();
    if cell_admissible(grid, self_pos, left, occupancy_blocked) {
        Action::TurnLeft
    } else if cell_admissible(grid, self_pos, right, occupancy_blocked) {
        Action::TurnRight
    } else {
        // Neither rotation helps; let the engine handle the collision.
        Action::Step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{SinkState, World};
    use maze_core::{AgentId, Bait};
    use pretty_assertions::assert_eq;

    fn setup_open(w: u32, h: u32) -> World {
        let world = World::new();
        let rows: Vec<String> = (0..h).map(|_| ".".repeat(w as usize)).collect();
        world.on_maze(w, h, &rows).unwrap();
        world
    }

    #[test]
    fn idle_until_maze_and_self_known() {
        let world = World::new();
        let sink = SinkState::new();
        let mut coordinator = DecisionCoordinator::new();
        let cfg = Config::default();
        assert_eq!(coordinator.next_move(&world, &sink, &world, &cfg), Action::DoNothing);
    }

    #[test]
    fn paused_emits_do_nothing_even_when_ready() {
        let world = setup_open(3, 3);
        world.on_self_login(AgentSnapshot::new(AgentId(1), 0, 0, Facing::East));
        world.on_pause_toggle(true);
        let sink = SinkState::new();
        let mut coordinator = DecisionCoordinator::new();
        let cfg = Config::default();
        assert_eq!(coordinator.next_move(&world, &sink, &world, &cfg), Action::DoNothing);
    }

    #[test]
    fn no_baits_falls_back_to_step_or_turn() {
        let world = setup_open(3, 3);
        world.on_self_login(AgentSnapshot::new(AgentId(1), 1, 1, Facing::East));
        let sink = SinkState::new();
        let mut coordinator = DecisionCoordinator::new();
        let cfg = Config::default();
        let action = coordinator.next_move(&world, &sink, &world, &cfg);
        assert!(action == Action::Step || action == Action::TurnLeft);
    }

    #[test]
    fn reachable_gem_drives_toward_target() {
        let world = setup_open(5, 1);
        world.on_self_login(AgentSnapshot::new(AgentId(1), 0, 0, Facing::East));
        world.on_bait_appeared(Bait::gem(4, 0)).unwrap();
        let sink = SinkState::new();
        let mut coordinator = DecisionCoordinator::new();
        let cfg = Config::default();
        let action = coordinator.next_move(&world, &sink, &world, &cfg);
        assert_eq!(action, Action::Step);
        assert_eq!(sink.target().map(|(x, y, _)| (x, y)), Some((4, 0)));
    }

    #[test]
    fn last_mile_substitutes_rotation_when_forward_cell_is_occupied() {
        let rows: Vec<String> = (0..3).map(|_| "...".to_string()).collect();
        let grid = GridModel::parse(3, 3, &rows).unwrap();
        // Self at (1,1) facing East; (2,1) is occupied, forcing a swerve.
        // North (1,0) is open, so the coordinator should turn left.
        let action = last_mile(Action::Step, &grid, (1, 1), Facing::East, &|x, y| (x, y) == (2, 1), &[]);
        assert_eq!(action, Action::TurnLeft);
    }

    #[test]
    fn last_mile_predicts_an_opponent_stepping_into_the_same_cell() {
        let rows: Vec<String> = (0..3).map(|_| "...".to_string()).collect();
        let grid = GridModel::parse(3, 3, &rows).unwrap();
        // Opponent at (2,0) facing South predicts stepping into (2,1),
        // which is also our intended forward cell.
        let opponent = AgentSnapshot::new(AgentId(9), 2, 0, Facing::South);
        let action = last_mile(Action::Step, &grid, (1, 1), Facing::East, &|_, _| false, &[opponent]);
        assert_eq!(action, Action::TurnLeft);
    }
}
