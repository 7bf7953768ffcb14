//! Target Stabilizer (§4.7): hysteresis over which bait the agent commits
//! to, so a borderline utility tie doesn't make the agent flip-flop
//! between two nearby baits every tick. The planner itself reruns fully
//! every tick (cheap, self-correcting); the stabilizer decides whether
//! that fresh result is worth switching to, or whether continuing toward
//! the already-committed bait is still preferred.

use maze_core::{Bait, Facing, GridModel};
use maze_planner::{PlanResult, PlannerConfig, RewardPlanner};

#[derive(Debug, Clone, Copy)]
struct Commitment {
    x: u32,
    y: u32,
    utility: f64,
    commit_until_tick: u64,
}

/// Keeps `(committed_key, commit_until_tick)` across ticks.
#[derive(Debug, Default)]
pub struct TargetStabilizer {
    committed: Option<Commitment>,
}

impl TargetStabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commitment(&self) -> Option<(u32, u32)> {
        self.committed.map(|c| (c.x, c.y))
    }

    /// Reconcile the fresh per-tick plan against any standing commitment.
    /// Returns the plan to actually execute this tick (may be a
    /// re-derived plan toward the committed bait rather than `fresh`).
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile(
        &mut self,
        planner: &mut RewardPlanner,
        grid: &GridModel,
        baits: &[Bait],
        self_pos: (u32, u32),
        self_facing: Facing,
        occupancy_blocked: &dyn Fn(u32, u32) -> bool,
        planner_cfg: &PlannerConfig,
        switch_margin: f64,
        commit_window_ticks: u32,
        current_tick: u64,
        fresh: Option<PlanResult>,
    ) -> Option<PlanResult> {
        // The committed bait vanishing (or turning non-positive) drops the
        // commit immediately, regardless of window or margin.
        if let Some(commitment) = self.committed {
            let still_live = baits
                .iter()
                .any(|b| b.x() == commitment.x && b.y() == commitment.y && b.score() > 0);
            if !still_live {
                self.committed = None;
            }
        }

        let Some(fresh) = fresh else {
            self.committed = None;
            return None;
        };

        let Some(fresh_target) = fresh.target else {
            return Some(fresh);
        };

        match self.committed {
            None => {
                self.committed = Some(Commitment {
                    x: fresh_target.x,
                    y: fresh_target.y,
                    utility: fresh.utility,
                    commit_until_tick: current_tick + commit_window_ticks as u64,
                });
                Some(fresh)
            }
            Some(commitment) if (commitment.x, commitment.y) == (fresh_target.x, fresh_target.y) => {
                self.committed = Some(Commitment { utility: fresh.utility, ..commitment });
                Some(fresh)
            }
            Some(commitment) => {
                let window_expired = current_tick >= commitment.commit_until_tick;
                let committed_plan = planner.plan_forced(
                    grid,
                    baits,
                    self_pos,
                    self_facing,
                    occupancy_blocked,
                    planner_cfg,
                    (commitment.x, commitment.y),
                );

                let Some(committed_plan) = committed_plan else {
                    // Committed bait no longer reachable under current
                    // admissibility; nothing to keep defending.
                    self.committed = Some(Commitment {
                        x: fresh_target.x,
                        y: fresh_target.y,
                        utility: fresh.utility,
                        commit_until_tick: current_tick + commit_window_ticks as u64,
                    });
                    return Some(fresh);
                };

                let clears_margin = fresh.utility >= committed_plan.utility * (1.0 + switch_margin);
                if window_expired || clears_margin {
                    self.committed = Some(Commitment {
                        x: fresh_target.x,
                        y: fresh_target.y,
                        utility: fresh.utility,
                        commit_until_tick: current_tick + commit_window_ticks as u64,
                    });
                    Some(fresh)
                } else {
                    self.committed = Some(Commitment { utility: committed_plan.utility, ..commitment });
                    Some(committed_plan)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_planner::ContestPredictor;
    use pretty_assertions::assert_eq;

    fn open_grid(w: u32, h: u32) -> GridModel {
        let rows: Vec<String> = (0..h).map(|_| ".".repeat(w as usize)).collect();
        GridModel::parse(w, h, &rows).unwrap()
    }

    #[test]
    fn first_plan_commits_with_no_prior_state() {
        let grid = open_grid(5, 1);
        let baits = vec![Bait::gem(4, 0)];
        let mut planner = RewardPlanner::new();
        let contest = ContestPredictor::new();
        let cfg = PlannerConfig::default();
        let fresh = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        let mut stabilizer = TargetStabilizer::new();
        let chosen = stabilizer.reconcile(
            &mut planner, &grid, &baits, (0, 0), Facing::East, &|_, _| false, &cfg, 0.2, 20, 0, fresh,
        );
        assert!(chosen.is_some());
        assert_eq!(stabilizer.commitment(), Some((4, 0)));
    }

    #[test]
    fn marginal_alternative_does_not_dislodge_the_commitment() {
        // Two gems of equal score at different distances: whichever is
        // committed first should stay committed since the other offers no
        // improvement at all, let alone one clearing the switch margin.
        let grid = open_grid(9, 1);
        let baits = vec![Bait::gem(3, 0), Bait::gem(7, 0)];
        let mut planner = RewardPlanner::new();
        let contest = ContestPredictor::new();
        let cfg = PlannerConfig::default();
        let mut stabilizer = TargetStabilizer::new();

        let fresh = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        let first_target = fresh.as_ref().and_then(|p| p.target).map(|t| (t.x, t.y));
        stabilizer.reconcile(&mut planner, &grid, &baits, (0, 0), Facing::East, &|_, _| false, &cfg, 0.2, 20, 0, fresh);
        assert_eq!(stabilizer.commitment(), first_target);

        // Re-plan one tick later from the same position; nothing changed,
        // so the commitment must hold.
        let fresh2 = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        stabilizer.reconcile(&mut planner, &grid, &baits, (0, 0), Facing::East, &|_, _| false, &cfg, 0.2, 20, 1, fresh2);
        assert_eq!(stabilizer.commitment(), first_target);
    }

    #[test]
    fn vanished_commitment_is_dropped_immediately() {
        let grid = open_grid(5, 1);
        let mut baits = vec![Bait::gem(4, 0)];
        let mut planner = RewardPlanner::new();
        let contest = ContestPredictor::new();
        let cfg = PlannerConfig::default();
        let mut stabilizer = TargetStabilizer::new();

        let fresh = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        stabilizer.reconcile(&mut planner, &grid, &baits, (0, 0), Facing::East, &|_, _| false, &cfg, 0.2, 20, 0, fresh);
        assert!(stabilizer.commitment().is_some());

        baits.clear();
        let fresh2 = planner.plan(&grid, &baits, (0, 0), Facing::East, &|_, _| false, &contest, &cfg);
        stabilizer.reconcile(&mut planner, &grid, &baits, (0, 0), Facing::East, &|_, _| false, &cfg, 0.2, 20, 1, fresh2);
        assert!(stabilizer.commitment().is_none());
    }
}
