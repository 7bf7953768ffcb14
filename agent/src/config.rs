//! Runtime configuration, loaded the way the teacher loads its server
//! config: environment variables with sensible defaults, `anyhow` surfacing
//! a descriptive error at startup rather than a panic deep inside the
//! planner.

use std::collections::HashMap;
use std::env;

use maze_planner::PlannerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub max_depth: u32,
    pub max_expansions: u32,
    pub candidate_baits: usize,
    pub move_cost: f64,
    pub trap_step_penalty: f64,
    pub planner_wall_clock_budget_ms: u64,
    pub commit_window_ticks: u32,
    pub switch_margin_percent: f64,
    /// TTL, in ticks, for the last-mile danger-memory bias. Unjustified in
    /// the source material; kept as a tunable rather than hard-coded.
    pub danger_memory_ticks: u32,
    /// Cap on how many opponents the contest predictor samples when there
    /// are more candidates than that; nearest-by-Manhattan-distance wins.
    pub contest_max_opponents: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 40,
            max_expansions: 6000,
            candidate_baits: 24,
            move_cost: 6.0,
            trap_step_penalty: 250.0,
            planner_wall_clock_budget_ms: 8,
            commit_window_ticks: 20,
            switch_margin_percent: 22.5,
            danger_memory_ticks: 250,
            contest_max_opponents: 8,
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to the defaults
    /// above for anything unset. Malformed values are a startup error, not
    /// a panic.
    pub fn from_env() -> anyhow::Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_map(&vars)
    }

    /// As [`Self::from_env`], but reading from an in-memory map so unit
    /// tests don't need to mutate the process environment.
    pub fn from_map(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let parse = |key: &str, default: u32| -> anyhow::Result<u32> {
            match vars.get(key) {
                Some(v) => Ok(v.parse()?),
                None => Ok(default),
            }
        };
        let parse_u64 = |key: &str, default: u64| -> anyhow::Result<u64> {
            match vars.get(key) {
                Some(v) => Ok(v.parse()?),
                None => Ok(default),
            }
        };
        let parse_f64 = |key: &str, default: f64| -> anyhow::Result<f64> {
            match vars.get(key) {
                Some(v) => Ok(v.parse()?),
                None => Ok(default),
            }
        };
        let parse_usize = |key: &str, default: usize| -> anyhow::Result<usize> {
            match vars.get(key) {
                Some(v) => Ok(v.parse()?),
                None => Ok(default),
            }
        };

        let candidate_baits = parse_usize("MAZE_CANDIDATE_BAITS", defaults.candidate_baits)?;
        if candidate_baits == 0 || candidate_baits > 64 {
            anyhow::bail!("MAZE_CANDIDATE_BAITS must be in 1..=64, got {candidate_baits}");
        }

        let config = Self {
            max_depth: parse("MAZE_MAX_DEPTH", defaults.max_depth)?,
            max_expansions: parse("MAZE_MAX_EXPANSIONS", defaults.max_expansions)?,
            candidate_baits,
            move_cost: parse_f64("MAZE_MOVE_COST", defaults.move_cost)?,
            trap_step_penalty: parse_f64("MAZE_TRAP_STEP_PENALTY", defaults.trap_step_penalty)?,
            planner_wall_clock_budget_ms: parse_u64(
                "MAZE_PLANNER_WALL_CLOCK_BUDGET_MS",
                defaults.planner_wall_clock_budget_ms,
            )?,
            commit_window_ticks: parse("MAZE_COMMIT_WINDOW_TICKS", defaults.commit_window_ticks)?,
            switch_margin_percent: parse_f64(
                "MAZE_SWITCH_MARGIN_PERCENT",
                defaults.switch_margin_percent,
            )?,
            danger_memory_ticks: parse("MAZE_DANGER_MEMORY_TICKS", defaults.danger_memory_ticks)?,
            contest_max_opponents: parse_usize(
                "MAZE_CONTEST_MAX_OPPONENTS",
                defaults.contest_max_opponents,
            )?,
        };

        if config.switch_margin_percent < 0.0 {
            anyhow::bail!("MAZE_SWITCH_MARGIN_PERCENT must be non-negative");
        }

        Ok(config)
    }

    /// The stabilizer's switch margin as a fraction (e.g. `22.5` -> `0.225`).
    pub fn switch_margin(&self) -> f64 {
        self.switch_margin_percent / 100.0
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_depth: self.max_depth,
            max_expansions: self.max_expansions,
            candidate_baits: self.candidate_baits,
            move_cost: self.move_cost,
            trap_step_penalty: self.trap_step_penalty,
            wall_clock_budget_ms: self.planner_wall_clock_budget_ms,
        }
    }
}
