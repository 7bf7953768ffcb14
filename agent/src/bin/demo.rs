//! Scripted demo harness: runs the decision agent for a handful of ticks
//! over a small hard-coded maze and prints the action chosen each tick,
//! mirroring the teacher's `main.rs` startup sequence (tracing init,
//! `.env` loading, `anyhow::Result` at the top level) without the web
//! server scaffolding this crate has no use for.

use maze_agent::{Config, DecisionCoordinator, SinkState, World};
use maze_core::{AgentId, AgentSnapshot, Bait, Facing};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAZE: [&str; 5] = [
    "......",
    ".####.",
    "......",
    ".#.##.",
    "......",
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maze_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let world = World::new();
    world.on_maze(6, 5, &MAZE)?;
    world.on_bait_appeared(Bait::gem(5, 4))?;
    world.on_bait_appeared(Bait::coffee(3, 0))?;
    world.on_bait_appeared(Bait::trap(2, 2))?;
    world.on_self_login(AgentSnapshot::new(AgentId(1), 0, 0, Facing::East).with_nickname("scout"));
    world.on_agent(AgentSnapshot::new(AgentId(2), 5, 0, Facing::West).with_nickname("rival"));

    let sink = SinkState::new();
    let mut coordinator = DecisionCoordinator::new();

    tracing::info!("starting demo run");
    for tick in 0..60 {
        let action = coordinator.next_move(&world, &sink, &world, &config);
        let target = sink.target();
        tracing::info!(tick, ?action, ?target, "tick");
        apply_self_action(&world, action);
        collect_bait_under_self(&world);
    }

    Ok(())
}

/// Apply the chosen action to the agent's own snapshot, the way the
/// engine would after accepting the move. The agent library never does
/// this itself: it only decides, the host world applies.
fn apply_self_action(world: &World, action: maze_core::Action) {
    let Some(snapshot) = world.self_snapshot() else {
        return;
    };
    let updated = match action {
        maze_core::Action::TurnLeft => snapshot.clone().with_facing(snapshot.facing.turn_left()),
        maze_core::Action::TurnRight => snapshot.clone().with_facing(snapshot.facing.turn_right()),
        maze_core::Action::Step => {
            let (dx, dy) = snapshot.facing.step_delta();
            let Some(grid) = world.grid() else {
                return;
            };
            let nx = snapshot.x as i64 + dx as i64;
            let ny = snapshot.y as i64 + dy as i64;
            if grid.walkable(nx, ny) {
                snapshot.clone().with_position(nx as u32, ny as u32)
            } else {
                snapshot.clone()
            }
        }
        maze_core::Action::DoNothing => snapshot.clone(),
    };
    world.on_self_update(updated);
}

fn collect_bait_under_self(world: &World) {
    if let Some(snapshot) = world.self_snapshot() {
        world.on_bait_vanished(snapshot.x, snapshot.y);
    }
}
