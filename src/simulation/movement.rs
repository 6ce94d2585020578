//! Per-tick movement along planned routes
//!
//! Agents advance by `speed / TICKS_PER_SECOND` cells each tick toward their
//! next waypoint. Before every micro-step the cells being entered are checked
//! for occupants; a blocked agent waits, and after enough blocked ticks its
//! route is replanned. Nobody is ever moved onto an occupied cell.

use crate::core::config::{SimulationConfig, TICKS_PER_SECOND};
use crate::core::types::Cell;
use crate::entity::agent::{Agent, Motion};
use crate::spatial::grid::GridModel;
use crate::spatial::occupancy::Occupancy;
use crate::spatial::pathfinding::{find_nearest_walkable_position, find_path};

/// Distance at which a waypoint counts as reached
pub const ARRIVAL_EPSILON: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No route to follow
    Idle,
    /// In conversation with the player
    Frozen,
    Moved,
    /// Reached the final waypoint this tick
    Arrived,
    Blocked,
    /// Blocked past the stuck threshold; a new route was planned (possibly empty)
    Replanned,
}

/// Plan a route for `motion` to `goal`.
///
/// If the goal is taken or unwalkable, the nearest free cell around it is used
/// instead. A route that avoids agents is preferred; failing that, a purely
/// static route is accepted and occupancy is left to the step checks. Returns
/// false when no route exists at all. `goal` is remembered as the destination
/// for later replans either way.
pub fn plan_route(
    grid: &GridModel,
    motion: &mut Motion,
    goal: Cell,
    occupancy: &Occupancy<'_>,
    search_radius: i32,
) -> bool {
    let start = motion.cell();
    let policy = motion.policy;

    if start == goal {
        motion.set_route(Vec::new(), goal);
        return true;
    }

    let blocked = !grid.is_walkable_for(goal, policy)
        || (policy.plans_around_agents() && occupancy.is_occupied(grid, goal));
    let target = if blocked {
        match find_nearest_walkable_position(grid, goal, occupancy, search_radius) {
            Some(cell) => cell,
            None => {
                motion.path.clear();
                motion.destination = Some(goal);
                return false;
            }
        }
    } else {
        goal
    };

    if target == start {
        motion.set_route(Vec::new(), goal);
        return true;
    }

    let mut path = route_between(grid, start, target, motion, occupancy);
    if path.is_empty() && !blocked {
        // Reachable in principle but walled in right now: settle for a cell nearby
        if let Some(near) = find_nearest_walkable_position(grid, goal, occupancy, search_radius) {
            if near == start {
                motion.set_route(Vec::new(), goal);
                return true;
            }
            path = route_between(grid, start, near, motion, occupancy);
        }
    }

    if path.is_empty() {
        motion.path.clear();
        motion.destination = Some(goal);
        motion.stuck = 0;
        return false;
    }

    tracing::trace!(%start, %goal, len = path.len(), "Route planned");
    motion.set_route(path, goal);
    true
}

fn route_between(
    grid: &GridModel,
    start: Cell,
    target: Cell,
    motion: &Motion,
    occupancy: &Occupancy<'_>,
) -> Vec<Cell> {
    let path = find_path(grid, start, target, motion.policy, true, occupancy);
    if !path.is_empty() {
        return path;
    }
    find_path(grid, start, target, motion.policy, false, occupancy)
}

/// Plan again toward the remembered destination
pub fn replan(
    grid: &GridModel,
    motion: &mut Motion,
    occupancy: &Occupancy<'_>,
    config: &SimulationConfig,
) -> bool {
    let Some(destination) = motion.destination else {
        motion.stop();
        return false;
    };
    let ok = plan_route(
        grid,
        motion,
        destination,
        occupancy,
        config.nearest_search_radius,
    );
    motion.stuck = 0;
    ok
}

/// Advance one agent by a single micro-step
pub fn step_agent(
    grid: &GridModel,
    agent: &mut Agent,
    occupancy: &Occupancy<'_>,
    config: &SimulationConfig,
) -> StepOutcome {
    if agent.in_conversation {
        return StepOutcome::Frozen;
    }
    let motion = &mut agent.motion;
    let Some(&next) = motion.path.front() else {
        return StepOutcome::Idle;
    };

    let target = next.to_vec2();
    let dist = motion.pos.distance(&target);
    if dist < ARRIVAL_EPSILON {
        motion.pos = target;
        return finish_waypoint(motion);
    }

    let current = motion.cell();
    if next != current && occupancy.is_occupied(grid, next) {
        return blocked(grid, motion, occupancy, config);
    }

    let step = motion.speed / TICKS_PER_SECOND as f32;
    let reaches = step >= dist;
    let new_pos = if reaches {
        target
    } else {
        motion.pos + (target - motion.pos).normalize() * step
    };

    let new_cell = new_pos.to_cell();
    if new_cell != current && new_cell != next && occupancy.is_occupied(grid, new_cell) {
        return blocked(grid, motion, occupancy, config);
    }

    motion.pos = new_pos;
    motion.stuck = 0;
    if reaches {
        finish_waypoint(motion)
    } else {
        StepOutcome::Moved
    }
}

fn finish_waypoint(motion: &mut Motion) -> StepOutcome {
    motion.path.pop_front();
    motion.stuck = 0;
    if motion.path.is_empty() {
        StepOutcome::Arrived
    } else {
        StepOutcome::Moved
    }
}

fn blocked(
    grid: &GridModel,
    motion: &mut Motion,
    occupancy: &Occupancy<'_>,
    config: &SimulationConfig,
) -> StepOutcome {
    motion.stuck += 1;
    let threshold = if motion.at_waypoint() {
        config.stuck_waypoint_threshold
    } else {
        config.stuck_step_threshold
    };
    if motion.stuck < threshold {
        return StepOutcome::Blocked;
    }

    let ok = replan(grid, motion, occupancy, config);
    tracing::debug!(
        cell = %motion.cell(),
        destination = ?motion.destination,
        found = ok,
        "Stuck threshold reached, replanned"
    );
    StepOutcome::Replanned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn test_walks_to_destination() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        let goal = Cell::new(23, 12);
        assert!(plan_route(&grid, &mut agent.motion, goal, &Occupancy::empty(), 3));

        let mut arrived = false;
        for _ in 0..1000 {
            if step_agent(&grid, &mut agent, &Occupancy::empty(), &config()) == StepOutcome::Arrived {
                arrived = true;
                break;
            }
        }
        assert!(arrived);
        assert_eq!(agent.cell(), goal);
        assert!(!agent.motion.is_moving());
    }

    #[test]
    fn test_step_size_follows_speed() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        agent.motion.speed = 6.0;
        plan_route(&grid, &mut agent.motion, Cell::new(25, 12), &Occupancy::empty(), 3);
        step_agent(&grid, &mut agent, &Occupancy::empty(), &config());
        assert!((agent.motion.pos.x - 20.1).abs() < 1e-4);
    }

    #[test]
    fn test_blocked_by_occupant_never_overlaps() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        agent.motion.set_route(vec![Cell::new(21, 12)], Cell::new(21, 12));
        let others = vec![Agent::test_walker(AgentId(2), Cell::new(21, 12))];
        let occ = Occupancy::new(&others, None);

        let outcome = step_agent(&grid, &mut agent, &occ, &config());
        assert_eq!(outcome, StepOutcome::Blocked);
        assert_eq!(agent.motion.pos, Cell::new(20, 12).to_vec2());
        assert_eq!(agent.motion.stuck, 1);
    }

    #[test]
    fn test_stuck_threshold_forces_replan() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        let goal = Cell::new(22, 12);
        agent.motion.set_route(vec![Cell::new(21, 12), goal], goal);
        let others = vec![Agent::test_walker(AgentId(2), Cell::new(21, 12))];
        let occ = Occupancy::new(&others, None);
        let cfg = config();

        for _ in 0..cfg.stuck_waypoint_threshold - 1 {
            assert_eq!(step_agent(&grid, &mut agent, &occ, &cfg), StepOutcome::Blocked);
        }
        assert_eq!(step_agent(&grid, &mut agent, &occ, &cfg), StepOutcome::Replanned);
        assert_eq!(agent.motion.stuck, 0);
        assert_eq!(agent.motion.destination, Some(goal));
        assert!(!agent.motion.path.contains(&Cell::new(21, 12)));
        assert_eq!(agent.motion.path.back(), Some(&goal));
    }

    #[test]
    fn test_occupied_goal_substitutes_nearest_cell() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        let goal = Cell::new(25, 12);
        let others = vec![Agent::test_walker(AgentId(2), goal)];
        let occ = Occupancy::new(&others, None);

        assert!(plan_route(&grid, &mut agent.motion, goal, &occ, 3));
        let end = *agent.motion.path.back().expect("route");
        assert_ne!(end, goal);
        assert!(end.is_adjacent(&goal));
        assert_eq!(agent.motion.destination, Some(goal));
    }

    #[test]
    fn test_conversation_freezes_movement() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 12));
        plan_route(&grid, &mut agent.motion, Cell::new(25, 12), &Occupancy::empty(), 3);
        agent.in_conversation = true;
        assert_eq!(
            step_agent(&grid, &mut agent, &Occupancy::empty(), &config()),
            StepOutcome::Frozen
        );
        assert_eq!(agent.cell(), Cell::new(20, 12));
        assert_eq!(agent.motion.path.len(), 5);
    }
}
