//! Per-role state machines
//!
//! Each role has a mind (state enum, timers, claims) and an `update` that runs
//! once per tick. Handlers never block: they tick a countdown, request a
//! route, or change state, then return.

pub mod ambient;
pub mod bartender;
pub mod cleaner;
pub mod customer;
pub mod waiter;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::core::types::{Cell, Countdown};
use crate::entity::agent::{Agent, Behavior, Motion};
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::{CellRect, BAR_COUNTER, BAR_SERVICE_COLUMN};

/// How close staff must be to serve a customer or wipe a table
pub const SERVICE_REACH: f32 = 1.5;

/// Ticks between attempts to reach a goal after a route runs out short
pub const RETRY_BACKOFF_TICKS: u32 = 30;

pub fn within_reach(motion: &Motion, target: Cell) -> bool {
    motion.pos.distance(&target.to_vec2()) <= SERVICE_REACH
}

/// Bar service cell in line with `cell`
pub fn nearest_service_cell(cell: Cell) -> Cell {
    Cell::new(
        BAR_SERVICE_COLUMN,
        cell.r.clamp(BAR_COUNTER.min.r, BAR_COUNTER.max.r),
    )
}

pub fn at_bar(motion: &Motion) -> bool {
    within_reach(motion, nearest_service_cell(motion.cell()))
}

/// Route to the closest free bar service cell
pub fn go_to_bar(motion: &mut Motion, world: &World) -> bool {
    let here = motion.cell();
    let occupancy = world.occupancy();
    let goal = crate::spatial::layout::bar_service_cells()
        .filter(|&c| c == here || occupancy.is_free(&world.grid, c))
        .min_by(|a, b| a.distance(&here).total_cmp(&b.distance(&here)))
        .unwrap_or_else(|| nearest_service_cell(here));
    world.plan_route(motion, goal)
}

/// A random free cell in `rect` that `policy` may stand on
pub fn random_free_cell(world: &mut World, rect: &CellRect, policy: WalkPolicy) -> Option<Cell> {
    let candidates: Vec<Cell> = {
        let occupancy = world.occupancy();
        world
            .grid
            .walkable_cells_in(rect, policy)
            .into_iter()
            .filter(|&c| !occupancy.is_occupied(&world.grid, c))
            .collect()
    };
    candidates.choose(&mut world.rng).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Backing off; try again later
    Wait,
    Retry,
    GiveUp,
}

/// Bounded retries for reaching a goal. The first poll retries immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteRetry {
    pub attempts: u32,
    backoff: Countdown,
}

impl RouteRetry {
    pub fn poll(&mut self, max_attempts: u32) -> RetryStep {
        if !self.backoff.tick() {
            return RetryStep::Wait;
        }
        self.attempts += 1;
        if self.attempts > max_attempts {
            self.reset();
            return RetryStep::GiveUp;
        }
        self.backoff = Countdown::new(RETRY_BACKOFF_TICKS);
        RetryStep::Retry
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run one tick of an NPC's behavior. The agent must be detached from
/// `world.agents`.
pub fn update_agent(agent: &mut Agent, world: &mut World) {
    let Agent {
        id,
        motion,
        behavior,
        marked_for_deletion,
        ..
    } = agent;
    let id = *id;

    match behavior {
        Behavior::Player => {}
        Behavior::Customer(mind) => {
            if customer::update(id, mind, motion, world) {
                *marked_for_deletion = true;
            }
        }
        Behavior::Waiter(mind) => waiter::update(id, mind, motion, world),
        Behavior::Bartender(mind) => bartender::update(id, mind, motion, world),
        Behavior::Cleaner(mind) => cleaner::update(id, mind, motion, world),
        Behavior::Poet(mind) => ambient::update_poet(mind, motion, world),
        Behavior::Musician(mind) => ambient::update_musician(mind, world),
        Behavior::Cat(mind) => ambient::update_cat(mind, motion, world),
        Behavior::Santa(mind) => ambient::update_santa(mind, motion, world),
    }
}
