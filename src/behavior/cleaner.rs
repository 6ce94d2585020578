//! Cleaner state machine
//!
//! Idle → GoingToClean → Cleaning → Idle, with Wandering while there is
//! nothing to clean. A table stays on the dirty list until it has been wiped.

use serde::Serialize;

use crate::behavior::{random_free_cell, within_reach, RetryStep, RouteRetry};
use crate::core::config::secs_to_ticks;
use crate::core::types::{AgentId, Cell, Countdown};
use crate::entity::agent::Motion;
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::WANDER_ZONES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CleanerState {
    Idle,
    GoingToClean,
    Cleaning,
    Wandering,
}

#[derive(Debug, Clone)]
pub struct CleanerMind {
    pub state: CleanerState,
    pub timer: Countdown,
    pub target: Option<Cell>,
    pub idle_ticks: u32,
    pub retry: RouteRetry,
}

impl CleanerMind {
    pub fn new() -> Self {
        Self {
            state: CleanerState::Idle,
            timer: Countdown::default(),
            target: None,
            idle_ticks: 0,
            retry: RouteRetry::default(),
        }
    }
}

impl Default for CleanerMind {
    fn default() -> Self {
        Self::new()
    }
}

pub fn update(id: AgentId, mind: &mut CleanerMind, motion: &mut Motion, world: &mut World) {
    let before = mind.state;
    match mind.state {
        CleanerState::Idle => update_idle(mind, motion, world),
        CleanerState::Wandering => update_wandering(mind, motion, world),
        CleanerState::GoingToClean => update_going(id, mind, motion, world),
        CleanerState::Cleaning => update_cleaning(id, mind, world),
    }
    if mind.state != before {
        tracing::debug!(id = %id, from = ?before, to = ?mind.state, "Cleaner state change");
    }
}

/// Head for the oldest dirty table, if any. Returns whether one was taken.
fn take_dirty_table(mind: &mut CleanerMind, motion: &mut Motion, world: &mut World) -> bool {
    let Some(&table) = world.dirty_tables.front() else {
        return false;
    };
    mind.target = Some(table);
    mind.state = CleanerState::GoingToClean;
    mind.idle_ticks = 0;
    mind.retry.reset();
    motion.stop();
    world.plan_next_to(motion, table);
    true
}

fn update_idle(mind: &mut CleanerMind, motion: &mut Motion, world: &mut World) {
    if take_dirty_table(mind, motion, world) {
        return;
    }
    mind.idle_ticks += 1;
    if mind.idle_ticks >= secs_to_ticks(world.config.cleaner_idle_wander_secs) {
        mind.idle_ticks = 0;
        mind.state = CleanerState::Wandering;
        mind.timer = Countdown::default();
    }
}

fn update_wandering(mind: &mut CleanerMind, motion: &mut Motion, world: &mut World) {
    if take_dirty_table(mind, motion, world) {
        return;
    }
    if mind.timer.tick() {
        let zone = WANDER_ZONES[world.tick as usize % WANDER_ZONES.len()];
        if let Some(cell) = random_free_cell(world, &zone, WalkPolicy::Standard) {
            world.plan_route(motion, cell);
        }
        mind.timer = Countdown::new(secs_to_ticks(world.config.cleaner_wander_repath_secs));
    }
}

fn update_going(id: AgentId, mind: &mut CleanerMind, motion: &mut Motion, world: &mut World) {
    let Some(target) = mind.target else {
        mind.state = CleanerState::Idle;
        return;
    };
    if !world.dirty_tables.contains(&target) {
        mind.target = None;
        mind.state = CleanerState::Idle;
        return;
    }
    if motion.is_moving() {
        return;
    }

    if within_reach(motion, target) {
        mind.retry.reset();
        mind.timer = Countdown::new(secs_to_ticks(world.config.cleaning_secs));
        mind.state = CleanerState::Cleaning;
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            world.plan_next_to(motion, target);
        }
        RetryStep::GiveUp => {
            // Send it to the back of the list so other tables get a turn
            tracing::warn!(id = %id, %target, "Cleaner could not reach table");
            world.dirty_tables.retain(|&c| c != target);
            world.dirty_tables.push_back(target);
            mind.target = None;
            mind.state = CleanerState::Idle;
        }
    }
}

fn update_cleaning(id: AgentId, mind: &mut CleanerMind, world: &mut World) {
    if !mind.timer.tick() {
        return;
    }
    if let Some(table) = mind.target.take() {
        world.dirty_tables.retain(|&c| c != table);
        world.emit(SimulationEvent::TableCleaned { table, cleaner: id });
        tracing::debug!(id = %id, %table, "Table cleaned");
    }
    mind.state = CleanerState::Idle;
}
