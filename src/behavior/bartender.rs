//! Bartender state machine: Idle → Moving → PreparingDrink → Idle

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::behavior::{random_free_cell, RetryStep, RouteRetry};
use crate::core::config::random_ticks;
use crate::core::types::{AgentId, Cell, Countdown, OrderId};
use crate::entity::agent::{Behavior, Motion};
use crate::simulation::orders::{claim_order_for_bartender, OrderStatus};
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::{BARTENDER_WORK_CELLS, BARTENDER_ZONE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BartenderState {
    Idle,
    /// Walking to a work cell with a claimed order
    Moving,
    PreparingDrink,
}

#[derive(Debug, Clone)]
pub struct BartenderMind {
    pub state: BartenderState,
    pub timer: Countdown,
    pub order: Option<OrderId>,
    pub work_cell: Option<Cell>,
    /// Ticks until the next shuffle behind the counter
    pub wander: Countdown,
    pub retry: RouteRetry,
}

impl BartenderMind {
    pub fn new() -> Self {
        Self {
            state: BartenderState::Idle,
            timer: Countdown::default(),
            order: None,
            work_cell: None,
            wander: Countdown::default(),
            retry: RouteRetry::default(),
        }
    }
}

impl Default for BartenderMind {
    fn default() -> Self {
        Self::new()
    }
}

pub fn update(id: AgentId, mind: &mut BartenderMind, motion: &mut Motion, world: &mut World) {
    let before = mind.state;
    match mind.state {
        BartenderState::Idle => update_idle(id, mind, motion, world),
        BartenderState::Moving => update_moving(id, mind, motion, world),
        BartenderState::PreparingDrink => update_preparing(id, mind, world),
    }
    if mind.state != before {
        tracing::debug!(id = %id, from = ?before, to = ?mind.state, "Bartender state change");
    }
}

/// Work cells other bartenders are already walking to
fn reserved_work_cells(world: &World) -> Vec<Cell> {
    world
        .agents
        .iter()
        .filter_map(|a| match &a.behavior {
            Behavior::Bartender(m) if m.state == BartenderState::Moving => m.work_cell,
            _ => None,
        })
        .collect()
}

/// Shuffle the work cells and take the first one nobody stands on or heads to
fn pick_work_cell(world: &mut World) -> Option<Cell> {
    let reserved = reserved_work_cells(world);
    let mut cells = BARTENDER_WORK_CELLS.to_vec();
    cells.shuffle(&mut world.rng);
    let occupancy = world.occupancy();
    cells
        .into_iter()
        .find(|c| !reserved.contains(c) && !occupancy.is_occupied(&world.grid, *c))
}

fn update_idle(id: AgentId, mind: &mut BartenderMind, motion: &mut Motion, world: &mut World) {
    if let Some(order) = claim_order_for_bartender(&mut world.orders, id) {
        mind.order = Some(order);
        mind.retry.reset();
        let here = motion.cell();

        if BARTENDER_WORK_CELLS.contains(&here) && !reserved_work_cells(world).contains(&here) {
            motion.stop();
            mind.work_cell = Some(here);
            start_preparing(id, mind, world);
            return;
        }

        match pick_work_cell(world) {
            Some(cell) => {
                mind.work_cell = Some(cell);
                mind.state = BartenderState::Moving;
                world.plan_route(motion, cell);
            }
            None => {
                // Every station taken; hand the order back and try again next tick
                world.orders.release_bartender(order);
                mind.order = None;
            }
        }
        return;
    }

    if motion.is_moving() {
        return;
    }
    if mind.wander.tick() {
        if let Some(cell) = random_free_cell(world, &BARTENDER_ZONE, WalkPolicy::Standard) {
            world.plan_route(motion, cell);
        }
        mind.wander = Countdown::new(random_ticks(&mut world.rng, world.config.bartender_wander_secs));
    }
}

fn update_moving(id: AgentId, mind: &mut BartenderMind, motion: &mut Motion, world: &mut World) {
    let Some(work_cell) = mind.work_cell else {
        mind.state = BartenderState::Idle;
        return;
    };
    if motion.is_moving() {
        return;
    }
    if motion.cell() == work_cell {
        start_preparing(id, mind, world);
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            world.plan_route(motion, work_cell);
        }
        RetryStep::GiveUp => {
            tracing::warn!(id = %id, %work_cell, "Bartender could not reach work cell, preparing in place");
            motion.stop();
            mind.work_cell = Some(motion.cell());
            start_preparing(id, mind, world);
        }
    }
}

fn start_preparing(id: AgentId, mind: &mut BartenderMind, world: &mut World) {
    let Some(order) = mind.order else {
        mind.state = BartenderState::Idle;
        return;
    };
    if let Err(err) = world.orders.advance(order, OrderStatus::Preparing) {
        tracing::warn!(id = %id, %err, "Could not start order");
        mind.order = None;
        mind.state = BartenderState::Idle;
        return;
    }
    mind.retry.reset();
    mind.timer = Countdown::new(random_ticks(&mut world.rng, world.config.prepare_secs));
    mind.state = BartenderState::PreparingDrink;
    tracing::debug!(id = %id, ?order, ticks = mind.timer.remaining(), "Preparing drink");
}

fn update_preparing(id: AgentId, mind: &mut BartenderMind, world: &mut World) {
    if !mind.timer.tick() {
        return;
    }
    if let Some(order) = mind.order.take() {
        match world.orders.publish_ready(order) {
            Ok(()) => world.emit(SimulationEvent::OrderReady { order, bartender: id }),
            Err(err) => tracing::warn!(id = %id, %err, "Could not publish drink"),
        }
    }
    mind.work_cell = None;
    mind.state = BartenderState::Idle;
    mind.wander = Countdown::new(random_ticks(&mut world.rng, world.config.bartender_wander_secs));
}
