//! Customer state machine
//!
//! Entering → Seated → ReadyToOrder → WaitingForWaiter → Ordering →
//! WaitingDrink → Drinking → {Dancing | Sleeping | Leaving}
//!
//! Waiters drive Ordering and WaitingDrink from the outside; every other
//! transition happens here. A customer holds at most one seat, and the seat's
//! occupied flag is only ever cleared together with `mind.seat`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::behavior::{RetryStep, RouteRetry};
use crate::core::config::{random_ticks, secs_to_ticks};
use crate::core::types::{AgentId, Cell, Countdown, OrderId};
use crate::entity::agent::Motion;
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::layout::{DANCE_FLOOR_CENTER, DANCE_SPOT_SPREAD, ENTRANCES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CustomerState {
    Entering,
    Seated,
    ReadyToOrder,
    WaitingForWaiter,
    Ordering,
    WaitingDrink,
    Drinking,
    Dancing,
    Sleeping,
    Leaving,
}

/// Wake-up roll thresholds: below the first drink again, below the second
/// order again, otherwise try the dance floor
const WAKE_DRINK_AGAIN: f64 = 0.3;
const WAKE_ORDER_AGAIN: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct DanceRoutine {
    pub spots: Vec<Cell>,
    pub index: usize,
    pub step_timer: Countdown,
    pub remaining: Countdown,
}

#[derive(Debug, Clone)]
pub struct CustomerMind {
    pub state: CustomerState,
    pub timer: Countdown,
    /// Index into the world's seating plan
    pub seat: Option<usize>,
    /// Waiter with exclusive responsibility for this customer
    pub claimed_by: Option<AgentId>,
    pub order: Option<OrderId>,
    /// Total ticks spent in Drinking, across drinks
    pub drinking_ticks: u32,
    /// The sleep roll happens once per visit
    pub sleep_checked: bool,
    pub dance: Option<DanceRoutine>,
    /// Dancing now, but the seat is kept for afterwards
    pub dance_then_seat: bool,
    pub retry: RouteRetry,
}

impl CustomerMind {
    /// Walking in toward a reserved seat
    pub fn entering(seat: usize) -> Self {
        Self {
            state: CustomerState::Entering,
            timer: Countdown::default(),
            seat: Some(seat),
            claimed_by: None,
            order: None,
            drinking_ticks: 0,
            sleep_checked: false,
            dance: None,
            dance_then_seat: false,
            retry: RouteRetry::default(),
        }
    }

    /// Already sitting, waiting `ticks` before ordering
    pub fn seated(seat: usize, ticks: u32) -> Self {
        Self {
            state: CustomerState::Seated,
            timer: Countdown::new(ticks),
            ..Self::entering(seat)
        }
    }

    pub fn is_dancing(&self) -> bool {
        self.state == CustomerState::Dancing
    }
}

/// Run one tick. Returns true once the customer has left the tavern.
pub fn update(id: AgentId, mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) -> bool {
    let before = mind.state;
    let departed = match mind.state {
        CustomerState::Entering => {
            update_entering(mind, motion, world);
            false
        }
        CustomerState::Seated => {
            if mind.timer.tick() {
                mind.state = CustomerState::ReadyToOrder;
            }
            false
        }
        CustomerState::ReadyToOrder => {
            mind.claimed_by = None;
            mind.state = CustomerState::WaitingForWaiter;
            false
        }
        // Waiters move the customer on from here
        CustomerState::WaitingForWaiter | CustomerState::Ordering | CustomerState::WaitingDrink => {
            false
        }
        CustomerState::Drinking => {
            update_drinking(mind, motion, world);
            false
        }
        CustomerState::Sleeping => {
            update_sleeping(mind, motion, world);
            false
        }
        CustomerState::Dancing => {
            update_dancing(mind, motion, world);
            false
        }
        CustomerState::Leaving => update_leaving(id, mind, motion, world),
    };

    if mind.state != before {
        tracing::debug!(id = %id, from = ?before, to = ?mind.state, "Customer state change");
        world.emit(SimulationEvent::CustomerStateChanged {
            id,
            from: before,
            to: mind.state,
        });
    }
    departed
}

fn update_entering(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    if motion.is_moving() {
        return;
    }
    let Some(seat_cell) = mind.seat.and_then(|s| world.seating.seat(s)).map(|s| s.cell) else {
        start_leaving(mind, motion, world);
        return;
    };

    if motion.cell() == seat_cell {
        motion.stop();
        mind.retry.reset();
        mind.state = CustomerState::Seated;
        mind.timer = Countdown::new(random_ticks(&mut world.rng, world.config.seated_wait_secs));
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            world.plan_route(motion, seat_cell);
        }
        RetryStep::GiveUp => {
            tracing::warn!(seat = %seat_cell, "Customer could not reach their seat, leaving");
            start_leaving(mind, motion, world);
        }
    }
}

fn update_drinking(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    mind.drinking_ticks += 1;

    if !mind.sleep_checked && mind.drinking_ticks >= secs_to_ticks(world.config.sleep_threshold_secs) {
        mind.sleep_checked = true;
        if world.rng.gen_bool(world.config.sleep_probability) {
            mind.state = CustomerState::Sleeping;
            mind.timer = Countdown::new(random_ticks(&mut world.rng, world.config.sleep_secs));
            return;
        }
    }

    if !mind.timer.tick() {
        return;
    }

    // Finished the drink: the seat goes back and the table needs a wipe
    if let Some(seat) = mind.seat.take() {
        world.release_seat(seat);
    }
    let wants_dance = world.rng.gen_bool(world.config.dance_probability);
    if wants_dance && world.dancer_count() < world.config.dance_capacity {
        start_dancing(mind, motion, world, false);
    } else {
        start_leaving(mind, motion, world);
    }
}

fn update_sleeping(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    if !mind.timer.tick() {
        return;
    }
    let roll: f64 = world.rng.gen();
    if roll < WAKE_DRINK_AGAIN {
        mind.state = CustomerState::Drinking;
        mind.timer = Countdown::new(random_ticks(&mut world.rng, world.config.drinking_secs));
    } else if roll < WAKE_ORDER_AGAIN || world.dancer_count() >= world.config.dance_capacity {
        mind.state = CustomerState::ReadyToOrder;
    } else {
        start_dancing(mind, motion, world, true);
    }
}

fn update_dancing(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    let Some(routine) = mind.dance.as_mut() else {
        finish_dancing(mind, motion, world);
        return;
    };

    if routine.remaining.tick() {
        finish_dancing(mind, motion, world);
        return;
    }

    if !motion.is_moving() && routine.step_timer.tick() {
        routine.index = (routine.index + 1) % routine.spots.len().max(1);
        if let Some(&spot) = routine.spots.get(routine.index) {
            world.plan_route(motion, spot);
        }
        routine.step_timer = Countdown::new(random_ticks(&mut world.rng, world.config.dance_step_secs));
    }
}

/// Head for the dance floor with 2 to 4 distinct spots to cycle through.
/// `keep_seat` holds the seat for afterwards.
pub fn start_dancing(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World, keep_seat: bool) {
    let mut floor: Vec<Cell> = (-DANCE_SPOT_SPREAD..=DANCE_SPOT_SPREAD)
        .flat_map(|dr| {
            (-DANCE_SPOT_SPREAD..=DANCE_SPOT_SPREAD).map(move |dc| DANCE_FLOOR_CENTER.offset(dc, dr))
        })
        .filter(|&c| world.grid.is_walkable(c))
        .collect();
    floor.shuffle(&mut world.rng);
    let count = world.rng.gen_range(2..=4).min(floor.len());
    floor.truncate(count);

    if floor.is_empty() {
        start_leaving(mind, motion, world);
        return;
    }

    world.plan_route(motion, floor[0]);
    mind.dance = Some(DanceRoutine {
        spots: floor,
        index: 0,
        step_timer: Countdown::new(random_ticks(&mut world.rng, world.config.dance_step_secs)),
        remaining: Countdown::new(random_ticks(&mut world.rng, world.config.dance_secs)),
    });
    mind.dance_then_seat = keep_seat && mind.seat.is_some();
    mind.state = CustomerState::Dancing;
}

fn finish_dancing(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    mind.dance = None;
    let held_seat = mind
        .seat
        .filter(|_| mind.dance_then_seat)
        .and_then(|s| world.seating.seat(s))
        .map(|s| s.cell);
    mind.dance_then_seat = false;

    match held_seat {
        Some(seat_cell) => {
            mind.retry.reset();
            mind.state = CustomerState::Entering;
            world.plan_route(motion, seat_cell);
        }
        None => start_leaving(mind, motion, world),
    }
}

/// Give up any seat and walk to the nearest entrance
pub fn start_leaving(mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) {
    if let Some(seat) = mind.seat.take() {
        world.release_seat(seat);
    }
    mind.dance = None;
    mind.dance_then_seat = false;
    mind.claimed_by = None;
    mind.retry.reset();
    mind.state = CustomerState::Leaving;

    let here = motion.cell();
    let exit = nearest_exit(here);
    world.plan_route(motion, exit);
}

fn nearest_exit(from: Cell) -> Cell {
    ENTRANCES
        .iter()
        .copied()
        .min_by(|a, b| a.distance(&from).total_cmp(&b.distance(&from)))
        .unwrap_or(ENTRANCES[0])
}

fn update_leaving(id: AgentId, mind: &mut CustomerMind, motion: &mut Motion, world: &mut World) -> bool {
    if motion.is_moving() {
        return false;
    }
    if world.grid.is_door(motion.cell()) {
        tracing::debug!(id = %id, "Customer reached the door");
        return true;
    }
    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => false,
        RetryStep::Retry => {
            world.plan_route(motion, nearest_exit(motion.cell()));
            false
        }
        RetryStep::GiveUp => {
            tracing::warn!(id = %id, cell = %motion.cell(), "Customer could not reach an exit, removing");
            true
        }
    }
}
