//! Population management
//!
//! Staff and ambient NPCs are created once with the world. Customers arrive in
//! small groups at a low per-tick probability and are swept once they leave.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::behavior::ambient::{CatMind, MusicianMind, PoetMind, SantaMind};
use crate::behavior::bartender::BartenderMind;
use crate::behavior::cleaner::CleanerMind;
use crate::behavior::customer::{self, CustomerMind, CustomerState};
use crate::behavior::waiter::WaiterMind;
use crate::core::config::random_ticks;
use crate::core::types::{AgentId, Cell, Countdown};
use crate::entity::agent::{Agent, Behavior, Motion};
use crate::entity::identity::{
    Gender, Identity, BARTENDER_NAMES, CAT_NAME, CLEANER_NAMES, MUSICIAN_NAME, POET_NAME,
    SANTA_NAME, WAITER_NAMES,
};
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::{BARTENDER_WORK_CELLS, ENTRANCES, POET_CHAIR_SPOT, SEASONAL_TREE};
use crate::spatial::pathfinding::find_nearest_walkable_position;

/// Group sizes with their arrival weights
const GROUP_SIZES: [(usize, f64); 4] = [(1, 0.2), (2, 0.3), (3, 0.2), (4, 0.3)];

/// Where waiters stand when the doors open
const WAITER_STARTS: [Cell; 4] = [
    Cell::new(38, 12),
    Cell::new(38, 20),
    Cell::new(22, 12),
    Cell::new(22, 20),
];
const CLEANER_START: Cell = Cell::new(40, 24);
const PIANO_BENCH: Cell = Cell::new(19, 22);
const CAT_START: Cell = Cell::new(4, 28);

/// Share of opening customers already drinking, and already dancing
const OPENING_DRINKING: f64 = 0.25;
const OPENING_DANCING: f64 = 0.15;

/// A free standard-walkable cell at or near `near`
fn free_cell_near(world: &World, near: Cell) -> Cell {
    let occupancy = world.occupancy();
    if occupancy.is_free(&world.grid, near) {
        return near;
    }
    find_nearest_walkable_position(&world.grid, near, &occupancy, world.config.nearest_search_radius)
        .unwrap_or(near)
}

/// Staff, ambient NPCs and the opening crowd
pub fn spawn_initial_population(world: &mut World) {
    spawn_staff(world);
    spawn_ambient(world);

    let mut seated = 0;
    while seated < world.config.initial_customers {
        let tables = world.seating.tables_with_room(1);
        let Some(&table) = tables.choose(&mut world.rng) else {
            tracing::debug!(seated, "Ran out of seats for the opening crowd");
            break;
        };
        let Some(&seat) = world.seating.free_seats(table).first() else {
            break;
        };
        spawn_opening_customer(world, seat);
        seated += 1;
    }

    tracing::info!(
        agents = world.agents.len(),
        customers = world.customer_count(),
        "Initial population spawned"
    );
}

fn spawn_staff(world: &mut World) {
    for (i, name) in BARTENDER_NAMES.iter().enumerate() {
        let id = world.next_staff_id();
        let cell = BARTENDER_WORK_CELLS[i * 2 % BARTENDER_WORK_CELLS.len()];
        let motion = Motion::new(cell, world.config.bartender_speed, WalkPolicy::Standard);
        world.add_agent(Agent::new(id, *name, motion, Behavior::Bartender(BartenderMind::new())));
    }

    for (i, name) in WAITER_NAMES.iter().enumerate() {
        let id = world.next_staff_id();
        let cell = free_cell_near(world, WAITER_STARTS[i % WAITER_STARTS.len()]);
        let motion = Motion::new(cell, world.config.waiter_speed, WalkPolicy::Standard);
        world.add_agent(Agent::new(id, *name, motion, Behavior::Waiter(WaiterMind::new(i))));
    }

    for name in CLEANER_NAMES {
        let id = world.next_staff_id();
        let cell = free_cell_near(world, CLEANER_START);
        let motion = Motion::new(cell, world.config.cleaner_speed, WalkPolicy::Standard);
        world.add_agent(Agent::new(id, name, motion, Behavior::Cleaner(CleanerMind::new())));
    }
}

fn spawn_ambient(world: &mut World) {
    let speed = world.config.ambient_speed;

    let id = world.next_staff_id();
    let cell = free_cell_near(world, POET_CHAIR_SPOT);
    let motion = Motion::new(cell, speed, WalkPolicy::Standard);
    world.add_agent(Agent::new(id, POET_NAME, motion, Behavior::Poet(PoetMind::new())));

    let id = world.next_staff_id();
    let cell = free_cell_near(world, PIANO_BENCH);
    let motion = Motion::new(cell, speed, WalkPolicy::Standard);
    world.add_agent(Agent::new(id, MUSICIAN_NAME, motion, Behavior::Musician(MusicianMind::new())));

    let id = world.next_staff_id();
    let motion = Motion::new(CAT_START, world.config.cat_speed, WalkPolicy::Relaxed);
    world.add_agent(Agent::new(id, CAT_NAME, motion, Behavior::Cat(CatMind::default())));

    if world.config.seasonal {
        let id = world.next_staff_id();
        let home = free_cell_near(world, SEASONAL_TREE.offset(1, 0));
        let motion = Motion::new(home, speed, WalkPolicy::Standard);
        world.add_agent(Agent::new(id, SANTA_NAME, motion, Behavior::Santa(SantaMind::new(home))));
    }
}

/// Opening customers start at their seat, some mid-drink and some dancing
fn spawn_opening_customer(world: &mut World, seat: usize) {
    let Some(cell) = world.seating.seat(seat).map(|s| s.cell) else {
        return;
    };
    world.seating.occupy(seat);

    let wait = random_ticks(&mut world.rng, world.config.seated_wait_secs);
    let mut mind = CustomerMind::seated(seat, wait);
    let mut motion = Motion::new(cell, world.config.customer_speed, WalkPolicy::Standard);

    let roll: f64 = world.rng.gen();
    if roll < OPENING_DRINKING {
        mind.state = CustomerState::Drinking;
        mind.timer = Countdown::new(random_ticks(&mut world.rng, world.config.drinking_secs));
    } else if roll < OPENING_DRINKING + OPENING_DANCING
        && world.dancer_count() < world.config.dance_capacity
    {
        customer::start_dancing(&mut mind, &mut motion, world, true);
    }

    let identity = Identity::generate(&mut world.rng, None);
    let id = world.next_customer_id();
    world.add_agent(
        Agent::new(id, identity.name.clone(), motion, Behavior::Customer(mind)).with_identity(identity),
    );
}

fn roll_group_size<R: Rng>(rng: &mut R) -> usize {
    let roll: f64 = rng.gen();
    let mut acc = 0.0;
    for (size, weight) in GROUP_SIZES {
        acc += weight;
        if roll < acc {
            return size;
        }
    }
    GROUP_SIZES[GROUP_SIZES.len() - 1].0
}

/// Genders for a group: couples are one man and one woman
fn group_genders<R: Rng>(rng: &mut R, size: usize) -> Vec<Option<Gender>> {
    if size == 2 {
        let first = Gender::random(rng);
        let second = match first {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        };
        return vec![Some(first), Some(second)];
    }
    vec![None; size]
}

/// Roll for a new customer group. Returns the ids that walked in.
pub fn maybe_spawn_group(world: &mut World) -> Vec<AgentId> {
    if !world.rng.gen_bool(world.config.spawn_probability) {
        return Vec::new();
    }
    let size = roll_group_size(&mut world.rng);
    spawn_group(world, size)
}

/// Bring in a group of `size` customers at one table, if the cap and the
/// seating allow it
pub fn spawn_group(world: &mut World, size: usize) -> Vec<AgentId> {
    let current = world.customer_count();
    if current + size > world.config.max_customers {
        tracing::debug!(current, size, cap = world.config.max_customers, "Group turned away: tavern full");
        return Vec::new();
    }
    let tables = world.seating.tables_with_room(size);
    let Some(&table) = tables.choose(&mut world.rng) else {
        tracing::debug!(size, "Group turned away: no table with room");
        return Vec::new();
    };
    let Some(&door) = ENTRANCES.choose(&mut world.rng) else {
        return Vec::new();
    };

    let seats: Vec<usize> = world.seating.free_seats(table).into_iter().take(size).collect();
    let genders = group_genders(&mut world.rng, size);
    let mut arrived = Vec::with_capacity(size);

    for (seat, gender) in seats.into_iter().zip(genders) {
        let Some(seat_cell) = world.seating.seat(seat).map(|s| s.cell) else {
            continue;
        };
        world.seating.occupy(seat);

        let mut mind = CustomerMind::entering(seat);
        let mut motion = Motion::new(door, world.config.customer_speed, WalkPolicy::Standard);
        let dance_first = world.rng.gen_bool(world.config.dance_first_probability)
            && world.dancer_count() < world.config.dance_capacity;
        if dance_first {
            customer::start_dancing(&mut mind, &mut motion, world, true);
        } else {
            world.plan_route(&mut motion, seat_cell);
        }

        let identity = Identity::generate(&mut world.rng, gender);
        let id = world.next_customer_id();
        world.add_agent(
            Agent::new(id, identity.name.clone(), motion, Behavior::Customer(mind))
                .with_identity(identity),
        );
        world.emit(SimulationEvent::CustomerArrived { id, seat: seat_cell });
        arrived.push(id);
    }

    tracing::info!(size = arrived.len(), table, %door, "Customer group arrived");
    arrived
}

/// Remove every agent marked for deletion, releasing anything they still hold
pub fn sweep_departed(world: &mut World) {
    let mut departed = Vec::new();
    world.agents.retain(|agent| {
        if agent.marked_for_deletion {
            departed.push((agent.id, agent.customer().and_then(|m| m.seat)));
            false
        } else {
            true
        }
    });

    for (id, seat) in departed {
        if let Some(seat) = seat {
            world.release_seat(seat);
        }
        world.emit(SimulationEvent::CustomerLeft { id });
        tracing::info!(id = %id, "Customer left");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::agent::Role;

    fn populated(seasonal: bool) -> World {
        let config = SimulationConfig {
            seasonal,
            ..Default::default()
        };
        World::with_population(config).expect("valid config")
    }

    #[test]
    fn test_initial_population_roles() {
        let world = populated(false);
        assert_eq!(world.agents_with_role(Role::Bartender).count(), 3);
        assert_eq!(world.agents_with_role(Role::Waiter).count(), 4);
        assert_eq!(world.agents_with_role(Role::Cleaner).count(), 1);
        assert_eq!(world.agents_with_role(Role::Poet).count(), 1);
        assert_eq!(world.agents_with_role(Role::Musician).count(), 1);
        assert_eq!(world.agents_with_role(Role::Cat).count(), 1);
        assert_eq!(world.agents_with_role(Role::Santa).count(), 0);
        assert_eq!(world.customer_count(), 8);
    }

    #[test]
    fn test_seasonal_adds_santa() {
        let world = populated(true);
        assert_eq!(world.agents_with_role(Role::Santa).count(), 1);
    }

    #[test]
    fn test_ids_follow_ranges() {
        let world = populated(false);
        for agent in &world.agents {
            if agent.role() == Role::Customer {
                assert!(agent.id.0 >= 100);
            } else {
                assert!(agent.id.0 >= 1 && agent.id.0 < 100);
            }
        }
    }

    #[test]
    fn test_opening_customers_hold_seats() {
        let world = populated(false);
        assert_eq!(world.seating.occupied_count(), 8);
        for agent in world.agents.iter().filter(|a| a.role() == Role::Customer) {
            assert!(agent.customer().and_then(|m| m.seat).is_some());
            assert!(agent.identity.is_some());
        }
    }

    #[test]
    fn test_group_respects_cap() {
        let config = SimulationConfig {
            max_customers: 9,
            ..Default::default()
        };
        let mut world = World::with_population(config).expect("valid config");
        assert!(spawn_group(&mut world, 2).is_empty());
        assert_eq!(spawn_group(&mut world, 1).len(), 1);
        assert_eq!(world.customer_count(), 9);
    }

    #[test]
    fn test_group_sits_at_one_table() {
        let mut world = World::new(SimulationConfig::default()).expect("valid config");
        let ids = spawn_group(&mut world, 3);
        assert_eq!(ids.len(), 3);
        let tables: Vec<usize> = ids
            .iter()
            .filter_map(|&id| world.agent(id))
            .filter_map(|a| a.customer().and_then(|m| m.seat))
            .map(|s| world.seating.seats[s].table)
            .collect();
        assert!(tables.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_couples_are_mixed() {
        let mut rng = rand::thread_rng();
        let genders = group_genders(&mut rng, 2);
        assert_ne!(genders[0], genders[1]);
    }

    #[test]
    fn test_sweep_releases_seat_and_reports() {
        let mut world = World::new(SimulationConfig::default()).expect("valid config");
        let ids = spawn_group(&mut world, 1);
        let id = ids[0];
        if let Some(agent) = world.agent_mut(id) {
            agent.marked_for_deletion = true;
        }
        sweep_departed(&mut world);
        assert!(world.agent(id).is_none());
        assert_eq!(world.seating.occupied_count(), 0);
        assert!(world.events.contains(&SimulationEvent::CustomerLeft { id }));
    }
}
