//! Whole-tavern integration tests: service loop, bookkeeping and determinism

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tavern_sim::behavior::customer::{CustomerMind, CustomerState};
use tavern_sim::behavior::waiter::{WaiterMind, WaiterState};
use tavern_sim::core::config::SimulationConfig;
use tavern_sim::core::types::{AgentId, Cell, OrderId};
use tavern_sim::entity::agent::{Agent, Behavior, Motion, Role};
use tavern_sim::simulation::population::spawn_group;
use tavern_sim::simulation::{run_simulation_tick, run_ticks, SimulationEvent, World};
use tavern_sim::spatial::grid::WalkPolicy;
use tavern_sim::spatial::layout::{bar_service_cells, DOORS, WANDER_ZONES};

fn populated(seed: u64) -> World {
    World::with_population(SimulationConfig::with_seed(seed)).expect("valid config")
}

/// Seats marked occupied match the customers holding them, one each
fn assert_seating_consistent(world: &World) {
    let held: Vec<usize> = world
        .agents
        .iter()
        .filter_map(|a| a.customer().and_then(|m| m.seat))
        .collect();
    let unique: HashSet<usize> = held.iter().copied().collect();
    assert_eq!(held.len(), unique.len(), "two customers share a seat");
    assert_eq!(world.seating.occupied_count(), held.len());
    for seat in held {
        assert!(world.seating.seats[seat].occupied);
    }
}

#[test]
fn test_opening_population() {
    let world = populated(42);

    assert_eq!(world.agents_with_role(Role::Bartender).count(), 3);
    assert_eq!(world.agents_with_role(Role::Waiter).count(), 4);
    assert_eq!(world.agents_with_role(Role::Cleaner).count(), 1);
    assert_eq!(world.agents_with_role(Role::Poet).count(), 1);
    assert_eq!(world.agents_with_role(Role::Musician).count(), 1);
    assert_eq!(world.agents_with_role(Role::Cat).count(), 1);
    assert_eq!(world.agents_with_role(Role::Santa).count(), 0);
    assert_eq!(world.customer_count(), 8);
    assert_seating_consistent(&world);
}

#[test]
fn test_seasonal_adds_santa() {
    let config = SimulationConfig {
        seasonal: true,
        ..SimulationConfig::with_seed(3)
    };
    let world = World::with_population(config).expect("valid config");
    assert_eq!(world.agents_with_role(Role::Santa).count(), 1);
}

#[test]
fn test_service_loop_produces_revenue() {
    let mut world = populated(42);
    let events = run_ticks(&mut world, 20_000);

    let placed = events
        .iter()
        .filter(|e| matches!(e, SimulationEvent::OrderPlaced { .. }))
        .count();
    let delivered = events
        .iter()
        .filter(|e| matches!(e, SimulationEvent::OrderDelivered { .. }))
        .count();

    assert!(placed > 0, "nobody ordered");
    assert!(delivered > 0, "nothing was delivered");
    assert!(delivered <= placed);
    assert!(world.ledger.total() > 0);

    // Money only ever lands on the service column
    let service: HashSet<_> = bar_service_cells().collect();
    for (position, _) in world.ledger.entries() {
        assert!(service.contains(&position), "revenue credited at {}", position);
    }
}

#[test]
fn test_order_events_follow_lifecycle() {
    let mut world = populated(7);
    let events = run_ticks(&mut world, 20_000);

    let mut placed = HashSet::new();
    let mut handed_in = HashSet::new();
    let mut ready = HashSet::new();
    for event in &events {
        match event {
            SimulationEvent::OrderPlaced { order, .. } => {
                assert!(placed.insert(*order), "order placed twice");
            }
            SimulationEvent::OrderHandedIn { order, .. } => {
                assert!(placed.contains(order));
                assert!(handed_in.insert(*order), "slip handed in twice");
            }
            // The bartender can pick an order up before the slip arrives
            SimulationEvent::OrderReady { order, .. } => {
                assert!(placed.contains(order), "ready before placed");
                ready.insert(*order);
            }
            SimulationEvent::OrderDelivered { order, .. } => {
                assert!(ready.contains(order), "delivered before ready");
                assert!(handed_in.contains(order), "delivered without being paid for");
            }
            _ => {}
        }
    }
}

#[test]
fn test_every_delivered_order_is_paid_once() {
    for seed in 0..6 {
        let mut world = populated(seed);
        let events = run_ticks(&mut world, 20_000);

        let mut credited: HashMap<OrderId, u32> = HashMap::new();
        let mut delivered = Vec::new();
        let mut revenue = 0u64;
        for event in &events {
            match event {
                SimulationEvent::OrderHandedIn { order, price, .. } => {
                    *credited.entry(*order).or_insert(0) += 1;
                    revenue += u64::from(*price);
                }
                SimulationEvent::OrderDelivered { order, .. } => delivered.push(*order),
                _ => {}
            }
        }

        assert!(!delivered.is_empty(), "seed {}: nothing delivered", seed);
        for order in &delivered {
            assert_eq!(
                credited.get(order),
                Some(&1),
                "seed {}: {:?} delivered but credited {:?} times",
                seed,
                order,
                credited.get(order)
            );
        }
        assert!(credited.values().all(|&n| n == 1), "seed {}: slip paid twice", seed);
        assert_eq!(world.ledger.total(), revenue, "seed {}", seed);
        assert!(world.orders.delivered_count() >= delivered.len());
    }
}

/// Every non-door cell holds at most one body
fn assert_no_shared_cells(world: &World, context: &str) {
    let mut taken = HashSet::new();
    for agent in world.agents.iter().chain(std::iter::once(&world.player)) {
        let cell = agent.cell();
        if world.grid.is_door(cell) {
            continue;
        }
        assert!(
            taken.insert(cell),
            "{}: {} shares {} with someone",
            context,
            agent.name,
            cell
        );
    }
}

#[test]
fn test_no_shared_cells_after_any_tick() {
    for seed in [3, 17, 99, 2024] {
        let mut world = populated(seed);
        assert_no_shared_cells(&world, "opening");
        for tick in 0..5_000 {
            run_simulation_tick(&mut world);
            assert_no_shared_cells(&world, &format!("seed {} tick {}", seed, tick));
        }
    }
}

fn walker(world: &mut World, cell: Cell) -> AgentId {
    let id = world.next_staff_id();
    world.add_agent(Agent::new(
        id,
        format!("walker-{}", id.0),
        Motion::new(cell, 1.2, WalkPolicy::Standard),
        Behavior::Player,
    ));
    id
}

#[test]
fn test_shared_destination_holds_one_agent() {
    let centre = WANDER_ZONES[0];
    for seed in 0..5u64 {
        let mut world = quiet_tavern(seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let free: Vec<Cell> = {
            let occupancy = world.occupancy();
            world
                .grid
                .walkable_cells_in(&centre, WalkPolicy::Standard)
                .into_iter()
                .filter(|&c| !occupancy.is_occupied(&world.grid, c))
                .collect()
        };
        let picks: Vec<Cell> = free.choose_multiple(&mut rng, 3).copied().collect();
        let (goal, start_a, start_b) = (picks[0], picks[1], picks[2]);

        let a = walker(&mut world, start_a);
        let b = walker(&mut world, start_b);
        for id in [a, b] {
            let idx = world.agent_index(id).expect("walker added");
            let planned = world.with_detached(idx, |agent, world| {
                world.plan_route(&mut agent.motion, goal)
            });
            assert!(planned, "seed {}: no route to {}", seed, goal);
        }

        for tick in 0..3_000 {
            run_simulation_tick(&mut world);
            assert_no_shared_cells(&world, &format!("seed {} tick {}", seed, tick));
        }

        let on_goal = [a, b]
            .iter()
            .filter(|&&id| world.agent(id).map(|w| w.cell()) == Some(goal))
            .count();
        assert_eq!(on_goal, 1, "seed {}: {} walkers ended on {}", seed, on_goal, goal);
    }
}

fn quiet_tavern(seed: u64) -> World {
    let config = SimulationConfig {
        spawn_probability: 0.0,
        ..SimulationConfig::with_seed(seed)
    };
    World::new(config).expect("valid config")
}

#[test]
fn test_idle_waiter_claims_waiting_customer_next_tick() {
    for seed in 0..6u64 {
        let mut world = quiet_tavern(seed);
        let table = seed as usize % world.seating.tables.len();
        let seat = world.seating.tables[table].seats[0];
        assert!(world.seating.occupy(seat));
        let cell = world.seating.seats[seat].cell;

        let customer = world.next_customer_id();
        let mut mind = CustomerMind::seated(seat, 0);
        mind.state = CustomerState::WaitingForWaiter;
        world.add_agent(Agent::new(
            customer,
            "Guest",
            Motion::new(cell, 1.2, WalkPolicy::Standard),
            Behavior::Customer(mind),
        ));

        let waiter = world.next_staff_id();
        world.add_agent(Agent::new(
            waiter,
            "Waiter",
            Motion::new(DOORS[0], 1.5, WalkPolicy::Standard),
            Behavior::Waiter(WaiterMind::new(0)),
        ));

        run_simulation_tick(&mut world);

        let agent = world.agent(waiter).expect("waiter present");
        let Behavior::Waiter(mind) = &agent.behavior else {
            panic!("not a waiter");
        };
        assert_eq!(mind.state, WaiterState::GoingToCustomer, "seed {}", seed);
        assert_eq!(mind.customer, Some(customer));
        assert!(agent.motion.destination.is_some(), "seed {}: no route planned", seed);

        let claimed = world
            .agent(customer)
            .and_then(|a| a.customer())
            .and_then(|m| m.claimed_by);
        assert_eq!(claimed, Some(waiter));
    }
}

#[test]
fn test_bookkeeping_holds_every_tick() {
    let mut world = populated(11);
    for tick in 0..6_000 {
        run_simulation_tick(&mut world);
        if tick % 50 != 0 {
            continue;
        }
        assert_seating_consistent(&world);
        assert!(world.customer_count() <= world.config.max_customers);
        assert!(world.dancer_count() <= world.config.dance_capacity);

        let dirty: HashSet<_> = world.dirty_tables.iter().collect();
        assert_eq!(dirty.len(), world.dirty_tables.len(), "table queued twice");

        // A customer is claimed by at most one waiter and only while served
        for agent in &world.agents {
            if let Some(mind) = agent.customer() {
                if mind.claimed_by.is_some() {
                    assert!(matches!(
                        mind.state,
                        CustomerState::WaitingForWaiter
                            | CustomerState::Ordering
                            | CustomerState::WaitingDrink
                    ));
                }
            }
        }
    }
}

#[test]
fn test_customer_cap_is_respected() {
    let config = SimulationConfig {
        spawn_probability: 0.0,
        initial_customers: 0,
        max_customers: 5,
        ..SimulationConfig::with_seed(5)
    };
    let mut world = World::with_population(config).expect("valid config");

    assert_eq!(spawn_group(&mut world, 4).len(), 4);
    assert!(spawn_group(&mut world, 2).is_empty());
    assert_eq!(spawn_group(&mut world, 1).len(), 1);
    assert_eq!(world.customer_count(), 5);
}

#[test]
fn test_departed_customers_are_swept() {
    let config = SimulationConfig {
        spawn_probability: 0.0,
        ..SimulationConfig::with_seed(9)
    };
    let mut world = World::with_population(config).expect("valid config");
    let events = run_ticks(&mut world, 40_000);

    let left: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SimulationEvent::CustomerLeft { id } => Some(*id),
            _ => None,
        })
        .collect();
    for id in left {
        assert!(world.agent(id).is_none(), "{} is still in the world", id);
    }
    assert!(world.agents.iter().all(|a| !a.marked_for_deletion));
}

#[test]
fn test_same_seed_same_run() {
    let mut a = populated(1234);
    let mut b = populated(1234);

    let events_a = run_ticks(&mut a, 3_000);
    let events_b = run_ticks(&mut b, 3_000);

    assert_eq!(events_a, events_b);
    let json_a = a.get_world_state().to_json().expect("serializable");
    let json_b = b.get_world_state().to_json().expect("serializable");
    assert_eq!(json_a, json_b);
}

#[test]
fn test_bundled_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/tavern.toml");
    let config = SimulationConfig::load_from_toml(&path).expect("bundled config loads");
    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SimulationConfig {
        max_customers: 0,
        ..SimulationConfig::default()
    };
    assert!(World::new(config).is_err());
}
