//! The per-tick orchestration pass
//!
//! One call advances the whole tavern by one tick, in a fixed order:
//! player step, pending player interaction, NPC steps, NPC behaviors,
//! population spawn, sweep of departed customers.

use serde::Serialize;

use crate::behavior::customer::CustomerState;
use crate::behavior::update_agent;
use crate::core::types::{AgentId, Cell, OrderId};
use crate::entity::agent::Role;
use crate::simulation::movement::{step_agent, StepOutcome};
use crate::simulation::population::{maybe_spawn_group, sweep_departed};
use crate::simulation::world::World;
use crate::spatial::occupancy::Occupancy;

/// Something worth reporting that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SimulationEvent {
    CustomerArrived {
        id: AgentId,
        seat: Cell,
    },
    CustomerStateChanged {
        id: AgentId,
        from: CustomerState,
        to: CustomerState,
    },
    CustomerLeft {
        id: AgentId,
    },
    OrderPlaced {
        order: OrderId,
        customer: AgentId,
        waiter: AgentId,
        price: u32,
    },
    OrderHandedIn {
        order: OrderId,
        waiter: AgentId,
        position: Cell,
        price: u32,
    },
    OrderReady {
        order: OrderId,
        bartender: AgentId,
    },
    OrderDelivered {
        order: OrderId,
        customer: AgentId,
        waiter: AgentId,
    },
    TableCleaned {
        table: Cell,
        cleaner: AgentId,
    },
    DialogueOpened {
        npc: AgentId,
        role: Role,
    },
    SideChannelOpened {
        cell: Cell,
    },
}

/// Advance the world by one tick and return what happened
pub fn run_simulation_tick(world: &mut World) -> Vec<SimulationEvent> {
    step_player(world);
    world.resolve_pending_interaction();

    for idx in 0..world.agents.len() {
        world.with_detached(idx, |agent, world| {
            let occupancy = Occupancy::new(&world.agents, Some(&world.player));
            let outcome = step_agent(&world.grid, agent, &occupancy, &world.config);
            if outcome == StepOutcome::Replanned {
                tracing::trace!(id = %agent.id, "Replanned after being blocked");
            }
        });
    }

    for idx in 0..world.agents.len() {
        world.with_detached(idx, |agent, world| {
            if !agent.marked_for_deletion {
                update_agent(agent, world);
            }
        });
    }

    maybe_spawn_group(world);
    sweep_departed(world);

    world.tick += 1;
    std::mem::take(&mut world.events)
}

fn step_player(world: &mut World) {
    let World {
        grid,
        agents,
        player,
        config,
        ..
    } = world;
    let occupancy = Occupancy::new(agents, None);
    step_agent(grid, player, &occupancy, config);
}

/// Run `ticks` ticks, collecting every event
pub fn run_ticks(world: &mut World, ticks: u64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(run_simulation_tick(world));
    }
    events
}
