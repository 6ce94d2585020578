//! Tavern Sim - Entry Point
//!
//! An interactive console for stepping the tavern, clicking around as the
//! player and inspecting what everyone is doing.

use std::io::{self, Write};
use std::path::Path;

use tavern_sim::core::config::SimulationConfig;
use tavern_sim::core::error::Result;
use tavern_sim::core::types::{AgentId, Cell};
use tavern_sim::simulation::interaction::{DialogueOpen, InteractionSink};
use tavern_sim::simulation::tick::{run_simulation_tick, SimulationEvent};
use tavern_sim::simulation::world::World;
use tracing_subscriber::EnvFilter;

/// Prints whatever the player opens
struct ConsoleSink;

impl InteractionSink for ConsoleSink {
    fn on_dialogue_open(&mut self, dialogue: DialogueOpen) {
        println!("[dialogue] {} ({})", dialogue.speaker_name, dialogue.role.label());
        if dialogue.is_thinking {
            println!("  ...");
        } else if !dialogue.content.is_empty() {
            println!("  \"{}\"", dialogue.content);
        }
        println!("  (type `end {}` to close)", dialogue.npc_id.0);
    }

    fn on_open_side_channel(&mut self) {
        println!("[library] The poem library opens.");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tavern_sim=info")),
        )
        .init();

    tracing::info!("Tavern Sim starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load_from_toml(Path::new(&path))?,
        None => SimulationConfig::default(),
    };
    let mut world = World::with_population(config)?;
    let mut sink = ConsoleSink;

    println!("\n=== TAVERN ===");
    println!();
    println!("Commands:");
    println!("  tick / t        - Advance simulation by one tick");
    println!("  run <n>         - Run n simulation ticks");
    println!("  click <c> <r>   - Click a cell as the player");
    println!("  end <id>        - End the conversation with an NPC");
    println!("  status / s      - Show every agent");
    println!("  json            - Dump the world state as JSON");
    println!("  quit / q        - Exit");
    println!();

    loop {
        display_status(&world);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        let mut parts = input.split_whitespace();

        match parts.next() {
            None => continue,
            Some("quit") | Some("q") => break,
            Some("tick") | Some("t") => {
                let events = run_simulation_tick(&mut world);
                report_events(&world, &events, &mut sink);
            }
            Some("run") => match parts.next().and_then(|n| n.parse::<u64>().ok()) {
                Some(n) => {
                    println!("Running {} ticks...", n);
                    for _ in 0..n {
                        let events = run_simulation_tick(&mut world);
                        world.dispatch_events(&events, &mut sink);
                    }
                    println!("Completed {} ticks. Now at tick {}.", n, world.tick);
                }
                None => println!("Usage: run <number>"),
            },
            Some("click") => {
                let c = parts.next().and_then(|v| v.parse::<i32>().ok());
                let r = parts.next().and_then(|v| v.parse::<i32>().ok());
                match (c, r) {
                    (Some(c), Some(r)) => {
                        let outcome = world.click_cell(Cell::new(c, r), &mut sink);
                        println!("{:?}", outcome);
                    }
                    _ => println!("Usage: click <col> <row>"),
                }
            }
            Some("end") => match parts.next().and_then(|v| v.parse::<u32>().ok()) {
                Some(id) => match world.end_conversation(AgentId(id)) {
                    Ok(()) => println!("Conversation with #{} ended.", id),
                    Err(e) => println!("{}", e),
                },
                None => println!("Usage: end <id>"),
            },
            Some("status") | Some("s") => display_detailed_status(&world),
            Some("json") => println!("{}", world.get_world_state().to_json()?),
            Some(_) => println!("Unknown command. Available: tick, run <n>, click <c> <r>, end <id>, status, json, quit"),
        }
    }

    println!(
        "\nGoodbye! Final state: {} customers, revenue {}, {} ticks elapsed.",
        world.customer_count(),
        world.ledger.total(),
        world.tick
    );
    Ok(())
}

fn report_events(world: &World, events: &[SimulationEvent], sink: &mut ConsoleSink) {
    for event in events {
        match event {
            SimulationEvent::DialogueOpened { .. } | SimulationEvent::SideChannelOpened { .. } => {}
            other => println!("  {:?}", other),
        }
    }
    world.dispatch_events(events, sink);
}

/// Display a brief status summary
fn display_status(world: &World) {
    println!();
    println!(
        "--- Tick {} | Customers: {} | Dancing: {} | Dirty tables: {} | Revenue: {} ---",
        world.tick,
        world.customer_count(),
        world.dancer_count(),
        world.dirty_tables.len(),
        world.ledger.total()
    );
    println!(
        "  Orders: {} pending, {} at the counter, {} ready",
        world.orders.pending().len(),
        world.orders.counter().len(),
        world.orders.ready().len()
    );
    println!("  You are at {}", world.player.cell());
}

/// Display every agent with its state
fn display_detailed_status(world: &World) {
    println!();
    println!("=== Detailed Status (Tick {}) ===", world.tick);
    for agent in &world.agents {
        let talking = if agent.in_conversation { " [talking]" } else { "" };
        println!(
            "  #{:<4} {:<24} {:<10} {:<18} at {}{}",
            agent.id.0,
            agent.name,
            agent.role().label(),
            agent.behavior.state_label(),
            agent.cell(),
            talking
        );
        if let Some(identity) = &agent.identity {
            println!("        {}", identity.display_line());
        }
    }
    println!();
}
