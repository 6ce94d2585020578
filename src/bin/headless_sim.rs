//! Headless Tavern Runner
//!
//! Runs the tavern for a fixed number of ticks and prints a summary,
//! as JSON for tooling or as text for a quick look.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tavern_sim::core::config::{SimulationConfig, TICKS_PER_SECOND};
use tavern_sim::core::error::Result;
use tavern_sim::simulation::tick::{run_simulation_tick, SimulationEvent};
use tavern_sim::simulation::world::World;

/// Headless Tavern Runner - run the simulation without a UI
#[derive(Parser, Debug)]
#[command(name = "headless_sim")]
#[command(about = "Run the tavern for N ticks and print a summary")]
struct Args {
    /// Number of ticks to run
    #[arg(long, default_value_t = 36_000)]
    ticks: u64,

    /// Random seed for deterministic runs (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable the seasonal decorations and Santa
    #[arg(long)]
    seasonal: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the full world snapshot at the end (JSON only)
    #[arg(long)]
    snapshot: bool,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    simulated_secs: f64,
    customers_arrived: usize,
    customers_left: usize,
    customers_now: usize,
    orders_placed: usize,
    orders_delivered: usize,
    tables_cleaned: usize,
    revenue: u64,
    revenue_by_position: BTreeMap<String, u64>,
    final_states: BTreeMap<String, usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tavern_sim=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load_from_toml(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.seasonal {
        config.seasonal = true;
    }
    let seed = config.seed;

    let mut world = World::with_population(config)?;
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for _ in 0..args.ticks {
        for event in run_simulation_tick(&mut world) {
            *counts.entry(event_kind(&event)).or_insert(0) += 1;
        }
    }

    let mut final_states: BTreeMap<String, usize> = BTreeMap::new();
    for agent in &world.agents {
        let key = format!("{}:{}", agent.role().label(), agent.behavior.state_label());
        *final_states.entry(key).or_insert(0) += 1;
    }

    let summary = RunSummary {
        seed,
        ticks: args.ticks,
        simulated_secs: args.ticks as f64 / TICKS_PER_SECOND as f64,
        customers_arrived: counts.get("arrived").copied().unwrap_or(0),
        customers_left: counts.get("left").copied().unwrap_or(0),
        customers_now: world.customer_count(),
        orders_placed: counts.get("placed").copied().unwrap_or(0),
        orders_delivered: counts.get("delivered").copied().unwrap_or(0),
        tables_cleaned: counts.get("cleaned").copied().unwrap_or(0),
        revenue: world.ledger.total(),
        revenue_by_position: world
            .ledger
            .entries()
            .map(|(cell, amount)| (cell.to_string(), amount))
            .collect(),
        final_states,
    };

    match args.format.as_str() {
        "text" => print_text(&summary),
        _ => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if args.snapshot {
                println!("{}", world.get_world_state().to_json()?);
            }
        }
    }
    Ok(())
}

fn event_kind(event: &SimulationEvent) -> &'static str {
    match event {
        SimulationEvent::CustomerArrived { .. } => "arrived",
        SimulationEvent::CustomerLeft { .. } => "left",
        SimulationEvent::CustomerStateChanged { .. } => "state",
        SimulationEvent::OrderPlaced { .. } => "placed",
        SimulationEvent::OrderHandedIn { .. } => "handed_in",
        SimulationEvent::OrderReady { .. } => "ready",
        SimulationEvent::OrderDelivered { .. } => "delivered",
        SimulationEvent::TableCleaned { .. } => "cleaned",
        SimulationEvent::DialogueOpened { .. } => "dialogue",
        SimulationEvent::SideChannelOpened { .. } => "side_channel",
    }
}

fn print_text(summary: &RunSummary) {
    println!("=== Tavern Run (seed {}) ===", summary.seed);
    println!(
        "Ticks: {} ({:.0} simulated seconds)",
        summary.ticks, summary.simulated_secs
    );
    println!(
        "Customers: {} arrived, {} left, {} inside",
        summary.customers_arrived, summary.customers_left, summary.customers_now
    );
    println!(
        "Orders: {} placed, {} delivered",
        summary.orders_placed, summary.orders_delivered
    );
    println!("Tables cleaned: {}", summary.tables_cleaned);
    println!("Revenue: {}", summary.revenue);
    for (position, amount) in &summary.revenue_by_position {
        println!("  {}: {}", position, amount);
    }
    println!("Final states:");
    for (state, count) in &summary.final_states {
        println!("  {:<28} {}", state, count);
    }
}
