//! Simulation configuration with documented constants
//!
//! All tuning numbers are collected here with explanations of their purpose.
//! Durations are written in seconds and converted to ticks through
//! [`TICKS_PER_SECOND`], so pacing stays correct if the tick rate changes.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TavernError};

/// Fixed simulation rate. Every countdown in the engine is expressed in these ticks.
pub const TICKS_PER_SECOND: u32 = 60;

/// Convert a duration in seconds to whole ticks
pub fn secs_to_ticks(secs: f32) -> u32 {
    (secs.max(0.0) * TICKS_PER_SECOND as f32).round() as u32
}

/// Roll a duration uniformly from a `(min, max)` range in seconds, returned in ticks
pub fn random_ticks<R: Rng>(rng: &mut R, range: (f32, f32)) -> u32 {
    let (lo, hi) = range;
    let secs = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    secs_to_ticks(secs)
}

/// Configuration for the tavern simulation
///
/// Missing fields in a TOML file fall back to [`SimulationConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === WORLD ===
    /// Seed for the world RNG. Two worlds with the same seed and inputs
    /// produce identical runs.
    pub seed: u64,

    /// Adds the seasonal tree obstacle and the Santa NPC
    pub seasonal: bool,

    // === MOVEMENT ===
    /// Player walking speed (cells per second)
    pub player_speed: f32,

    /// Customer walking speed (cells per second)
    pub customer_speed: f32,

    /// Waiter walking speed (cells per second)
    pub waiter_speed: f32,

    /// Bartender walking speed (cells per second)
    pub bartender_speed: f32,

    /// Cleaner walking speed (cells per second)
    pub cleaner_speed: f32,

    /// Speed for the poet, musician and seasonal NPC (cells per second)
    pub ambient_speed: f32,

    /// Cat speed (cells per second)
    pub cat_speed: f32,

    /// Ticks an agent may wait at a waypoint for a blocked next cell
    /// before the route is replanned
    pub stuck_waypoint_threshold: u32,

    /// Ticks an agent may be blocked in the middle of a step before the
    /// route is replanned. Lower than the waypoint threshold because a
    /// half-finished step is more likely to be a head-on standoff.
    pub stuck_step_threshold: u32,

    /// How many times a role retries reaching a goal before it gives up
    /// and falls back (leave, release a claim, requeue work)
    pub max_route_retries: u32,

    /// Ring radius for the nearest-free-cell search
    pub nearest_search_radius: i32,

    // === CUSTOMERS ===
    /// Time seated before raising a hand to order (seconds, min/max)
    pub seated_wait_secs: (f32, f32),

    /// Time spent drinking one drink (seconds, min/max)
    pub drinking_secs: (f32, f32),

    /// Cumulative drinking time after which the one-time sleep roll happens
    pub sleep_threshold_secs: f32,

    /// Probability that the sleep roll sends a customer to sleep
    pub sleep_probability: f64,

    /// Sleep duration (seconds, min/max)
    pub sleep_secs: (f32, f32),

    /// Probability a customer heads to the dance floor after a drink
    pub dance_probability: f64,

    /// Maximum number of customers dancing at once
    pub dance_capacity: usize,

    /// Total dance duration (seconds, min/max)
    pub dance_secs: (f32, f32),

    /// Time spent at each dance spot before moving to the next (seconds, min/max)
    pub dance_step_secs: (f32, f32),

    /// Probability a newly arrived customer dances before sitting down
    pub dance_first_probability: f64,

    /// Drink prices, inclusive range
    pub price_range: (u32, u32),

    // === STAFF ===
    /// Duration of taking an order at the table (seconds)
    pub taking_order_secs: f32,

    /// Idle time before a waiter starts a random walk (seconds)
    pub waiter_idle_wander_secs: f32,

    /// Drink preparation time (seconds, min/max)
    pub prepare_secs: (f32, f32),

    /// Pause between bartender shuffles behind the counter (seconds, min/max)
    pub bartender_wander_secs: (f32, f32),

    /// Time to clean one table (seconds)
    pub cleaning_secs: f32,

    /// Idle time before the cleaner starts wandering (seconds)
    pub cleaner_idle_wander_secs: f32,

    /// How often a wandering cleaner picks a new spot (seconds)
    pub cleaner_wander_repath_secs: f32,

    // === POPULATION ===
    /// Per-tick probability of a new customer group arriving
    pub spawn_probability: f64,

    /// Cap on concurrent customers
    pub max_customers: usize,

    /// Customers placed at tables when the world is created
    pub initial_customers: usize,

    // === INTERACTION ===
    /// Player must be within this many cells to talk to an NPC
    pub interaction_radius: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            // World
            seed: 42,
            seasonal: false,

            // Movement
            player_speed: 4.0,
            customer_speed: 1.2,
            waiter_speed: 1.5,
            bartender_speed: 1.0,
            cleaner_speed: 1.0,
            ambient_speed: 0.8,
            cat_speed: 1.6,
            stuck_waypoint_threshold: 60,
            stuck_step_threshold: 30,
            max_route_retries: 5,
            nearest_search_radius: 3,

            // Customers
            seated_wait_secs: (5.0, 20.0),
            drinking_secs: (120.0, 1200.0),
            sleep_threshold_secs: 900.0,
            sleep_probability: 0.5,
            sleep_secs: (300.0, 900.0),
            dance_probability: 0.5,
            dance_capacity: 8,
            dance_secs: (60.0, 1800.0),
            dance_step_secs: (1.0, 2.0),
            dance_first_probability: 0.2,
            price_range: (8, 20),

            // Staff
            taking_order_secs: 3.0,
            waiter_idle_wander_secs: 5.0,
            prepare_secs: (10.0, 30.0),
            bartender_wander_secs: (3.0, 8.0),
            cleaning_secs: 3.0,
            cleaner_idle_wander_secs: 5.0,
            cleaner_wander_repath_secs: 3.0,

            // Population
            spawn_probability: 0.001,
            max_customers: 20,
            initial_customers: 8,

            // Interaction
            interaction_radius: 1.5,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Load a config from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a config from a TOML string and validate it
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that config values are sensible
    pub fn validate(&self) -> Result<()> {
        let speeds = [
            ("player_speed", self.player_speed),
            ("customer_speed", self.customer_speed),
            ("waiter_speed", self.waiter_speed),
            ("bartender_speed", self.bartender_speed),
            ("cleaner_speed", self.cleaner_speed),
            ("ambient_speed", self.ambient_speed),
            ("cat_speed", self.cat_speed),
        ];
        for (name, speed) in speeds {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(invalid(format!("{name} must be positive and finite")));
            }
        }

        let probabilities = [
            ("sleep_probability", self.sleep_probability),
            ("dance_probability", self.dance_probability),
            ("dance_first_probability", self.dance_first_probability),
            ("spawn_probability", self.spawn_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("{name} must be in [0, 1]")));
            }
        }

        let ranges = [
            ("seated_wait_secs", self.seated_wait_secs),
            ("drinking_secs", self.drinking_secs),
            ("sleep_secs", self.sleep_secs),
            ("dance_secs", self.dance_secs),
            ("dance_step_secs", self.dance_step_secs),
            ("prepare_secs", self.prepare_secs),
            ("bartender_wander_secs", self.bartender_wander_secs),
        ];
        for (name, (lo, hi)) in ranges {
            if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || lo > hi {
                return Err(invalid(format!(
                    "{name} must be finite and satisfy 0 <= min <= max"
                )));
            }
        }

        let durations = [
            ("sleep_threshold_secs", self.sleep_threshold_secs),
            ("taking_order_secs", self.taking_order_secs),
            ("waiter_idle_wander_secs", self.waiter_idle_wander_secs),
            ("cleaning_secs", self.cleaning_secs),
            ("cleaner_idle_wander_secs", self.cleaner_idle_wander_secs),
            ("cleaner_wander_repath_secs", self.cleaner_wander_repath_secs),
        ];
        for (name, secs) in durations {
            if !secs.is_finite() || secs < 0.0 {
                return Err(invalid(format!("{name} must be finite and non-negative")));
            }
        }

        if self.price_range.0 > self.price_range.1 {
            return Err(invalid("price_range min must not exceed max".into()));
        }
        if self.stuck_step_threshold == 0 || self.stuck_waypoint_threshold == 0 {
            return Err(invalid("stuck thresholds must be at least 1".into()));
        }
        if self.nearest_search_radius < 1 {
            return Err(invalid("nearest_search_radius must be at least 1".into()));
        }
        if !self.interaction_radius.is_finite() || self.interaction_radius < 1.0 {
            return Err(invalid(
                "interaction_radius must reach adjacent cells (>= 1.0)".into(),
            ));
        }
        if self.initial_customers > self.max_customers {
            return Err(invalid(
                "initial_customers must not exceed max_customers".into(),
            ));
        }

        Ok(())
    }
}

fn invalid(msg: String) -> TavernError {
    TavernError::InvalidConfig(msg)
}
