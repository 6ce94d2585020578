//! Ambient NPCs: the poet, the pianist, the cat and the seasonal Santa.
//!
//! None of them touch seats, orders or tables. They run long randomized
//! timers and occasionally walk somewhere nearby.

use rand::Rng;
use serde::Serialize;

use crate::behavior::random_free_cell;
use crate::core::config::random_ticks;
use crate::core::types::{Cell, Countdown};
use crate::entity::agent::Motion;
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::{CellRect, POET_CHAIR_SPOT, POET_CORNER, POET_DESK_SPOT, TAVERN_BOUNDS};

const POET_THINK_SECS: (f32, f32) = (30.0, 60.0);
const POET_WRITE_SECS: (f32, f32) = (60.0, 120.0);
const POET_WANDER_SECS: (f32, f32) = (20.0, 40.0);
const POET_STROLL_SECS: (f32, f32) = (4.0, 8.0);

const PLAY_SWAY_RATE: f32 = 0.06;
const PLAY_SWAY_AMPLITUDE: f32 = 1.2;
const REST_PROBABILITY: f64 = 0.008;
const MIN_PLAY_TICKS: u32 = 180;
const RESUME_PROBABILITY: f64 = 0.08;
const MIN_REST_TICKS: u32 = 120;

const CAT_REPATH_SECS: (f32, f32) = (3.0, 8.0);

const SANTA_SWAY_RATE: f32 = 0.01;
const SANTA_SWAY_AMPLITUDE: f32 = 1.5;
const SANTA_WANDER_SECS: (f32, f32) = (15.0, 40.0);
const SANTA_WANDER_RANGE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PoetState {
    /// Walking back to the armchair
    Sitting,
    Thinking,
    Writing,
    Wandering,
}

#[derive(Debug, Clone)]
pub struct PoetMind {
    pub state: PoetState,
    /// Time left in the current state
    pub timer: Countdown,
    /// Time until the next stroll step while wandering
    pub stroll: Countdown,
}

impl PoetMind {
    pub fn new() -> Self {
        Self {
            state: PoetState::Sitting,
            timer: Countdown::default(),
            stroll: Countdown::default(),
        }
    }
}

impl Default for PoetMind {
    fn default() -> Self {
        Self::new()
    }
}

pub fn update_poet(mind: &mut PoetMind, motion: &mut Motion, world: &mut World) {
    match mind.state {
        PoetState::Sitting => {
            if motion.is_moving() {
                return;
            }
            mind.state = PoetState::Thinking;
            mind.timer = Countdown::new(random_ticks(&mut world.rng, POET_THINK_SECS));
        }
        PoetState::Thinking => {
            if mind.timer.tick() {
                mind.state = PoetState::Writing;
                mind.timer = Countdown::new(random_ticks(&mut world.rng, POET_WRITE_SECS));
                world.plan_route(motion, POET_DESK_SPOT);
            }
        }
        PoetState::Writing => {
            if mind.timer.tick() {
                mind.state = PoetState::Wandering;
                mind.timer = Countdown::new(random_ticks(&mut world.rng, POET_WANDER_SECS));
                mind.stroll = Countdown::default();
            }
        }
        PoetState::Wandering => {
            if mind.timer.tick() {
                mind.state = PoetState::Sitting;
                world.plan_route(motion, POET_CHAIR_SPOT);
                return;
            }
            if !motion.is_moving() && mind.stroll.tick() {
                if let Some(cell) = random_free_cell(world, &POET_CORNER, WalkPolicy::Standard) {
                    world.plan_route(motion, cell);
                }
                mind.stroll = Countdown::new(random_ticks(&mut world.rng, POET_STROLL_SECS));
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MusicianMind {
    pub playing: bool,
    /// Ticks spent in the current mode
    pub timer_ticks: u32,
    /// Ticks since the pianist sat down, drives the sway
    pub ticks: u64,
    pub sway: f32,
}

impl MusicianMind {
    pub fn new() -> Self {
        Self {
            playing: true,
            ..Self::default()
        }
    }
}

pub fn update_musician(mind: &mut MusicianMind, world: &mut World) {
    mind.ticks += 1;
    mind.timer_ticks += 1;
    if mind.playing {
        mind.sway = (mind.ticks as f32 * PLAY_SWAY_RATE).sin() * PLAY_SWAY_AMPLITUDE;
        if mind.timer_ticks > MIN_PLAY_TICKS && world.rng.gen_bool(REST_PROBABILITY) {
            mind.playing = false;
            mind.timer_ticks = 0;
            mind.sway = 0.0;
        }
    } else if mind.timer_ticks > MIN_REST_TICKS && world.rng.gen_bool(RESUME_PROBABILITY) {
        mind.playing = true;
        mind.timer_ticks = 0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatMind {
    pub timer: Countdown,
}

pub fn update_cat(mind: &mut CatMind, motion: &mut Motion, world: &mut World) {
    if !mind.timer.tick() {
        return;
    }
    if let Some(cell) = random_free_cell(world, &TAVERN_BOUNDS, WalkPolicy::Relaxed) {
        world.plan_route(motion, cell);
    }
    mind.timer = Countdown::new(random_ticks(&mut world.rng, CAT_REPATH_SECS));
}

#[derive(Debug, Clone)]
pub struct SantaMind {
    /// Spot beside the tree Santa keeps coming back to
    pub home: Cell,
    pub ticks: u64,
    pub sway: f32,
    pub wander: Countdown,
}

impl SantaMind {
    pub fn new(home: Cell) -> Self {
        Self {
            home,
            ticks: 0,
            sway: 0.0,
            wander: Countdown::new(0),
        }
    }
}

pub fn update_santa(mind: &mut SantaMind, motion: &mut Motion, world: &mut World) {
    mind.ticks += 1;
    mind.sway = (mind.ticks as f32 * SANTA_SWAY_RATE).sin() * SANTA_SWAY_AMPLITUDE;

    if motion.is_moving() || !mind.wander.tick() {
        return;
    }
    let nearby = CellRect::new(
        mind.home.offset(-SANTA_WANDER_RANGE, -SANTA_WANDER_RANGE),
        mind.home.offset(SANTA_WANDER_RANGE, SANTA_WANDER_RANGE),
    );
    // Every other outing ends back home
    let goal = if motion.cell() == mind.home {
        random_free_cell(world, &nearby, WalkPolicy::Standard)
    } else {
        Some(mind.home)
    };
    if let Some(cell) = goal {
        world.plan_route(motion, cell);
    }
    mind.wander = Countdown::new(random_ticks(&mut world.rng, SANTA_WANDER_SECS));
}
