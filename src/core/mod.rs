pub mod config;
pub mod error;
pub mod types;

pub use config::{SimulationConfig, TICKS_PER_SECOND};
pub use types::{AgentId, Cell, Countdown, OrderId, Tick, Vec2};
