//! Tavern Sim - a tick-driven tavern populated by autonomous agents
//!
//! Customers, waiters, bartenders, a cleaner and a few ambient characters
//! share one grid. Every tick moves them along A* routes and runs each one's
//! state machine against the shared world.

pub mod behavior;
pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
