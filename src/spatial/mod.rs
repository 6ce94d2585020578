pub mod grid;
pub mod layout;
pub mod occupancy;
pub mod pathfinding;
pub mod seating;

pub use grid::{GridModel, WalkPolicy};
pub use occupancy::Occupancy;
pub use pathfinding::{find_nearest_walkable_position, find_path};
