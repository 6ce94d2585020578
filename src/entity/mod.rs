pub mod agent;
pub mod identity;

pub use agent::{Agent, Behavior, Motion, Role};
pub use identity::{Gender, Identity};
