pub mod interaction;
pub mod movement;
pub mod orders;
pub mod population;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use interaction::{ClickOutcome, DialogueOpen, InteractionSink, NullSink, RecordingSink};
pub use snapshot::WorldSnapshot;
pub use tick::{run_simulation_tick, run_ticks, SimulationEvent};
pub use world::World;
