//! Agents: anything with a position, a route and a behavior

use std::collections::VecDeque;

use serde::Serialize;

use crate::behavior::ambient::{CatMind, MusicianMind, PoetMind, SantaMind};
use crate::behavior::bartender::BartenderMind;
use crate::behavior::cleaner::CleanerMind;
use crate::behavior::customer::CustomerMind;
use crate::behavior::waiter::WaiterMind;
use crate::core::types::{AgentId, Cell, Vec2};
use crate::entity::identity::Identity;
use crate::spatial::grid::WalkPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Player,
    Bartender,
    Waiter,
    Cleaner,
    Customer,
    Poet,
    Musician,
    Cat,
    Santa,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Bartender => "bartender",
            Role::Waiter => "waiter",
            Role::Cleaner => "cleaner",
            Role::Customer => "customer",
            Role::Poet => "poet",
            Role::Musician => "musician",
            Role::Cat => "cat",
            Role::Santa => "santa",
        }
    }

    pub fn walk_policy(self) -> WalkPolicy {
        match self {
            Role::Cat => WalkPolicy::Relaxed,
            _ => WalkPolicy::Standard,
        }
    }
}

/// Position and route state shared by every agent
#[derive(Debug, Clone)]
pub struct Motion {
    pub pos: Vec2,
    /// Cells per second
    pub speed: f32,
    pub policy: WalkPolicy,
    /// Remaining waypoints, next first
    pub path: VecDeque<Cell>,
    /// Where the current route was planned to, kept for replanning
    pub destination: Option<Cell>,
    /// Consecutive ticks the next step has been blocked
    pub stuck: u32,
}

impl Motion {
    pub fn new(cell: Cell, speed: f32, policy: WalkPolicy) -> Self {
        Self {
            pos: cell.to_vec2(),
            speed,
            policy,
            path: VecDeque::new(),
            destination: None,
            stuck: 0,
        }
    }

    #[inline]
    pub fn cell(&self) -> Cell {
        self.pos.to_cell()
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn set_route(&mut self, path: Vec<Cell>, destination: Cell) {
        self.path = path.into();
        self.destination = Some(destination);
        self.stuck = 0;
    }

    pub fn stop(&mut self) {
        self.path.clear();
        self.destination = None;
        self.stuck = 0;
    }

    /// Whether the position sits on a cell center rather than mid-step
    pub fn at_waypoint(&self) -> bool {
        self.pos.distance(&self.cell().to_vec2()) < crate::simulation::movement::ARRIVAL_EPSILON
    }
}

/// Role-specific state. One variant per role, each with its own mind.
#[derive(Debug, Clone)]
pub enum Behavior {
    Player,
    Customer(CustomerMind),
    Waiter(WaiterMind),
    Bartender(BartenderMind),
    Cleaner(CleanerMind),
    Poet(PoetMind),
    Musician(MusicianMind),
    Cat(CatMind),
    Santa(SantaMind),
}

impl Behavior {
    pub fn role(&self) -> Role {
        match self {
            Behavior::Player => Role::Player,
            Behavior::Customer(_) => Role::Customer,
            Behavior::Waiter(_) => Role::Waiter,
            Behavior::Bartender(_) => Role::Bartender,
            Behavior::Cleaner(_) => Role::Cleaner,
            Behavior::Poet(_) => Role::Poet,
            Behavior::Musician(_) => Role::Musician,
            Behavior::Cat(_) => Role::Cat,
            Behavior::Santa(_) => Role::Santa,
        }
    }

    /// Human-readable state name for logs and snapshots
    pub fn state_label(&self) -> String {
        match self {
            Behavior::Player => "Player".to_string(),
            Behavior::Customer(m) => format!("{:?}", m.state),
            Behavior::Waiter(m) => format!("{:?}", m.state),
            Behavior::Bartender(m) => format!("{:?}", m.state),
            Behavior::Cleaner(m) => format!("{:?}", m.state),
            Behavior::Poet(m) => format!("{:?}", m.state),
            Behavior::Musician(m) => {
                if m.playing {
                    "Playing".to_string()
                } else {
                    "Resting".to_string()
                }
            }
            Behavior::Cat(_) => "Roaming".to_string(),
            Behavior::Santa(_) => "Greeting".to_string(),
        }
    }

    /// Idle sway offset for renderers
    pub fn sway(&self) -> f32 {
        match self {
            Behavior::Musician(m) => m.sway,
            Behavior::Santa(m) => m.sway,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub motion: Motion,
    pub behavior: Behavior,
    pub identity: Option<Identity>,
    /// Movement is frozen while the player talks to this agent
    pub in_conversation: bool,
    pub marked_for_deletion: bool,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>, motion: Motion, behavior: Behavior) -> Self {
        Self {
            id,
            name: name.into(),
            motion,
            behavior,
            identity: None,
            in_conversation: false,
            marked_for_deletion: false,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    #[inline]
    pub fn cell(&self) -> Cell {
        self.motion.cell()
    }

    pub fn role(&self) -> Role {
        self.behavior.role()
    }

    pub fn customer(&self) -> Option<&CustomerMind> {
        match &self.behavior {
            Behavior::Customer(m) => Some(m),
            _ => None,
        }
    }

    pub fn customer_mut(&mut self) -> Option<&mut CustomerMind> {
        match &mut self.behavior {
            Behavior::Customer(m) => Some(m),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn test_walker(id: AgentId, cell: Cell) -> Self {
        Self::new(
            id,
            format!("walker-{}", id.0),
            Motion::new(cell, 1.0, WalkPolicy::Standard),
            Behavior::Player,
        )
    }
}
