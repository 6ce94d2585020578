//! Read-only, serializable view of the world for UIs and tooling

use serde::Serialize;

use crate::core::error::Result;
use crate::core::types::{AgentId, Cell, Tick, Vec2};
use crate::entity::agent::{Agent, Role};
use crate::entity::identity::Identity;
use crate::simulation::interaction::PendingInteraction;
use crate::simulation::orders::Order;
use crate::simulation::world::World;

#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub name: String,
    pub role: Role,
    pub cell: Cell,
    /// Continuous position in cells
    pub pos: Vec2,
    pub state: String,
    pub sway: f32,
    pub in_conversation: bool,
    pub path: Vec<Cell>,
    pub destination: Option<Cell>,
    pub identity: Option<Identity>,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            role: agent.role(),
            cell: agent.cell(),
            pos: agent.motion.pos,
            state: agent.behavior.state_label(),
            sway: agent.behavior.sway(),
            in_conversation: agent.in_conversation,
            path: agent.motion.path.iter().copied().collect(),
            destination: agent.motion.destination,
            identity: agent.identity.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub cell: Cell,
    pub table: usize,
    pub occupied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersView {
    pub pending: Vec<Order>,
    pub counter: Vec<Order>,
    pub ready: Vec<Order>,
    pub delivered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub player: AgentView,
    pub agents: Vec<AgentView>,
    pub seats: Vec<SeatView>,
    pub orders: OrdersView,
    pub dirty_tables: Vec<Cell>,
    /// Revenue per bar service position
    pub ledger: Vec<(Cell, u64)>,
    pub revenue: u64,
    pub customers: usize,
    pub dancers: usize,
    pub pending_interaction: Option<PendingInteraction>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl World {
    pub fn get_world_state(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            player: AgentView::from(&self.player),
            agents: self.agents.iter().map(AgentView::from).collect(),
            seats: self
                .seating
                .seats
                .iter()
                .map(|s| SeatView {
                    cell: s.cell,
                    table: s.table,
                    occupied: s.occupied,
                })
                .collect(),
            orders: OrdersView {
                pending: self.orders.pending().to_vec(),
                counter: self.orders.counter().to_vec(),
                ready: self.orders.ready().to_vec(),
                delivered: self.orders.delivered_count(),
            },
            dirty_tables: self.dirty_tables.iter().copied().collect(),
            ledger: self.ledger.entries().collect(),
            revenue: self.ledger.total(),
            customers: self.customer_count(),
            dancers: self.dancer_count(),
            pending_interaction: self.pending_interaction,
        }
    }
}
