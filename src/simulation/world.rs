//! The tavern world aggregate
//!
//! One `World` owns every piece of mutable simulation state. Behavior handlers
//! receive it by mutable reference; the agent being updated is detached from
//! `agents` for the duration of its handler so it never sees itself there.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, TavernError};
use crate::core::types::{AgentId, Cell, Tick};
use crate::entity::agent::{Agent, Behavior, Motion, Role};
use crate::entity::identity::PLAYER_NAME;
use crate::simulation::interaction::PendingInteraction;
use crate::simulation::movement;
use crate::simulation::orders::{CashLedger, OrderBook};
use crate::simulation::tick::SimulationEvent;
use crate::spatial::grid::{GridModel, WalkPolicy};
use crate::spatial::occupancy::Occupancy;
use crate::spatial::pathfinding::find_nearest_walkable_position;
use crate::spatial::seating::SeatingPlan;

pub const PLAYER_ID: AgentId = AgentId(999);
pub const PLAYER_START: Cell = Cell::new(5, 10);
/// Customer ids start here; staff and ambient NPCs count up from 1
pub const FIRST_CUSTOMER_ID: u32 = 100;

pub struct World {
    pub config: SimulationConfig,
    pub grid: GridModel,
    pub seating: SeatingPlan,
    /// Every NPC in stable update order
    pub agents: Vec<Agent>,
    pub player: Agent,
    pub orders: OrderBook,
    pub ledger: CashLedger,
    /// Table cells waiting for the cleaner, oldest first, no duplicates
    pub dirty_tables: VecDeque<Cell>,
    pub rng: ChaCha8Rng,
    pub tick: Tick,
    pub pending_interaction: Option<PendingInteraction>,
    pub(crate) events: Vec<SimulationEvent>,
    next_staff_id: u32,
    next_customer_id: u32,
}

impl World {
    /// An empty tavern: furniture, seats and the player, no NPCs
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let grid = GridModel::standard(config.seasonal);
        let seating = SeatingPlan::from_grid(&grid);
        let player = Agent::new(
            PLAYER_ID,
            PLAYER_NAME,
            Motion::new(PLAYER_START, config.player_speed, WalkPolicy::Standard),
            Behavior::Player,
        );

        tracing::info!(seed = config.seed, seasonal = config.seasonal, "Tavern world created");

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            grid,
            seating,
            agents: Vec::new(),
            player,
            orders: OrderBook::new(),
            ledger: CashLedger::default(),
            dirty_tables: VecDeque::new(),
            tick: 0,
            pending_interaction: None,
            events: Vec::new(),
            next_staff_id: 1,
            next_customer_id: FIRST_CUSTOMER_ID,
        })
    }

    /// A tavern with staff, ambient NPCs and the opening crowd
    pub fn with_population(config: SimulationConfig) -> Result<Self> {
        let mut world = Self::new(config)?;
        crate::simulation::population::spawn_initial_population(&mut world);
        Ok(world)
    }

    pub fn next_staff_id(&mut self) -> AgentId {
        let id = AgentId(self.next_staff_id);
        self.next_staff_id += 1;
        id
    }

    pub fn next_customer_id(&mut self) -> AgentId {
        let id = AgentId(self.next_customer_id);
        self.next_customer_id += 1;
        id
    }

    pub fn add_agent(&mut self, agent: Agent) {
        tracing::debug!(id = %agent.id, role = agent.role().label(), cell = %agent.cell(), "Agent added");
        self.agents.push(agent);
    }

    pub fn emit(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    /// Everyone who can block a cell
    pub fn occupancy(&self) -> Occupancy<'_> {
        Occupancy::new(&self.agents, Some(&self.player))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        if id == self.player.id {
            return Some(&self.player);
        }
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        if id == self.player.id {
            return Some(&mut self.player);
        }
        self.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn agent_index(&self, id: AgentId) -> Option<usize> {
        self.agents.iter().position(|a| a.id == id)
    }

    pub fn agents_with_role(&self, role: Role) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(move |a| a.role() == role)
    }

    pub fn customer_count(&self) -> usize {
        self.agents_with_role(Role::Customer).count()
    }

    pub fn dancer_count(&self) -> usize {
        self.agents
            .iter()
            .filter_map(|a| a.customer())
            .filter(|m| m.is_dancing())
            .count()
    }

    /// Run `f` with agent `idx` taken out of `agents`, then put it back in place
    pub fn with_detached<R>(&mut self, idx: usize, f: impl FnOnce(&mut Agent, &mut World) -> R) -> R {
        let mut agent = self.agents.remove(idx);
        let result = f(&mut agent, self);
        self.agents.insert(idx, agent);
        result
    }

    /// Plan a route for a detached NPC
    pub fn plan_route(&self, motion: &mut Motion, goal: Cell) -> bool {
        movement::plan_route(
            &self.grid,
            motion,
            goal,
            &self.occupancy(),
            self.config.nearest_search_radius,
        )
    }

    /// A free cell to stand on when dealing with whatever is at `target`:
    /// the first free neighbour, else the nearest free cell further out
    pub fn interaction_cell(&self, target: Cell, occupancy: &Occupancy<'_>) -> Option<Cell> {
        const RING: [(i32, i32); 8] = [
            (0, -1),
            (1, 0),
            (0, 1),
            (-1, 0),
            (-1, -1),
            (1, -1),
            (1, 1),
            (-1, 1),
        ];
        RING.iter()
            .map(|&(dc, dr)| target.offset(dc, dr))
            .find(|&c| occupancy.is_free(&self.grid, c))
            .or_else(|| {
                find_nearest_walkable_position(
                    &self.grid,
                    target,
                    occupancy,
                    self.config.nearest_search_radius,
                )
            })
    }

    /// Plan a detached NPC's route to stand next to `target`.
    /// Staying put counts if already within reach.
    pub fn plan_next_to(&self, motion: &mut Motion, target: Cell) -> bool {
        if motion.cell().chebyshev(&target) == 1 {
            motion.set_route(Vec::new(), motion.cell());
            return true;
        }
        match self.interaction_cell(target, &self.occupancy()) {
            Some(cell) => self.plan_route(motion, cell),
            None => false,
        }
    }

    /// Free a seat and queue its table for cleaning
    pub fn release_seat(&mut self, seat: usize) {
        if let Some(table_cell) = self.seating.release(seat) {
            self.queue_dirty_table(table_cell);
        }
    }

    pub fn queue_dirty_table(&mut self, cell: Cell) {
        if !self.dirty_tables.contains(&cell) {
            tracing::debug!(%cell, "Table needs cleaning");
            self.dirty_tables.push_back(cell);
        }
    }

    /// Release the movement freeze on an NPC after a conversation closes.
    /// Timers and routes carry on where they stopped.
    pub fn end_conversation(&mut self, npc: AgentId) -> Result<()> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == npc)
            .ok_or(TavernError::AgentNotFound(npc))?;
        agent.in_conversation = false;
        tracing::debug!(id = %npc, "Conversation ended");
        Ok(())
    }
}
