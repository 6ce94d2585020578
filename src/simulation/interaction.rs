//! Player clicks and conversations
//!
//! A click on an NPC in reach opens a dialogue right away. A click on an NPC
//! further off walks the player next to it and opens the dialogue once the
//! walk ends in reach. A click on the bookshelf does the same for the poem
//! library. Any other click is a plain move and cancels whatever was pending.

use serde::Serialize;

use crate::behavior::customer::CustomerState;
use crate::core::types::{AgentId, Cell};
use crate::entity::agent::{Agent, Behavior, Role};
use crate::simulation::movement;
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::grid::cell_from_pixels;
use crate::spatial::layout::BOOKSHELF_COLUMN;
use crate::spatial::occupancy::Occupancy;

/// Reference cell for distance checks against the bookshelf
pub const BOOKSHELF_ANCHOR: Cell = Cell::new(BOOKSHELF_COLUMN, 26);

const SLEEPING_LINE: &str = "zzz...";
const SANTA_LINE: &str = "Hey, I brought you a present. I left it on the bookshelf in the poet's corner.";
const STAFF_GREETING: &str = "Hello! What can I do for you?";
const CAT_LINE: &str = "Meow.";

/// Payload handed to the UI when a conversation opens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueOpen {
    pub is_open: bool,
    pub speaker_name: String,
    pub content: String,
    /// The UI should show a thinking indicator and fetch the text itself
    pub is_thinking: bool,
    pub role: Role,
    pub npc_id: AgentId,
}

/// Receives what a click or a finished approach opens
pub trait InteractionSink {
    fn on_dialogue_open(&mut self, dialogue: DialogueOpen);
    fn on_open_side_channel(&mut self);
}

/// A sink that drops everything, for headless runs
#[derive(Debug, Default)]
pub struct NullSink;

impl InteractionSink for NullSink {
    fn on_dialogue_open(&mut self, _dialogue: DialogueOpen) {}
    fn on_open_side_channel(&mut self) {}
}

/// Collects everything opened, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub dialogues: Vec<DialogueOpen>,
    pub side_channels: usize,
}

impl InteractionSink for RecordingSink {
    fn on_dialogue_open(&mut self, dialogue: DialogueOpen) {
        self.dialogues.push(dialogue);
    }

    fn on_open_side_channel(&mut self) {
        self.side_channels += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PendingInteraction {
    Npc(AgentId),
    Bookshelf(Cell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Outside the map
    Ignored,
    DialogueOpened(AgentId),
    SideChannelOpened,
    /// Walking over; the interaction fires on arrival
    Approaching(PendingInteraction),
    /// Plain move. `false` when no route was found.
    Moving(bool),
}

/// What the NPC says first
fn dialogue_for(agent: &Agent) -> DialogueOpen {
    let (speaker_name, content, is_thinking) = match &agent.behavior {
        Behavior::Customer(mind) => {
            let speaker = agent
                .identity
                .as_ref()
                .map(|i| format!("{} ({})", i.name, i.display_line()))
                .unwrap_or_else(|| format!("Customer {}", agent.id));
            if mind.state == CustomerState::Sleeping {
                (speaker, SLEEPING_LINE.to_string(), false)
            } else {
                let thinking = agent.identity.as_ref().is_some_and(|i| i.motivation.is_none());
                (speaker, String::new(), thinking)
            }
        }
        Behavior::Bartender(_) | Behavior::Waiter(_) | Behavior::Cleaner(_) => {
            (agent.name.clone(), STAFF_GREETING.to_string(), false)
        }
        Behavior::Santa(_) => (agent.name.clone(), SANTA_LINE.to_string(), false),
        Behavior::Cat(_) => (agent.name.clone(), CAT_LINE.to_string(), false),
        Behavior::Poet(_) | Behavior::Musician(_) | Behavior::Player => {
            (agent.name.clone(), String::new(), true)
        }
    };
    DialogueOpen {
        is_open: true,
        speaker_name,
        content,
        is_thinking,
        role: agent.role(),
        npc_id: agent.id,
    }
}

impl World {
    /// Click in pixel coordinates, as a renderer reports it
    pub fn handle_click(&mut self, x: f32, y: f32, sink: &mut dyn InteractionSink) -> ClickOutcome {
        self.click_cell(cell_from_pixels(x, y), sink)
    }

    /// Click on a grid cell
    pub fn click_cell(&mut self, cell: Cell, sink: &mut dyn InteractionSink) -> ClickOutcome {
        if !self.grid.in_bounds(cell) {
            return ClickOutcome::Ignored;
        }
        self.pending_interaction = None;

        if self.grid.is_bookshelf(cell) {
            if self.player_in_reach(BOOKSHELF_ANCHOR) {
                tracing::debug!("Opening the poem library");
                sink.on_open_side_channel();
                return ClickOutcome::SideChannelOpened;
            }
            let pending = PendingInteraction::Bookshelf(cell);
            if self.approach(pending) {
                return ClickOutcome::Approaching(pending);
            }
            return ClickOutcome::Moving(false);
        }

        let clicked = self.agents.iter().find(|a| a.cell() == cell).map(|a| (a.id, a.cell()));
        if let Some((npc, npc_cell)) = clicked {
            if self.player_in_reach(npc_cell) {
                if let Some(dialogue) = self.open_dialogue(npc) {
                    sink.on_dialogue_open(dialogue);
                    return ClickOutcome::DialogueOpened(npc);
                }
            }
            let pending = PendingInteraction::Npc(npc);
            if self.approach(pending) {
                return ClickOutcome::Approaching(pending);
            }
            return ClickOutcome::Moving(false);
        }

        ClickOutcome::Moving(self.move_player_to(cell))
    }

    fn player_in_reach(&self, target: Cell) -> bool {
        self.player.motion.pos.distance(&target.to_vec2()) <= self.config.interaction_radius
    }

    fn move_player_to(&mut self, goal: Cell) -> bool {
        let occupancy = Occupancy::new(&self.agents, None);
        movement::plan_route(
            &self.grid,
            &mut self.player.motion,
            goal,
            &occupancy,
            self.config.nearest_search_radius,
        )
    }

    /// Where the player should stand for `pending`
    fn approach_cell(&self, pending: PendingInteraction) -> Option<Cell> {
        let occupancy = Occupancy::new(&self.agents, None);
        match pending {
            PendingInteraction::Npc(id) => {
                let target = self.agent(id)?.cell();
                self.interaction_cell(target, &occupancy)
            }
            PendingInteraction::Bookshelf(_) => {
                // The shelf is against the east wall, so try its west side first
                let a = BOOKSHELF_ANCHOR;
                [a.offset(-1, 0), a.offset(-1, -1), a.offset(-1, 1), a.offset(0, -1), a.offset(0, 1)]
                    .into_iter()
                    .find(|&c| occupancy.is_free(&self.grid, c))
                    .or_else(|| self.interaction_cell(a, &occupancy))
            }
        }
    }

    /// Walk the player toward `pending` and remember it
    fn approach(&mut self, pending: PendingInteraction) -> bool {
        let Some(cell) = self.approach_cell(pending) else {
            tracing::debug!(?pending, "Nowhere to stand for interaction");
            return false;
        };
        let planned = self.move_player_to(cell);
        if planned {
            self.pending_interaction = Some(pending);
        }
        planned
    }

    /// Flag the NPC as talking and build its opening line
    fn open_dialogue(&mut self, npc: AgentId) -> Option<DialogueOpen> {
        let agent = self.agents.iter_mut().find(|a| a.id == npc)?;
        agent.in_conversation = true;
        tracing::debug!(id = %npc, role = agent.role().label(), "Dialogue opened");
        Some(dialogue_for(agent))
    }

    /// Fire the pending interaction once the player has stopped in reach.
    /// Runs inside the tick, so results go out as events.
    pub fn resolve_pending_interaction(&mut self) {
        let Some(pending) = self.pending_interaction else {
            return;
        };
        if self.player.motion.is_moving() {
            return;
        }

        match pending {
            PendingInteraction::Npc(id) => {
                let Some(target) = self.agents.iter().find(|a| a.id == id).map(|a| a.cell()) else {
                    tracing::debug!(id = %id, "Interaction target left");
                    self.pending_interaction = None;
                    return;
                };
                if self.player_in_reach(target) {
                    self.pending_interaction = None;
                    if let Some(dialogue) = self.open_dialogue(id) {
                        self.emit(SimulationEvent::DialogueOpened {
                            npc: id,
                            role: dialogue.role,
                        });
                    }
                    return;
                }
                // The NPC walked off; follow it
                if !self.approach(pending) {
                    self.pending_interaction = None;
                }
            }
            PendingInteraction::Bookshelf(cell) => {
                self.pending_interaction = None;
                if self.player_in_reach(BOOKSHELF_ANCHOR) {
                    self.emit(SimulationEvent::SideChannelOpened { cell });
                } else {
                    tracing::debug!("Could not reach the bookshelf");
                }
            }
        }
    }

    /// Hand dialogue and side-channel events from a tick to the UI
    pub fn dispatch_events(&self, events: &[SimulationEvent], sink: &mut dyn InteractionSink) {
        for event in events {
            match event {
                SimulationEvent::DialogueOpened { npc, .. } => {
                    if let Some(agent) = self.agents.iter().find(|a| a.id == *npc) {
                        sink.on_dialogue_open(dialogue_for(agent));
                    }
                }
                SimulationEvent::SideChannelOpened { .. } => sink.on_open_side_channel(),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::ambient::SantaMind;
    use crate::behavior::customer::CustomerMind;
    use crate::core::config::SimulationConfig;
    use crate::entity::agent::Motion;
    use crate::simulation::tick::run_ticks;
    use crate::simulation::world::PLAYER_START;
    use crate::spatial::grid::WalkPolicy;

    fn world() -> World {
        let config = SimulationConfig {
            spawn_probability: 0.0,
            ..Default::default()
        };
        World::new(config).expect("valid config")
    }

    fn add_walker(world: &mut World, id: u32, cell: Cell) -> AgentId {
        let id = AgentId(id);
        world.add_agent(Agent::test_walker(id, cell));
        id
    }

    #[test]
    fn test_click_npc_in_reach_opens_dialogue() {
        let mut world = world();
        let npc = add_walker(&mut world, 1, PLAYER_START.offset(1, 0));
        let mut sink = RecordingSink::default();

        let outcome = world.click_cell(PLAYER_START.offset(1, 0), &mut sink);

        assert_eq!(outcome, ClickOutcome::DialogueOpened(npc));
        assert_eq!(sink.dialogues.len(), 1);
        assert_eq!(sink.dialogues[0].npc_id, npc);
        assert!(world.agent(npc).map(|a| a.in_conversation).unwrap_or(false));
    }

    #[test]
    fn test_click_distant_npc_sets_pending() {
        let mut world = world();
        let npc = add_walker(&mut world, 1, Cell::new(20, 12));
        let mut sink = RecordingSink::default();

        let outcome = world.click_cell(Cell::new(20, 12), &mut sink);

        assert_eq!(outcome, ClickOutcome::Approaching(PendingInteraction::Npc(npc)));
        assert!(sink.dialogues.is_empty());
        assert!(world.player.motion.is_moving());
    }

    #[test]
    fn test_pending_fires_on_arrival() {
        let mut world = world();
        let npc = add_walker(&mut world, 1, Cell::new(12, 12));
        let mut sink = RecordingSink::default();
        world.click_cell(Cell::new(12, 12), &mut sink);

        let events = run_ticks(&mut world, 600);
        world.dispatch_events(&events, &mut sink);

        assert!(world.pending_interaction.is_none());
        assert!(events
            .iter()
            .any(|e| matches!(e, SimulationEvent::DialogueOpened { npc: n, .. } if *n == npc)));
        assert_eq!(sink.dialogues.len(), 1);
    }

    #[test]
    fn test_plain_click_cancels_pending() {
        let mut world = world();
        add_walker(&mut world, 1, Cell::new(20, 12));
        let mut sink = RecordingSink::default();
        world.click_cell(Cell::new(20, 12), &mut sink);
        assert!(world.pending_interaction.is_some());

        let outcome = world.click_cell(Cell::new(10, 20), &mut sink);

        assert_eq!(outcome, ClickOutcome::Moving(true));
        assert!(world.pending_interaction.is_none());
    }

    #[test]
    fn test_out_of_bounds_click_ignored() {
        let mut world = world();
        let mut sink = NullSink;
        assert_eq!(world.click_cell(Cell::new(-1, 3), &mut sink), ClickOutcome::Ignored);
        assert_eq!(world.click_cell(Cell::new(48, 3), &mut sink), ClickOutcome::Ignored);
    }

    #[test]
    fn test_sleeping_customer_says_zzz() {
        let mut world = world();
        let cell = PLAYER_START.offset(0, 1);
        let mut mind = CustomerMind::seated(0, 0);
        mind.state = CustomerState::Sleeping;
        mind.seat = None;
        world.add_agent(Agent::new(
            AgentId(100),
            "Sleepy",
            Motion::new(cell, 1.2, WalkPolicy::Standard),
            Behavior::Customer(mind),
        ));
        let mut sink = RecordingSink::default();

        world.click_cell(cell, &mut sink);

        assert_eq!(sink.dialogues[0].content, SLEEPING_LINE);
        assert!(!sink.dialogues[0].is_thinking);
    }

    #[test]
    fn test_santa_gives_gift_line() {
        let mut world = world();
        let cell = PLAYER_START.offset(1, 1);
        world.add_agent(Agent::new(
            AgentId(9),
            "Santa",
            Motion::new(cell, 0.8, WalkPolicy::Standard),
            Behavior::Santa(SantaMind::new(cell)),
        ));
        let mut sink = RecordingSink::default();

        world.click_cell(cell, &mut sink);

        assert_eq!(sink.dialogues[0].content, SANTA_LINE);
        assert_eq!(sink.dialogues[0].role, Role::Santa);
    }

    #[test]
    fn test_bookshelf_click_from_afar_walks_over() {
        let mut world = world();
        let mut sink = RecordingSink::default();

        let outcome = world.click_cell(Cell::new(BOOKSHELF_COLUMN, 27), &mut sink);

        assert!(matches!(
            outcome,
            ClickOutcome::Approaching(PendingInteraction::Bookshelf(_))
        ));
        assert_eq!(sink.side_channels, 0);
    }

    #[test]
    fn test_bookshelf_click_in_reach_opens_library() {
        let mut world = world();
        world.player.motion = Motion::new(BOOKSHELF_ANCHOR.offset(-1, -1), 4.0, WalkPolicy::Standard);
        let mut sink = RecordingSink::default();

        let outcome = world.click_cell(Cell::new(BOOKSHELF_COLUMN, 26), &mut sink);

        assert_eq!(outcome, ClickOutcome::SideChannelOpened);
        assert_eq!(sink.side_channels, 1);
    }

    #[test]
    fn test_end_conversation_releases_freeze() {
        let mut world = world();
        let npc = add_walker(&mut world, 1, PLAYER_START.offset(1, 0));
        world.click_cell(PLAYER_START.offset(1, 0), &mut NullSink);

        world.end_conversation(npc).expect("known npc");

        assert!(!world.agent(npc).map(|a| a.in_conversation).unwrap_or(true));
    }
}
