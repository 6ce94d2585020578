//! Dynamic occupancy on top of static walkability

use crate::core::types::{AgentId, Cell};
use crate::entity::agent::Agent;
use crate::spatial::grid::GridModel;

/// Whether some agent other than `ignore` stands on `cell`.
///
/// An agent stands on the cell its position rounds to. Door cells are never
/// occupied so groups can pass through them together.
pub fn is_occupied(
    grid: &GridModel,
    cell: Cell,
    agents: &[Agent],
    player: Option<&Agent>,
    ignore: Option<AgentId>,
) -> bool {
    if grid.is_door(cell) {
        return false;
    }
    agents
        .iter()
        .chain(player)
        .any(|a| Some(a.id) != ignore && a.cell() == cell)
}

/// A borrowed view of everyone who can block a cell
#[derive(Debug, Clone, Copy)]
pub struct Occupancy<'a> {
    pub agents: &'a [Agent],
    pub player: Option<&'a Agent>,
    pub ignore: Option<AgentId>,
}

impl<'a> Occupancy<'a> {
    pub fn new(agents: &'a [Agent], player: Option<&'a Agent>) -> Self {
        Self {
            agents,
            player,
            ignore: None,
        }
    }

    /// Nobody blocks anything. Used for static-only planning.
    pub fn empty() -> Self {
        Self::new(&[], None)
    }

    pub fn ignoring(mut self, id: AgentId) -> Self {
        self.ignore = Some(id);
        self
    }

    #[inline]
    pub fn is_occupied(&self, grid: &GridModel, cell: Cell) -> bool {
        is_occupied(grid, cell, self.agents, self.player, self.ignore)
    }

    /// Walkable under the standard policy and nobody standing there
    pub fn is_free(&self, grid: &GridModel, cell: Cell) -> bool {
        grid.is_walkable(cell) && !self.is_occupied(grid, cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::agent::Agent;
    use crate::spatial::layout::DOORS;

    #[test]
    fn test_occupied_by_rounded_position() {
        let grid = GridModel::standard(false);
        let mut agent = Agent::test_walker(AgentId(1), Cell::new(20, 10));
        agent.motion.pos.x += 0.4;
        let agents = vec![agent];
        assert!(is_occupied(&grid, Cell::new(20, 10), &agents, None, None));
        assert!(!is_occupied(&grid, Cell::new(21, 10), &agents, None, None));
    }

    #[test]
    fn test_ignore_self() {
        let grid = GridModel::standard(false);
        let agents = vec![Agent::test_walker(AgentId(1), Cell::new(20, 10))];
        assert!(!is_occupied(
            &grid,
            Cell::new(20, 10),
            &agents,
            None,
            Some(AgentId(1))
        ));
    }

    #[test]
    fn test_player_counts_as_occupant() {
        let grid = GridModel::standard(false);
        let player = Agent::test_walker(AgentId(999), Cell::new(5, 10));
        assert!(Occupancy::new(&[], Some(&player)).is_occupied(&grid, Cell::new(5, 10)));
    }

    #[test]
    fn test_doors_exempt_from_occupancy() {
        let grid = GridModel::standard(false);
        let agents = vec![
            Agent::test_walker(AgentId(1), DOORS[0]),
            Agent::test_walker(AgentId(2), DOORS[0]),
        ];
        assert!(!is_occupied(&grid, DOORS[0], &agents, None, None));
    }
}
