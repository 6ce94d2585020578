//! Seats and the tables they belong to
//!
//! Seats come from the layout's seating furniture. A seat is only offered to
//! customers if it stays reachable from the entrance when every other seat is
//! taken, so a seated customer can never wall another one in.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::Serialize;

use crate::core::types::Cell;
use crate::spatial::grid::GridModel;
use crate::spatial::layout::{TableKind, ENTRANCES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub cell: Cell,
    /// Index into [`SeatingPlan::tables`]
    pub table: usize,
    /// Nearest table cell; dirty markers are queued here
    pub table_cell: Cell,
    pub occupied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableGroup {
    pub id: usize,
    pub kind: TableKind,
    pub cells: Vec<Cell>,
    /// Indices into [`SeatingPlan::seats`]
    pub seats: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeatingPlan {
    pub seats: Vec<Seat>,
    pub tables: Vec<TableGroup>,
}

impl SeatingPlan {
    pub fn from_grid(grid: &GridModel) -> Self {
        let candidates: AHashSet<Cell> = grid
            .layout()
            .tables
            .iter()
            .flat_map(|t| t.seat_cells.iter().copied())
            .collect();
        let reachable = reachable_without(grid, &candidates);

        let mut plan = SeatingPlan::default();
        for spec in &grid.layout().tables {
            let id = plan.tables.len();
            let mut group = TableGroup {
                id,
                kind: spec.kind,
                cells: spec.table_cells.clone(),
                seats: Vec::new(),
            };
            for &cell in &spec.seat_cells {
                let accessible = grid.is_walkable(cell)
                    && step_neighbors(grid, cell).any(|n| reachable.contains(&n));
                if !accessible {
                    tracing::trace!(%cell, "Seat skipped, not reachable past other seats");
                    continue;
                }
                let table_cell = spec
                    .table_cells
                    .iter()
                    .copied()
                    .min_by(|a, b| a.distance(&cell).total_cmp(&b.distance(&cell)))
                    .unwrap_or(cell);
                group.seats.push(plan.seats.len());
                plan.seats.push(Seat {
                    cell,
                    table: id,
                    table_cell,
                    occupied: false,
                });
            }
            plan.tables.push(group);
        }

        tracing::debug!(
            seats = plan.seats.len(),
            tables = plan.tables.len(),
            "Seating plan built"
        );
        plan
    }

    pub fn seat(&self, idx: usize) -> Option<&Seat> {
        self.seats.get(idx)
    }

    pub fn free_seats(&self, table: usize) -> Vec<usize> {
        self.tables
            .get(table)
            .map(|t| {
                t.seats
                    .iter()
                    .copied()
                    .filter(|&s| !self.seats[s].occupied)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tables with at least `group_size` free seats
    pub fn tables_with_room(&self, group_size: usize) -> Vec<usize> {
        self.tables
            .iter()
            .filter(|t| self.free_seats(t.id).len() >= group_size)
            .map(|t| t.id)
            .collect()
    }

    /// Mark a seat taken. Returns false if it was already taken.
    pub fn occupy(&mut self, idx: usize) -> bool {
        match self.seats.get_mut(idx) {
            Some(seat) if !seat.occupied => {
                seat.occupied = true;
                true
            }
            _ => false,
        }
    }

    /// Free a seat, returning the table cell that now needs cleaning
    pub fn release(&mut self, idx: usize) -> Option<Cell> {
        let seat = self.seats.get_mut(idx)?;
        if !seat.occupied {
            return None;
        }
        seat.occupied = false;
        Some(seat.table_cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.occupied).count()
    }
}

/// Neighbours a walker may step to, honouring the no-corner-cutting rule
fn step_neighbors(grid: &GridModel, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
    (-1..=1)
        .flat_map(|dr| (-1..=1).map(move |dc| (dc, dr)))
        .filter(|&(dc, dr)| (dc, dr) != (0, 0))
        .filter(move |&(dc, dr)| {
            dc == 0
                || dr == 0
                || grid.is_walkable(cell.offset(dc, 0))
                || grid.is_walkable(cell.offset(0, dr))
        })
        .map(move |(dc, dr)| cell.offset(dc, dr))
}

/// Flood fill from the entrances through walkable cells, treating `blocked` as walls
fn reachable_without(grid: &GridModel, blocked: &AHashSet<Cell>) -> AHashSet<Cell> {
    let mut seen: AHashSet<Cell> = AHashSet::new();
    let mut queue: VecDeque<Cell> = VecDeque::new();
    for door in ENTRANCES {
        if seen.insert(door) {
            queue.push_back(door);
        }
    }
    while let Some(cell) = queue.pop_front() {
        for next in step_neighbors(grid, cell) {
            if grid.is_walkable(next) && !blocked.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::layout::TableKind;

    #[test]
    fn test_every_table_keeps_a_seat() {
        let grid = GridModel::standard(false);
        let plan = SeatingPlan::from_grid(&grid);
        for table in &plan.tables {
            assert!(!table.seats.is_empty(), "table {} has no usable seats", table.id);
        }
    }

    #[test]
    fn test_wall_locked_booth_sofas_are_dropped() {
        let grid = GridModel::standard(false);
        let plan = SeatingPlan::from_grid(&grid);
        // Middle sofa of a left-wall booth can only be reached over its neighbours
        assert!(!plan.seats.iter().any(|s| s.cell == Cell::new(1, 10)));
        // End sofas open onto the aisle
        assert!(plan.seats.iter().any(|s| s.cell == Cell::new(1, 9)));
    }

    #[test]
    fn test_round_tables_have_two_stools() {
        let grid = GridModel::standard(false);
        let plan = SeatingPlan::from_grid(&grid);
        for table in plan.tables.iter().filter(|t| t.kind == TableKind::Round) {
            assert_eq!(table.seats.len(), 2);
        }
    }

    #[test]
    fn test_occupy_and_release() {
        let grid = GridModel::standard(false);
        let mut plan = SeatingPlan::from_grid(&grid);
        let seat = plan.tables[0].seats[0];
        let before = plan.free_seats(0).len();

        assert!(plan.occupy(seat));
        assert!(!plan.occupy(seat));
        assert_eq!(plan.free_seats(0).len(), before - 1);

        let table_cell = plan.release(seat);
        assert_eq!(table_cell, Some(plan.seats[seat].table_cell));
        assert_eq!(plan.release(seat), None);
    }

    #[test]
    fn test_tables_with_room_filters_by_size() {
        let grid = GridModel::standard(false);
        let plan = SeatingPlan::from_grid(&grid);
        let for_four = plan.tables_with_room(4);
        assert!(!for_four.is_empty());
        assert!(for_four
            .iter()
            .all(|&t| plan.tables[t].kind != TableKind::Round));
    }
}
