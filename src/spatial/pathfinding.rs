//! A* pathfinding over the tavern grid
//!
//! Eight-connected moves: axis-aligned steps cost 1, diagonals cost √2, and
//! the heuristic is straight-line distance. Diagonals may not cut a corner
//! whose two orthogonal neighbours are both statically blocked.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::core::types::Cell;
use crate::spatial::grid::{GridModel, WalkPolicy};
use crate::spatial::occupancy::Occupancy;

const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Neighbour offsets. Orthogonal first, then diagonal.
const NEIGHBORS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Node in the A* open set.
///
/// Ordered for a min-heap on f, then h (prefer nodes closer to the goal),
/// then insertion order so equal candidates pop first-in first-out.
#[derive(Debug, Clone, Copy)]
struct PathNode {
    cell: Cell,
    f_cost: OrderedFloat<f32>,
    h_cost: OrderedFloat<f32>,
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn heuristic(a: Cell, b: Cell) -> f32 {
    a.distance(&b)
}

/// Find a route from `start` to `goal`.
///
/// The returned cells exclude `start` and end at `goal`. An empty route means
/// "nothing to do": start equals goal, either end is unwalkable under
/// `policy`, or no route exists. When `avoid_agents` is set, cells occupied in
/// `occupancy` are treated as blocked, except for relaxed walkers which never
/// plan around agents.
pub fn find_path(
    grid: &GridModel,
    start: Cell,
    goal: Cell,
    policy: WalkPolicy,
    avoid_agents: bool,
    occupancy: &Occupancy<'_>,
) -> Vec<Cell> {
    let walkable = policy.predicate();
    if start == goal || !walkable(grid, start) || !walkable(grid, goal) {
        return Vec::new();
    }
    let check_agents = avoid_agents && policy.plans_around_agents();

    let mut open_set = BinaryHeap::new();
    let mut closed: AHashSet<Cell> = AHashSet::new();
    let mut came_from: AHashMap<Cell, Cell> = AHashMap::new();
    let mut g_scores: AHashMap<Cell, f32> = AHashMap::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        cell: start,
        f_cost: OrderedFloat(heuristic(start, goal)),
        h_cost: OrderedFloat(heuristic(start, goal)),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return reconstruct_path(&came_from, start, goal);
        }
        if !closed.insert(current.cell) {
            continue;
        }

        let current_g = g_scores.get(&current.cell).copied().unwrap_or(f32::INFINITY);

        for (dc, dr) in NEIGHBORS {
            let neighbor = current.cell.offset(dc, dr);
            if closed.contains(&neighbor) || !walkable(grid, neighbor) {
                continue;
            }

            let diagonal = dc != 0 && dr != 0;
            if diagonal
                && !walkable(grid, current.cell.offset(dc, 0))
                && !walkable(grid, current.cell.offset(0, dr))
            {
                continue;
            }

            if check_agents && occupancy.is_occupied(grid, neighbor) {
                continue;
            }

            let step = if diagonal { SQRT_2 } else { 1.0 };
            let tentative_g = current_g + step;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.cell);
                g_scores.insert(neighbor, tentative_g);

                let h = heuristic(neighbor, goal);
                seq += 1;
                open_set.push(PathNode {
                    cell: neighbor,
                    f_cost: OrderedFloat(tentative_g + h),
                    h_cost: OrderedFloat(h),
                    seq,
                });
            }
        }
    }

    Vec::new()
}

/// Walk `came_from` back to `start`, returning the route without `start`
fn reconstruct_path(came_from: &AHashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Total movement cost of a route that starts next to `start`
pub fn path_cost(start: Cell, path: &[Cell]) -> f32 {
    let mut prev = start;
    let mut cost = 0.0;
    for &cell in path {
        cost += if cell.c != prev.c && cell.r != prev.r {
            SQRT_2
        } else {
            1.0
        };
        prev = cell;
    }
    cost
}

/// Closest free, walkable cell around `target`, searching rings of radius
/// 1 through `max_radius`.
///
/// Within a ring the cell nearest to `target` wins; ties keep scan order
/// (row-major from the top-left).
pub fn find_nearest_walkable_position(
    grid: &GridModel,
    target: Cell,
    occupancy: &Occupancy<'_>,
    max_radius: i32,
) -> Option<Cell> {
    for radius in 1..=max_radius {
        let mut best: Option<(f32, Cell)> = None;
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dc.abs() != radius && dr.abs() != radius {
                    continue;
                }
                let cell = target.offset(dc, dr);
                if !occupancy.is_free(grid, cell) {
                    continue;
                }
                let d = cell.distance(&target);
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, cell));
                }
            }
        }
        if let Some((_, cell)) = best {
            return Some(cell);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;
    use crate::entity::agent::Agent;

    fn assert_valid_route(grid: &GridModel, start: Cell, path: &[Cell]) {
        let mut prev = start;
        for &cell in path {
            assert!(prev.is_adjacent(&cell), "{} -> {} is not a single step", prev, cell);
            assert!(grid.is_walkable(cell), "{} is not walkable", cell);
            prev = cell;
        }
    }

    #[test]
    fn test_pathfind_same_cell_is_empty() {
        let grid = GridModel::standard(false);
        let cell = Cell::new(20, 10);
        let path = find_path(&grid, cell, cell, WalkPolicy::Standard, false, &Occupancy::empty());
        assert!(path.is_empty());
    }

    #[test]
    fn test_pathfind_unwalkable_goal_is_empty() {
        let grid = GridModel::standard(false);
        let plant = Cell::new(15, 8);
        let path = find_path(
            &grid,
            Cell::new(20, 10),
            plant,
            WalkPolicy::Standard,
            false,
            &Occupancy::empty(),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_pathfind_straight_line() {
        let grid = GridModel::standard(false);
        let start = Cell::new(20, 12);
        let goal = Cell::new(26, 12);
        let path = find_path(&grid, start, goal, WalkPolicy::Standard, false, &Occupancy::empty());
        assert_eq!(path.len(), 6);
        assert_eq!(path.last(), Some(&goal));
        assert!((path_cost(start, &path) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_pathfind_diagonal_cost_is_optimal() {
        let grid = GridModel::standard(false);
        let start = Cell::new(20, 10);
        let goal = Cell::new(24, 14);
        let path = find_path(&grid, start, goal, WalkPolicy::Standard, false, &Occupancy::empty());
        assert_eq!(path.len(), 4);
        assert!((path_cost(start, &path) - 4.0 * SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn test_pathfind_routes_around_obstacles() {
        let grid = GridModel::standard(false);
        // Straight across the piano block
        let start = Cell::new(16, 21);
        let goal = Cell::new(19, 22);
        let path = find_path(&grid, start, goal, WalkPolicy::Standard, false, &Occupancy::empty());
        assert!(!path.is_empty());
        assert_valid_route(&grid, start, &path);
        assert!(path.iter().all(|c| !grid.is_obstacle(*c)));
    }

    #[test]
    fn test_pathfind_no_corner_cutting() {
        let grid = GridModel::standard(false);
        // (2,1) booth sofa: west is a plant, south is the booth table
        let from = Cell::new(1, 2);
        let to = Cell::new(2, 1);
        let path = find_path(&grid, from, to, WalkPolicy::Standard, false, &Occupancy::empty());
        if let Some(first) = path.first() {
            assert_ne!(*first, to, "diagonal squeezed between two blocked cells");
        }
        assert_valid_route(&grid, from, &path);
    }

    #[test]
    fn test_pathfind_avoids_occupied_cells() {
        let grid = GridModel::standard(false);
        let start = Cell::new(20, 12);
        let goal = Cell::new(22, 12);
        let agents = vec![Agent::test_walker(AgentId(1), Cell::new(21, 12))];
        let occ = Occupancy::new(&agents, None);

        let path = find_path(&grid, start, goal, WalkPolicy::Standard, true, &occ);
        assert!(!path.is_empty());
        assert!(!path.contains(&Cell::new(21, 12)));

        let ignoring = find_path(&grid, start, goal, WalkPolicy::Standard, false, &occ);
        assert_eq!(ignoring, vec![Cell::new(21, 12), goal]);
    }

    #[test]
    fn test_pathfind_relaxed_ignores_agents_and_furniture() {
        let grid = GridModel::standard(false);
        let start = Cell::new(14, 8);
        let goal = Cell::new(16, 8);
        let agents = vec![Agent::test_walker(AgentId(1), Cell::new(15, 7))];
        let occ = Occupancy::new(&agents, None);
        let path = find_path(&grid, start, goal, WalkPolicy::Relaxed, true, &occ);
        assert_eq!(path, vec![Cell::new(15, 8), goal]);
    }

    #[test]
    fn test_pathfind_enclosed_goal_is_empty() {
        let grid = GridModel::standard(false);
        let start = Cell::new(20, 12);
        let goal = Cell::new(30, 12);
        let ring: Vec<Agent> = (-1..=1)
            .flat_map(|dc| (-1..=1).map(move |dr| (dc, dr)))
            .filter(|&(dc, dr)| (dc, dr) != (0, 0))
            .enumerate()
            .map(|(i, (dc, dr))| Agent::test_walker(AgentId(i as u32 + 1), goal.offset(dc, dr)))
            .collect();
        let occ = Occupancy::new(&ring, None);
        assert!(find_path(&grid, start, goal, WalkPolicy::Standard, true, &occ).is_empty());
    }

    #[test]
    fn test_nearest_walkable_prefers_orthogonal_ring_cell() {
        let grid = GridModel::standard(false);
        let target = Cell::new(20, 12);
        let agents = vec![Agent::test_walker(AgentId(1), target)];
        let occ = Occupancy::new(&agents, None);
        let found = find_nearest_walkable_position(&grid, target, &occ, 3);
        assert_eq!(found, Some(Cell::new(20, 11)));
    }

    #[test]
    fn test_nearest_walkable_skips_obstacles() {
        let grid = GridModel::standard(false);
        // Round table at (8,10): stools either side, so the first ring hit is above it
        let found = find_nearest_walkable_position(&grid, Cell::new(8, 10), &Occupancy::empty(), 3);
        let cell = found.expect("open floor around the table");
        assert_eq!(cell.chebyshev(&Cell::new(8, 10)), 1);
        assert!(grid.is_walkable(cell));
    }

    #[test]
    fn test_nearest_walkable_none_when_boxed_in() {
        let grid = GridModel::standard(false);
        let target = Cell::new(20, 12);
        let mut agents = Vec::new();
        let mut id = 1;
        for dr in -3..=3 {
            for dc in -3..=3 {
                if (dc, dr) != (0, 0) {
                    agents.push(Agent::test_walker(AgentId(id), target.offset(dc, dr)));
                    id += 1;
                }
            }
        }
        let occ = Occupancy::new(&agents, None);
        assert_eq!(find_nearest_walkable_position(&grid, target, &occ, 3), None);
    }
}
