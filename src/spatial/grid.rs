//! Static walkability for the tavern floor
//!
//! [`GridModel`] answers "may anything stand here" from map bounds, door gaps,
//! the service counter and the furniture obstacle set. It never looks at agent
//! positions; dynamic occupancy is layered on top in [`super::occupancy`].

use ahash::AHashSet;

use crate::core::types::Cell;
use crate::spatial::layout::{
    is_bookshelf, CellRect, FurnitureKind, TavernLayout, BAR_COUNTER, BARTENDER_WORK_CELLS,
    COLS, DANCE_FLOOR_CENTER, DANCE_FLOOR_RADIUS, DOORS, ROWS, TILE_SIZE,
};

/// Dense 2D grid addressed by [`Cell`]
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.c < 0 || cell.r < 0 {
            return None;
        }
        let (x, y) = (cell.c as usize, cell.r as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.index(cell).map(|i| &self.data[i])
    }

    #[inline]
    pub fn set(&mut self, cell: Cell, value: T) {
        if let Some(i) = self.index(cell) {
            self.data[i] = value;
        }
    }
}

/// Convert a UI pixel position to the cell under it
pub fn cell_from_pixels(x: f32, y: f32) -> Cell {
    Cell::new(
        (x / TILE_SIZE).floor() as i32,
        (y / TILE_SIZE).floor() as i32,
    )
}

/// A walkability predicate. Policies are plain function pointers so the
/// pathfinder can be handed any of them without knowing which.
pub type WalkPredicate = fn(&GridModel, Cell) -> bool;

/// Which static rules a walker follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum WalkPolicy {
    /// Staff, customers and the player: furniture blocks
    Standard,
    /// The cat: ignores furniture, still kept off the dance floor
    Relaxed,
}

impl WalkPolicy {
    pub fn predicate(self) -> WalkPredicate {
        match self {
            WalkPolicy::Standard => GridModel::is_walkable,
            WalkPolicy::Relaxed => GridModel::is_walkable_relaxed,
        }
    }

    /// Relaxed walkers never plan around other agents
    pub fn plans_around_agents(self) -> bool {
        matches!(self, WalkPolicy::Standard)
    }
}

#[derive(Debug, Clone)]
pub struct GridModel {
    pub cols: i32,
    pub rows: i32,
    layout: TavernLayout,
    obstacles: AHashSet<Cell>,
    walkable: Grid<bool>,
    walkable_relaxed: Grid<bool>,
}

impl GridModel {
    /// Build the static model from a layout. Walkability is computed once.
    pub fn new(layout: TavernLayout) -> Self {
        let obstacles: AHashSet<Cell> = layout.obstacles().collect();
        let mut model = Self {
            cols: COLS,
            rows: ROWS,
            layout,
            obstacles,
            walkable: Grid::new(COLS as usize, ROWS as usize),
            walkable_relaxed: Grid::new(COLS as usize, ROWS as usize),
        };

        for r in 0..ROWS {
            for c in 0..COLS {
                let cell = Cell::new(c, r);
                let structural = model.structurally_open(cell);
                model
                    .walkable
                    .set(cell, structural && !model.obstacles.contains(&cell));
                model.walkable_relaxed.set(
                    cell,
                    structural && cell.distance(&DANCE_FLOOR_CENTER) >= DANCE_FLOOR_RADIUS,
                );
            }
        }

        tracing::debug!(
            obstacles = model.obstacles.len(),
            "Grid model built"
        );
        model
    }

    /// The standard tavern floor
    pub fn standard(seasonal: bool) -> Self {
        Self::new(TavernLayout::standard(seasonal))
    }

    pub fn layout(&self) -> &TavernLayout {
        &self.layout
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.c >= 0 && cell.r >= 0 && cell.c < self.cols && cell.r < self.rows
    }

    #[inline]
    pub fn is_door(&self, cell: Cell) -> bool {
        DOORS.contains(&cell)
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        let edge = cell.c == 0 || cell.r == 0 || cell.c == self.cols - 1 || cell.r == self.rows - 1;
        self.in_bounds(cell) && edge && !self.is_door(cell)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    pub fn is_bookshelf(&self, cell: Cell) -> bool {
        is_bookshelf(cell)
    }

    pub fn furniture_at(&self, cell: Cell) -> Option<FurnitureKind> {
        self.layout.furniture_at(cell)
    }

    /// Bounds, walls and the counter. Shared by every policy.
    fn structurally_open(&self, cell: Cell) -> bool {
        if !self.in_bounds(cell) || self.is_wall(cell) {
            return false;
        }
        if BAR_COUNTER.contains(cell) {
            return BARTENDER_WORK_CELLS.contains(&cell);
        }
        true
    }

    /// Default walkability: static geometry plus furniture
    #[inline]
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.walkable.get(cell).copied().unwrap_or(false)
    }

    /// Relaxed walkability: ignores furniture, avoids the dance floor
    #[inline]
    pub fn is_walkable_relaxed(&self, cell: Cell) -> bool {
        self.walkable_relaxed.get(cell).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_walkable_for(&self, cell: Cell, policy: WalkPolicy) -> bool {
        (policy.predicate())(self, cell)
    }

    /// Walkable cells inside a rectangle under the given policy
    pub fn walkable_cells_in(&self, rect: &CellRect, policy: WalkPolicy) -> Vec<Cell> {
        rect.cells()
            .filter(|&c| self.is_walkable_for(c, policy))
            .collect()
    }
}
