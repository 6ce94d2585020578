//! Declarative tavern floor plan
//!
//! The layout lists every piece of furniture by cell. Obstacles and seats are
//! derived from it once at startup; nothing here changes during a session.

use serde::Serialize;

use crate::core::types::Cell;

/// Map width in cells
pub const COLS: i32 = 48;
/// Map height in cells
pub const ROWS: i32 = 32;
/// Pixel size of one cell, used to convert UI clicks into cells
pub const TILE_SIZE: f32 = 32.0;

/// Boundary gaps. Two on each side wall plus the restroom door.
pub const DOORS: [Cell; 5] = [
    Cell::new(0, 6),
    Cell::new(0, 7),
    Cell::new(COLS - 1, 6),
    Cell::new(COLS - 1, 7),
    Cell::new(0, 22),
];

/// Doors customers arrive through and leave by
pub const ENTRANCES: [Cell; 4] = [DOORS[0], DOORS[1], DOORS[2], DOORS[3]];

pub const DANCE_FLOOR_CENTER: Cell = Cell::new(24, 16);
/// Cells closer than this to the dance floor center are off limits to the cat
pub const DANCE_FLOOR_RADIUS: f32 = 8.0;
/// Dance spots are picked within this many cells of the center on each axis
pub const DANCE_SPOT_SPREAD: i32 = 3;

/// The service counter. Only [`BARTENDER_WORK_CELLS`] inside it are walkable.
pub const BAR_COUNTER: CellRect = CellRect::new(Cell::new(43, 13), Cell::new(45, 19));

/// Cells behind the counter where drinks are prepared
pub const BARTENDER_WORK_CELLS: [Cell; 5] = [
    Cell::new(45, 14),
    Cell::new(45, 15),
    Cell::new(45, 16),
    Cell::new(45, 17),
    Cell::new(45, 18),
];

/// Where bartenders shuffle around when there is nothing to make
pub const BARTENDER_ZONE: CellRect = CellRect::new(Cell::new(44, 13), Cell::new(46, 19));

/// The customer-facing side of the counter where waiters hand in orders
pub const BAR_SERVICE_COLUMN: i32 = 42;

pub const BOOKSHELF_COLUMN: i32 = 46;
pub const BOOKSHELF_ROWS: std::ops::RangeInclusive<i32> = 25..=28;

/// Spots next to the poet's desk and armchair
pub const POET_DESK_SPOT: Cell = Cell::new(45, 26);
pub const POET_CHAIR_SPOT: Cell = Cell::new(44, 26);
pub const POET_CORNER: CellRect = CellRect::new(Cell::new(42, 25), Cell::new(46, 29));

pub const SEASONAL_TREE: Cell = Cell::new(27, 24);

/// Inclusive rectangle of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellRect {
    pub min: Cell,
    pub max: Cell,
}

impl CellRect {
    pub const fn new(min: Cell, max: Cell) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (self.min.c..=self.max.c).contains(&cell.c) && (self.min.r..=self.max.r).contains(&cell.r)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.min.r..=self.max.r)
            .flat_map(move |r| (self.min.c..=self.max.c).map(move |c| Cell::new(c, r)))
    }
}

/// Areas the cleaner and idle waiters walk around in
pub const WANDER_ZONES: [CellRect; 5] = [
    CellRect::new(Cell::new(16, 9), Cell::new(31, 23)),
    CellRect::new(Cell::new(5, 8), Cell::new(14, 26)),
    CellRect::new(Cell::new(33, 8), Cell::new(41, 25)),
    CellRect::new(Cell::new(2, 3), Cell::new(40, 6)),
    CellRect::new(Cell::new(2, 27), Cell::new(40, 29)),
];

/// Every cell of the map, walls included
pub const TAVERN_BOUNDS: CellRect = CellRect::new(Cell::new(0, 0), Cell::new(COLS - 1, ROWS - 1));

pub fn bar_service_cells() -> impl Iterator<Item = Cell> {
    (BAR_COUNTER.min.r..=BAR_COUNTER.max.r).map(|r| Cell::new(BAR_SERVICE_COLUMN, r))
}

pub fn is_bookshelf(cell: Cell) -> bool {
    cell.c == BOOKSHELF_COLUMN && BOOKSHELF_ROWS.contains(&cell.r)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FurnitureKind {
    Plant,
    Piano,
    BoothSofa,
    BoothTable,
    Chair,
    RoundTable,
    WoodenStool,
    LongTable,
    SmallSofa,
    CoffeeTable,
    Bookshelf,
    Desk,
    Armchair,
    Lamp,
    TreeTrunk,
    BarStool,
}

impl FurnitureKind {
    /// Whether the piece blocks movement for normal walkers
    pub fn blocks(self) -> bool {
        !matches!(
            self,
            FurnitureKind::BoothSofa
                | FurnitureKind::Chair
                | FurnitureKind::WoodenStool
                | FurnitureKind::SmallSofa
                | FurnitureKind::BarStool
        )
    }

    /// Whether customers can sit on it. Bar stools are decoration only.
    pub fn is_seating(self) -> bool {
        matches!(
            self,
            FurnitureKind::BoothSofa
                | FurnitureKind::Chair
                | FurnitureKind::WoodenStool
                | FurnitureKind::SmallSofa
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Furniture {
    pub kind: FurnitureKind,
    pub cell: Cell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableKind {
    Booth,
    Round,
    Long,
    Lounge,
}

/// A table and the seating placed around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub kind: TableKind,
    pub table_cells: Vec<Cell>,
    pub seat_cells: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

/// The complete floor plan
#[derive(Debug, Clone, Default)]
pub struct TavernLayout {
    pub furniture: Vec<Furniture>,
    pub tables: Vec<TableSpec>,
}

impl TavernLayout {
    /// The standard tavern floor. `seasonal` adds the holiday tree.
    pub fn standard(seasonal: bool) -> Self {
        let mut layout = Self::default();

        for (c, r) in [
            (1, 1),
            (COLS - 2, 1),
            (1, ROWS - 2),
            (COLS - 2, ROWS - 2),
            (15, 8),
            (32, 8),
            (15, 24),
            (32, 24),
        ] {
            layout.place(FurnitureKind::Plant, Cell::new(c, r));
        }

        for cell in [
            Cell::new(17, 21),
            Cell::new(18, 21),
            Cell::new(17, 22),
            Cell::new(18, 22),
        ] {
            layout.place(FurnitureKind::Piano, cell);
        }

        // Booths line the left, top and bottom walls
        for r in [9, 13, 18, 24] {
            layout.booth(Cell::new(1, r), 3, Orientation::Vertical);
        }
        let top_booths = [(2, 3), (7, 2), (11, 3), (16, 3), (21, 2), (25, 3), (30, 3), (35, 2)];
        for (c, len) in top_booths {
            layout.booth(Cell::new(c, 1), len, Orientation::Horizontal);
        }
        for (c, len) in top_booths {
            layout.booth(Cell::new(c, ROWS - 2), len, Orientation::Horizontal);
        }

        layout.poet_corner();

        for (c, r) in [
            (8, 10),
            (12, 9),
            (11, 13),
            (6, 14),
            (10, 16),
            (13, 18),
            (7, 20),
            (11, 22),
            (9, 25),
        ] {
            layout.round_table(Cell::new(c, r));
        }

        for (c, r) in [(39, 9), (33, 10), (33, 16), (36, 23)] {
            layout.long_table(Cell::new(c, r), Orientation::Horizontal);
        }
        for (c, r) in [(36, 13), (38, 18)] {
            layout.long_table(Cell::new(c, r), Orientation::Vertical);
        }

        // L-shaped lounges: sofas right of and below the coffee table
        for (c, r) in [(18, 5), (31, 23)] {
            let table = Cell::new(c, r);
            layout.lounge(table, [table.offset(1, 0), table.offset(0, 1)]);
        }
        // Facing lounges: sofas either side of the coffee table
        for (c, r) in [(32, 6), (22, 26)] {
            let table = Cell::new(c, r);
            layout.lounge(table, [table.offset(-1, 0), table.offset(1, 0)]);
        }

        for r in [14, 15, 17, 18] {
            layout.place(FurnitureKind::BarStool, Cell::new(BAR_SERVICE_COLUMN, r));
        }

        if seasonal {
            layout.place(FurnitureKind::TreeTrunk, SEASONAL_TREE);
        }

        layout
    }

    fn place(&mut self, kind: FurnitureKind, cell: Cell) {
        self.furniture.push(Furniture { kind, cell });
    }

    /// Sofa against the wall, a table strip, then a row of chairs facing it
    fn booth(&mut self, start: Cell, len: i32, orientation: Orientation) {
        let (along, across) = match orientation {
            Orientation::Horizontal => ((1, 0), if start.r < 10 { (0, 1) } else { (0, -1) }),
            Orientation::Vertical => ((0, 1), (1, 0)),
        };

        let mut spec = TableSpec {
            kind: TableKind::Booth,
            table_cells: Vec::new(),
            seat_cells: Vec::new(),
        };
        for i in 0..len {
            let sofa = start.offset(along.0 * i, along.1 * i);
            let table = sofa.offset(across.0, across.1);
            let chair = table.offset(across.0, across.1);
            self.place(FurnitureKind::BoothSofa, sofa);
            self.place(FurnitureKind::BoothTable, table);
            self.place(FurnitureKind::Chair, chair);
            spec.table_cells.push(table);
            spec.seat_cells.push(sofa);
            spec.seat_cells.push(chair);
        }
        self.tables.push(spec);
    }

    fn round_table(&mut self, center: Cell) {
        let stools = [center.offset(-1, 0), center.offset(1, 0)];
        self.place(FurnitureKind::RoundTable, center);
        for stool in stools {
            self.place(FurnitureKind::WoodenStool, stool);
        }
        self.tables.push(TableSpec {
            kind: TableKind::Round,
            table_cells: vec![center],
            seat_cells: stools.to_vec(),
        });
    }

    fn long_table(&mut self, start: Cell, orientation: Orientation) {
        let (along, across) = match orientation {
            Orientation::Horizontal => ((1, 0), (0, 1)),
            Orientation::Vertical => ((0, 1), (1, 0)),
        };
        let table_cells = vec![start, start.offset(along.0, along.1)];
        let mut seat_cells = Vec::with_capacity(4);
        for &cell in &table_cells {
            self.place(FurnitureKind::LongTable, cell);
            for side in [-1, 1] {
                let chair = cell.offset(across.0 * side, across.1 * side);
                self.place(FurnitureKind::Chair, chair);
                seat_cells.push(chair);
            }
        }
        self.tables.push(TableSpec {
            kind: TableKind::Long,
            table_cells,
            seat_cells,
        });
    }

    fn lounge(&mut self, table: Cell, sofas: [Cell; 2]) {
        self.place(FurnitureKind::CoffeeTable, table);
        for sofa in sofas {
            self.place(FurnitureKind::SmallSofa, sofa);
        }
        self.tables.push(TableSpec {
            kind: TableKind::Lounge,
            table_cells: vec![table],
            seat_cells: sofas.to_vec(),
        });
    }

    fn poet_corner(&mut self) {
        for r in BOOKSHELF_ROWS {
            self.place(FurnitureKind::Bookshelf, Cell::new(BOOKSHELF_COLUMN, r));
        }
        self.place(FurnitureKind::Desk, POET_DESK_SPOT);
        self.place(FurnitureKind::Armchair, POET_CHAIR_SPOT);
        self.place(FurnitureKind::Lamp, Cell::new(BOOKSHELF_COLUMN, 29));
    }

    /// Every cell that blocks normal walkers
    pub fn obstacles(&self) -> impl Iterator<Item = Cell> + '_ {
        self.furniture
            .iter()
            .filter(|f| f.kind.blocks())
            .map(|f| f.cell)
    }

    pub fn furniture_at(&self, cell: Cell) -> Option<FurnitureKind> {
        self.furniture
            .iter()
            .rev()
            .find(|f| f.cell == cell)
            .map(|f| f.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_table_counts() {
        let layout = TavernLayout::standard(false);
        let count = |kind| layout.tables.iter().filter(|t| t.kind == kind).count();
        assert_eq!(count(TableKind::Booth), 20);
        assert_eq!(count(TableKind::Round), 9);
        assert_eq!(count(TableKind::Long), 6);
        assert_eq!(count(TableKind::Lounge), 4);
    }

    #[test]
    fn test_booth_orientation_flips_for_bottom_wall() {
        let layout = TavernLayout::standard(false);
        assert_eq!(layout.furniture_at(Cell::new(2, 2)), Some(FurnitureKind::BoothTable));
        assert_eq!(layout.furniture_at(Cell::new(2, 3)), Some(FurnitureKind::Chair));
        assert_eq!(layout.furniture_at(Cell::new(2, 29)), Some(FurnitureKind::BoothTable));
        assert_eq!(layout.furniture_at(Cell::new(2, 28)), Some(FurnitureKind::Chair));
    }

    #[test]
    fn test_seasonal_tree_only_when_enabled() {
        assert!(!TavernLayout::standard(false)
            .obstacles()
            .any(|c| c == SEASONAL_TREE));
        assert!(TavernLayout::standard(true)
            .obstacles()
            .any(|c| c == SEASONAL_TREE));
    }

    #[test]
    fn test_bar_stools_are_not_seats_or_obstacles() {
        let layout = TavernLayout::standard(false);
        let stool = Cell::new(BAR_SERVICE_COLUMN, 14);
        assert_eq!(layout.furniture_at(stool), Some(FurnitureKind::BarStool));
        assert!(!layout.obstacles().any(|c| c == stool));
        assert!(!layout.tables.iter().any(|t| t.seat_cells.contains(&stool)));
    }

    #[test]
    fn test_cell_rect_contains_edges() {
        assert!(BAR_COUNTER.contains(Cell::new(43, 13)));
        assert!(BAR_COUNTER.contains(Cell::new(45, 19)));
        assert!(!BAR_COUNTER.contains(Cell::new(42, 13)));
        assert_eq!(BAR_COUNTER.cells().count(), 3 * 7);
    }
}
