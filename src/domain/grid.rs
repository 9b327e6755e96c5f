// Integer grid primitives and arena layout parsing.

use std::collections::HashSet;
use std::fmt;

/// Integer grid coordinate on the arena floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Rounds a continuous floor position to the cell that contains it.
    pub fn from_position(x: f32, z: f32) -> Self {
        Self {
            x: x.round() as i32,
            z: z.round() as i32,
        }
    }

    pub fn step(self, direction: Direction, distance: i32) -> Self {
        let (dx, dz) = direction.offset();
        Self {
            x: self.x + dx * distance,
            z: self.z + dz * distance,
        }
    }

    pub fn distance(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    /// Center of the cell in floor coordinates.
    pub fn center(self) -> (f32, f32) {
        (self.x as f32, self.z as f32)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Cardinal directions on the arena floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Right,
    Back,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Right,
        Direction::Back,
        Direction::Left,
    ];

    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Forward => (0, 1),
            Direction::Right => (1, 0),
            Direction::Back => (0, -1),
            Direction::Left => (-1, 0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Back,
            Direction::Right => Direction::Left,
            Direction::Back => Direction::Forward,
            Direction::Left => Direction::Right,
        }
    }

    /// Direction of a single-axis step; the `x` component wins when both are non-zero.
    pub fn of_step(dx: f32, dz: f32) -> Direction {
        if dx != 0.0 {
            if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dz > 0.0 {
            Direction::Forward
        } else {
            Direction::Back
        }
    }
}

/// Errors raised while parsing an arena layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    Empty,
    RaggedRow { row: usize, expected: usize, found: usize },
    UnknownTile { row: usize, col: usize, tile: char },
    NoSpawnPoints,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "layout has no rows"),
            LayoutError::RaggedRow {
                row,
                expected,
                found,
            } => write!(f, "row {row} has width {found}, expected {expected}"),
            LayoutError::UnknownTile { row, col, tile } => {
                write!(f, "unknown tile {tile:?} at row {row}, column {col}")
            }
            LayoutError::NoSpawnPoints => write!(f, "layout has no spawn points"),
        }
    }
}

/// Static arena description: walls never change, bricks are the initial set.
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    pub width: i32,
    pub height: i32,
    walls: HashSet<Cell>,
    pub bricks: Vec<Cell>,
    pub spawn_points: Vec<Cell>,
}

/// Classic 15x13 arena with border walls, pillars and five spawn points.
pub const DEFAULT_LAYOUT: &[&str] = &[
    "###############",
    "#S.+++++++++.S#",
    "#.#+#+#+#+#+#.#",
    "#+++++++++++++#",
    "#+#+#+#+#+#+#+#",
    "#+++++.S.+++++#",
    "#+#+#+#.#+#+#+#",
    "#+++++++++++++#",
    "#+#+#+#+#+#+#+#",
    "#+++++++++++++#",
    "#.#+#+#+#+#+#.#",
    "#S.+++++++++.S#",
    "###############",
];

impl ArenaLayout {
    /// Parses ASCII rows: `#` wall, `+` brick, `S` spawn, `.` floor.
    ///
    /// Row index maps to `z`, column index to `x`.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, LayoutError> {
        let Some(first) = rows.first() else {
            return Err(LayoutError::Empty);
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(LayoutError::Empty);
        }

        let mut walls = HashSet::new();
        let mut bricks = Vec::new();
        let mut spawn_points = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, tile) in line.chars().enumerate() {
                let cell = Cell::new(col as i32, row as i32);
                match tile {
                    '#' => {
                        walls.insert(cell);
                    }
                    '+' => bricks.push(cell),
                    'S' => spawn_points.push(cell),
                    '.' => {}
                    _ => return Err(LayoutError::UnknownTile { row, col, tile }),
                }
            }
        }

        if spawn_points.is_empty() {
            return Err(LayoutError::NoSpawnPoints);
        }

        Ok(Self {
            width: width as i32,
            height: rows.len() as i32,
            walls,
            bricks,
            spawn_points,
        })
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && cell.x < self.width && cell.z < self.height
    }

    /// Walls are static; everything outside the arena counts as wall.
    pub fn is_wall(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.walls.contains(&cell)
    }

    /// Wall cells in row-major order.
    pub fn walls(&self) -> Vec<Cell> {
        let mut walls: Vec<Cell> = self.walls.iter().copied().collect();
        walls.sort_by_key(|c| (c.z, c.x));
        walls
    }
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self::parse(DEFAULT_LAYOUT).expect("default layout should parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_has_border_walls_and_spawns() {
        let layout = ArenaLayout::default();
        assert_eq!(layout.width, 15);
        assert_eq!(layout.height, 13);
        assert_eq!(layout.spawn_points.len(), 5);
        assert!(layout.is_wall(Cell::new(0, 0)));
        assert!(layout.is_wall(Cell::new(2, 2)));
        assert!(!layout.is_wall(Cell::new(1, 1)));
        assert!(layout.is_wall(Cell::new(-1, 4)));
        assert!(layout.is_wall(Cell::new(15, 4)));
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = ArenaLayout::parse(&["###", "#S"]).unwrap_err();
        assert_eq!(
            err,
            LayoutError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_tiles_and_missing_spawns() {
        assert_eq!(
            ArenaLayout::parse(&["#x#"]).unwrap_err(),
            LayoutError::UnknownTile {
                row: 0,
                col: 1,
                tile: 'x'
            }
        );
        assert_eq!(
            ArenaLayout::parse(&["#.#"]).unwrap_err(),
            LayoutError::NoSpawnPoints
        );
    }

    #[test]
    fn position_rounds_to_nearest_cell() {
        assert_eq!(Cell::from_position(2.4, 3.6), Cell::new(2, 4));
        assert_eq!(Cell::from_position(-0.4, 0.0), Cell::new(0, 0));
    }

    #[test]
    fn step_direction_follows_the_moving_axis() {
        assert_eq!(Direction::of_step(0.05, 0.0), Direction::Right);
        assert_eq!(Direction::of_step(-0.05, 0.0), Direction::Left);
        assert_eq!(Direction::of_step(0.0, 0.05), Direction::Forward);
        assert_eq!(Direction::of_step(0.0, -0.05), Direction::Back);
    }
}
