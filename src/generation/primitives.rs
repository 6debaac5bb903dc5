//! Grid, tile and rectangle primitives shared by every generation stage.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_GRID_CELLS;
use crate::error::{GenerationError, Result};

/// Tile types that can appear in a dungeon grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    Empty,
    Floor,
    Wall,
    Obstacle,
    Player,
    Potion,
    DebugWall, // BSP split line marker
}

impl TileType {
    /// Tiles that wall stamping may freely overwrite
    pub fn is_replaceable(&self) -> bool {
        match self {
            Self::Empty | Self::Obstacle | Self::DebugWall => true,
            Self::Floor | Self::Wall | Self::Player | Self::Potion => false,
        }
    }

    /// Single character used by the CLI dump and test fixtures
    pub fn glyph(&self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Floor => '.',
            Self::Wall => '#',
            Self::Obstacle => 'o',
            Self::Player => '@',
            Self::Potion => '!',
            Self::DebugWall => '|',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            ' ' => Some(Self::Empty),
            '.' => Some(Self::Floor),
            '#' => Some(Self::Wall),
            'o' => Some(Self::Obstacle),
            '@' => Some(Self::Player),
            '!' => Some(Self::Potion),
            '|' => Some(Self::DebugWall),
            _ => None,
        }
    }
}

/// A 2D grid coordinate
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance, the move count for 8-directional movement
    pub fn chebyshev(&self, other: &Point) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fixed-size 2D grid of tiles stored row-major in a flat vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<TileType>,
}

/// Unchecked serde shape of a [`Grid`]; converted through `Grid::from_tiles`
#[derive(Deserialize)]
struct RawGrid {
    width: i32,
    height: i32,
    tiles: Vec<TileType>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = GenerationError;

    fn try_from(raw: RawGrid) -> Result<Self> {
        Grid::from_tiles(raw.width, raw.height, raw.tiles)
    }
}

/// Number of cells in a `width` x `height` grid, if the size is allowed
fn cell_count(width: i32, height: i32) -> Result<usize> {
    let (Ok(w), Ok(h)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(GenerationError::InvalidConfig(format!(
            "grid size {width}x{height} is negative"
        )));
    };
    w.checked_mul(h)
        .filter(|cells| *cells <= MAX_GRID_CELLS)
        .ok_or_else(|| {
            GenerationError::InvalidConfig(format!(
                "grid size {width}x{height} exceeds {MAX_GRID_CELLS} cells"
            ))
        })
}

impl Grid {
    /// Create a grid filled with `TileType::Empty`. Negative sizes are treated
    /// as zero.
    ///
    /// # Panics
    /// If the grid would exceed `MAX_GRID_CELLS`; use [`Grid::try_new`] for
    /// sizes that come from outside.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        match Self::try_new(width, height) {
            Ok(grid) => grid,
            Err(err) => panic!("{err}"),
        }
    }

    /// Create an empty grid, rejecting negative or oversized dimensions
    pub fn try_new(width: i32, height: i32) -> Result<Self> {
        let cells = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            tiles: vec![TileType::Empty; cells],
        })
    }

    /// Wrap an existing row-major tile buffer
    pub fn from_tiles(width: i32, height: i32, tiles: Vec<TileType>) -> Result<Self> {
        let expected = cell_count(width, height)?;
        if tiles.len() != expected {
            return Err(GenerationError::TileCount {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Parse rows of glyphs (see [`TileType::glyph`]). Every row must be the same length.
    pub fn from_ascii(rows: &[&str]) -> Result<Self> {
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(GenerationError::InvalidConfig(format!(
                    "row {y} has {} columns, expected {width}",
                    row.chars().count()
                )));
            }
            for glyph in row.chars() {
                let tile = TileType::from_glyph(glyph).ok_or_else(|| {
                    GenerationError::InvalidConfig(format!("unknown tile glyph {glyph:?}"))
                })?;
                tiles.push(tile);
            }
        }
        Self::from_tiles(width as i32, rows.len() as i32, tiles)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Dense row-major tile buffer
    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    pub fn contains(&self, pos: Point) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Convert a 2D position into an index into the flat buffer
    pub fn index_of(&self, pos: Point) -> Result<usize> {
        if !self.contains(pos) {
            return Err(GenerationError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.width as usize * pos.y as usize + pos.x as usize)
    }

    pub fn get(&self, pos: Point) -> Result<TileType> {
        Ok(self.tiles[self.index_of(pos)?])
    }

    pub fn set(&mut self, pos: Point, tile: TileType) -> Result<()> {
        let index = self.index_of(pos)?;
        self.tiles[index] = tile;
        Ok(())
    }

    /// All positions holding `target`, row by row
    pub fn positions_of(&self, target: TileType) -> Vec<Point> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| **tile == target)
            .map(|(i, _)| Point::new(i as i32 % self.width, i as i32 / self.width))
            .collect()
    }

    pub fn count(&self, target: TileType) -> usize {
        self.tiles.iter().filter(|tile| **tile == target).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 0 {
            return Ok(());
        }
        for row in self.tiles.chunks(self.width as usize) {
            let line: String = row.iter().map(TileType::glyph).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Axis-aligned rectangle with inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Rect {
    pub const fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    pub fn width(&self) -> i32 {
        (self.bottom_right.x - self.top_left.x).abs()
    }

    pub fn height(&self) -> i32 {
        (self.bottom_right.y - self.top_left.y).abs()
    }

    /// Midpoint of the two corners, halves rounded away from zero
    pub fn centre(&self) -> Point {
        let half = |a: i32, b: i32| (f64::from(a + b) / 2.0).round() as i32;
        Point::new(
            half(self.top_left.x, self.bottom_right.x),
            half(self.top_left.y, self.bottom_right.y),
        )
    }

    /// Chebyshev distance between the two centres
    pub fn distance_to(&self, other: &Rect) -> i32 {
        self.centre().chebyshev(&other.centre())
    }

    pub fn contains(&self, pos: Point) -> bool {
        pos.x >= self.top_left.x
            && pos.x <= self.bottom_right.x
            && pos.y >= self.top_left.y
            && pos.y <= self.bottom_right.y
    }

    /// Cells strictly inside the border
    pub fn interior(&self) -> impl Iterator<Item = Point> {
        let (x0, x1) = (self.top_left.x + 1, self.bottom_right.x);
        let (y0, y1) = (self.top_left.y + 1, self.bottom_right.y);
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| Point::new(x, y)))
    }

    /// Stamp this rect onto the grid.
    ///
    /// Walls go over every replaceable tile of the closed rect, then the
    /// interior becomes floor unconditionally (so walls of previously placed
    /// rects are carved through). The floor pass never touches the grid's
    /// outer ring. Anything outside the grid is clipped.
    pub fn place(&self, grid: &mut Grid) -> Result<()> {
        let (width, height) = (grid.width(), grid.height());

        for y in self.top_left.y.max(0)..(self.bottom_right.y + 1).min(height) {
            for x in self.top_left.x.max(0)..(self.bottom_right.x + 1).min(width) {
                let pos = Point::new(x, y);
                if grid.get(pos)?.is_replaceable() {
                    grid.set(pos, TileType::Wall)?;
                }
            }
        }

        for y in (self.top_left.y + 1).max(1)..self.bottom_right.y.min(height - 1) {
            for x in (self.top_left.x + 1).max(1)..self.bottom_right.x.min(width - 1) {
                grid.set(Point::new(x, y), TileType::Floor)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.top_left, self.bottom_right)
    }
}
