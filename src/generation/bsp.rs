//! Binary space partition used to lay out the dungeon's rooms.
//!
//! A [`Leaf`] owns a container rect. Splitting carves the container into two
//! children separated by a one cell gap (reserved for the wall between them)
//! and recurses until the children are too small. Rooms are then created in
//! the childless leaves only.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::primitives::{Grid, Point, Rect, TileType};
use crate::constants::{MAX_ROOM_MARGIN, MIN_CONTAINER_SIZE, MIN_ROOM_MARGIN, MIN_ROOM_SIZE};
use crate::error::{GenerationError, Result};

/// Size limits for splitting and room creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspConfig {
    /// Smallest extent a child container may have along the split axis
    pub min_container_size: i32,
    /// Smallest room extent (corner to corner) along either axis
    pub min_room_size: i32,
    /// Gap kept between a room and its container, per side
    pub min_room_margin: i32,
    pub max_room_margin: i32,
}

impl Default for BspConfig {
    fn default() -> Self {
        Self {
            min_container_size: MIN_CONTAINER_SIZE,
            min_room_size: MIN_ROOM_SIZE,
            min_room_margin: MIN_ROOM_MARGIN,
            max_room_margin: MAX_ROOM_MARGIN,
        }
    }
}

impl BspConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_container_size < 1 {
            return Err(GenerationError::InvalidConfig(format!(
                "min_container_size must be positive, got {}",
                self.min_container_size
            )));
        }
        if self.min_room_size < 0 || self.min_room_margin < 0 {
            return Err(GenerationError::InvalidConfig(
                "room size and margins must not be negative".into(),
            ));
        }
        if self.max_room_margin < self.min_room_margin {
            return Err(GenerationError::InvalidConfig(format!(
                "max_room_margin {} is below min_room_margin {}",
                self.max_room_margin, self.min_room_margin
            )));
        }
        // every container produced by a split must be able to hold a room
        if self.min_container_size < self.min_room_size + 2 * self.min_room_margin {
            return Err(GenerationError::InvalidConfig(format!(
                "min_container_size {} cannot fit min_room_size {} with margin {}",
                self.min_container_size, self.min_room_size, self.min_room_margin
            )));
        }
        Ok(())
    }
}

/// Which way a container was cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    /// Cut along a column, children sit side by side
    Vertical,
    /// Cut along a row, children sit on top of each other
    Horizontal,
}

/// A node of the BSP tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub container: Rect,
    pub left: Option<Box<Leaf>>,
    pub right: Option<Box<Leaf>>,
    pub room: Option<Rect>,
}

impl Leaf {
    pub fn new(container: Rect) -> Self {
        Self {
            container,
            left: None,
            right: None,
            room: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn is_split(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Split this leaf and, recursively, its new children.
    ///
    /// Returns whether this node was split. A node that already has both
    /// children is left alone; a node with a single child gets a fresh pair.
    pub fn split<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &BspConfig) -> bool {
        if self.is_split() {
            return false;
        }

        let axis = match self.container.width().cmp(&self.container.height()) {
            Ordering::Greater => SplitAxis::Vertical,
            Ordering::Less => SplitAxis::Horizontal,
            Ordering::Equal => {
                if rng.gen_bool(0.5) {
                    SplitAxis::Vertical
                } else {
                    SplitAxis::Horizontal
                }
            }
        };

        let span = match axis {
            SplitAxis::Vertical => self.container.width(),
            SplitAxis::Horizontal => self.container.height(),
        };
        let min = config.min_container_size;
        if span < 2 * min + 2 {
            return false;
        }

        let offset = rng.gen_range(min + 1..=span - min - 1);
        let Rect {
            top_left,
            bottom_right,
        } = self.container;
        let (left, right) = match axis {
            SplitAxis::Vertical => {
                let at = top_left.x + offset;
                (
                    Rect::new(top_left, Point::new(at - 1, bottom_right.y)),
                    Rect::new(Point::new(at + 1, top_left.y), bottom_right),
                )
            }
            SplitAxis::Horizontal => {
                let at = top_left.y + offset;
                (
                    Rect::new(top_left, Point::new(bottom_right.x, at - 1)),
                    Rect::new(Point::new(top_left.x, at + 1), bottom_right),
                )
            }
        };
        tracing::debug!(container = %self.container, ?axis, offset, "Split leaf");

        let mut left = Leaf::new(left);
        let mut right = Leaf::new(right);
        left.split(rng, config);
        right.split(rng, config);
        self.left = Some(Box::new(left));
        self.right = Some(Box::new(right));
        true
    }

    /// Create a room in every childless leaf of this subtree.
    ///
    /// Rooms are stamped onto `grid` and appended to `rooms` in depth-first,
    /// left-before-right order.
    pub fn create_room<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        config: &BspConfig,
        rooms: &mut Vec<Rect>,
    ) -> Result<()> {
        if config.min_room_margin < 0 || config.max_room_margin < config.min_room_margin {
            return Err(GenerationError::InvalidConfig(format!(
                "room margins must satisfy 0 <= min ({}) <= max ({})",
                config.min_room_margin, config.max_room_margin
            )));
        }
        if !self.is_leaf() {
            if let Some(left) = self.left.as_deref_mut() {
                left.create_room(grid, rng, config, rooms)?;
            }
            if let Some(right) = self.right.as_deref_mut() {
                right.create_room(grid, rng, config, rooms)?;
            }
            return Ok(());
        }

        let slack_x = self.room_slack(self.container.width(), config)?;
        let slack_y = self.room_slack(self.container.height(), config)?;
        let (x0, x1) = pick_margins(rng, slack_x, config);
        let (y0, y1) = pick_margins(rng, slack_y, config);

        let Rect {
            top_left,
            bottom_right,
        } = self.container;
        let room = Rect::new(
            Point::new(top_left.x + x0, top_left.y + y0),
            Point::new(bottom_right.x - x1, bottom_right.y - y1),
        );
        room.place(grid)?;
        tracing::debug!(container = %self.container, %room, "Created room");

        self.room = Some(room);
        rooms.push(room);
        Ok(())
    }

    fn room_slack(&self, span: i32, config: &BspConfig) -> Result<i32> {
        let slack = span - config.min_room_size - 2 * config.min_room_margin;
        if slack < 0 {
            return Err(GenerationError::ContainerTooSmall {
                container: self.container,
                min_room_size: config.min_room_size,
            });
        }
        Ok(slack)
    }

    /// Childless leaves, depth first, left before right
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        if self.is_leaf() {
            out.push(self);
            return;
        }
        for child in [&self.left, &self.right].into_iter().flatten() {
            child.collect_leaves(out);
        }
    }

    pub fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |l| l.depth());
        let right = self.right.as_ref().map_or(0, |r| r.depth());
        1 + left.max(right)
    }

    /// Mark every split gap in this subtree with `TileType::DebugWall`.
    ///
    /// Only `Empty` cells are touched, so this must run before rooms are
    /// stamped to be visible.
    pub fn mark_split_lines(&self, grid: &mut Grid) -> Result<()> {
        let (Some(left), Some(right)) = (&self.left, &self.right) else {
            return Ok(());
        };

        let gap = if left.container.bottom_right.x < right.container.top_left.x {
            // vertical split: one column between the children
            let x = left.container.bottom_right.x + 1;
            Rect::new(
                Point::new(x, self.container.top_left.y),
                Point::new(x, self.container.bottom_right.y),
            )
        } else {
            let y = left.container.bottom_right.y + 1;
            Rect::new(
                Point::new(self.container.top_left.x, y),
                Point::new(self.container.bottom_right.x, y),
            )
        };

        for y in gap.top_left.y..=gap.bottom_right.y {
            for x in gap.top_left.x..=gap.bottom_right.x {
                let pos = Point::new(x, y);
                if grid.contains(pos) && grid.get(pos)? == TileType::Empty {
                    grid.set(pos, TileType::DebugWall)?;
                }
            }
        }

        left.mark_split_lines(grid)?;
        right.mark_split_lines(grid)
    }
}

/// Leading and trailing margin for one axis, given the slack left over after
/// the minimum room size and minimum margins are taken out.
fn pick_margins<R: Rng + ?Sized>(rng: &mut R, slack: i32, config: &BspConfig) -> (i32, i32) {
    let extra = config.max_room_margin - config.min_room_margin;
    let lead = rng.gen_range(0..=slack.min(extra));
    let trail = rng.gen_range(0..=(slack - lead).min(extra));
    (
        config.min_room_margin + lead,
        config.min_room_margin + trail,
    )
}
