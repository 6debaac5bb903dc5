//! Centralized generation constants for the dungeon procedural core.
//!
//! Defaults for every tunable in [`crate::config::GenerationConfig`] live
//! here so the config, the CLI and the tests agree on them.

use serde::{Deserialize, Serialize};

// =====================================================
// BSP
// =====================================================

/// Smallest extent of a BSP container along its split axis.
/// Must leave room for MIN_ROOM_SIZE plus both room margins.
pub const MIN_CONTAINER_SIZE: i32 = 5;

/// Smallest room extent, corner to corner
pub const MIN_ROOM_SIZE: i32 = 4;

/// Room margin bounds inside a container, per side
pub const MIN_ROOM_MARGIN: i32 = 0;
pub const MAX_ROOM_MARGIN: i32 = 3;

// =====================================================
// Grid
// =====================================================

/// Largest grid accepted from configs or serialized maps, in cells.
/// Keeps every flat index and coordinate inside `i32`.
pub const MAX_GRID_CELLS: usize = 1 << 24;

// =====================================================
// Hallways & placement
// =====================================================

/// Side length of the square stamped around every hallway path cell
pub const HALLWAY_SIZE: i32 = 5;

/// Hallway policy: extra connections may cost up to this multiple of the
/// most expensive spanning tree connection
pub const EXTRA_MAXIMUM_PERCENTAGE: f64 = 1.5;

/// Hallway policy: share of the candidate extra connections that are kept
pub const REMOVED_CONNECTION_LIMIT: f64 = 0.2;

// =====================================================
// Level scaling
// =====================================================

/// A value that grows exponentially with the level and saturates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapGenerationConstant {
    pub base_value: f64,
    /// Multiplier applied once per level
    pub increase: f64,
    pub max_value: f64,
}

impl MapGenerationConstant {
    pub const fn new(base_value: f64, increase: f64, max_value: f64) -> Self {
        Self {
            base_value,
            increase,
            max_value,
        }
    }

    /// min(round(base * increase^level), max)
    pub fn value_for_level(&self, level: i32) -> i32 {
        (self.base_value * self.increase.powi(level))
            .round()
            .min(self.max_value) as i32
    }
}

pub const WIDTH: MapGenerationConstant = MapGenerationConstant::new(30.0, 1.2, 150.0);
pub const HEIGHT: MapGenerationConstant = MapGenerationConstant::new(20.0, 1.2, 100.0);
pub const OBSTACLE_COUNT: MapGenerationConstant = MapGenerationConstant::new(20.0, 1.3, 200.0);
pub const ITEM_COUNT: MapGenerationConstant = MapGenerationConstant::new(5.0, 1.1, 30.0);
