//! Dungeon Procedural Core Library
//!
//! Deterministic generation of grid dungeons:
//! - Grid, point and rectangle primitives
//! - Binary space partitioning into rooms
//! - A* pathfinding over the tile grid
//! - Hallway connection with pluggable pairing policies
//! - Level-scaled generation with seeded, reproducible runs

pub mod config;
pub mod constants;
pub mod error;
pub mod generation;
pub mod logging;

pub use config::GenerationConfig;
pub use error::{GenerationError, Result};
pub use generation::{
    calculate_astar_path, create_map, generate_levels, DungeonMap, DungeonSeed, Grid, Leaf, Point,
    Rect, TileType,
};
