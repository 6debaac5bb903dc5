//! Error type shared by every generation stage.

use crate::generation::primitives::Rect;

/// Failures that stop a generation run or a grid access.
///
/// An unreachable pathfinding target is *not* an error: the pathfinder
/// returns an empty path for it.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Grid size must be bigger than 0")]
    EmptyGrid,

    #[error("Position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("Container {container} is too small for a room of size {min_room_size}")]
    ContainerTooSmall { container: Rect, min_room_size: i32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rooms size must be bigger than 0")]
    NoRooms,

    #[error("Expected {expected} tiles, got {actual}")]
    TileCount { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
