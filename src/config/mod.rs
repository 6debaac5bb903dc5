//! Generation configuration.
//!
//! Everything a run needs besides the seed defaults from the level through
//! [`crate::constants`]; explicit fields override the level-derived values.
//! Configs load from JSON or RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{HALLWAY_SIZE, HEIGHT, ITEM_COUNT, MAX_GRID_CELLS, OBSTACLE_COUNT, WIDTH};
use crate::error::{GenerationError, Result};
use crate::generation::bsp::BspConfig;
use crate::generation::hallways::PolicyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Dungeon depth, starting at 0. Drives the level-scaled defaults.
    pub level: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Fixed seed for reproducible runs; drawn at random when absent
    pub seed: Option<u64>,
    pub bsp: BspConfig,
    pub hallway_size: i32,
    pub obstacle_count: Option<i32>,
    pub item_count: Option<i32>,
    pub connection: PolicyKind,
    /// Mark BSP split lines with `DebugWall` tiles
    pub debug_split_walls: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            level: 0,
            width: None,
            height: None,
            seed: None,
            bsp: BspConfig::default(),
            hallway_size: HALLWAY_SIZE,
            obstacle_count: None,
            item_count: None,
            connection: PolicyKind::default(),
            debug_split_walls: false,
        }
    }
}

impl GenerationConfig {
    pub fn for_level(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn map_width(&self) -> i32 {
        self.width.unwrap_or_else(|| WIDTH.value_for_level(self.level))
    }

    pub fn map_height(&self) -> i32 {
        self.height
            .unwrap_or_else(|| HEIGHT.value_for_level(self.level))
    }

    pub fn map_obstacle_count(&self) -> usize {
        let count = self
            .obstacle_count
            .unwrap_or_else(|| OBSTACLE_COUNT.value_for_level(self.level));
        usize::try_from(count).unwrap_or(0)
    }

    pub fn map_item_count(&self) -> usize {
        let count = self
            .item_count
            .unwrap_or_else(|| ITEM_COUNT.value_for_level(self.level));
        usize::try_from(count).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.level < 0 {
            return Err(GenerationError::InvalidConfig(format!(
                "level must not be negative, got {}",
                self.level
            )));
        }

        let (width, height) = (self.map_width(), self.map_height());
        if width < 0 || height < 0 {
            return Err(GenerationError::InvalidConfig(format!(
                "map size must not be negative, got {width}x{height}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(GenerationError::EmptyGrid);
        }
        if i64::from(width) * i64::from(height) > MAX_GRID_CELLS as i64 {
            return Err(GenerationError::InvalidConfig(format!(
                "map size {width}x{height} exceeds {MAX_GRID_CELLS} cells"
            )));
        }

        if self.hallway_size < 1 {
            return Err(GenerationError::InvalidConfig(format!(
                "hallway_size must be at least 1, got {}",
                self.hallway_size
            )));
        }
        for (name, count) in [
            ("obstacle_count", self.obstacle_count),
            ("item_count", self.item_count),
        ] {
            if let Some(count) = count.filter(|c| *c < 0) {
                return Err(GenerationError::InvalidConfig(format!(
                    "{name} must not be negative, got {count}"
                )));
            }
        }

        if let PolicyKind::LoopedSpanningTree(looped) = &self.connection {
            if looped.max_cost_ratio.is_nan() || looped.max_cost_ratio < 0.0 {
                return Err(GenerationError::InvalidConfig(
                    "max_cost_ratio must not be negative".into(),
                ));
            }
            if !(0.0..=1.0).contains(&looped.extra_fraction) {
                return Err(GenerationError::InvalidConfig(
                    "extra_fraction must be within 0..=1".into(),
                ));
            }
        }

        self.bsp.validate()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load from a `.json` or `.ron` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("ron") => Self::from_ron(&content),
            _ => Err(GenerationError::InvalidConfig(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Write as JSON or RON depending on the file extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.to_json()?,
            Some("ron") => self.to_ron()?,
            _ => {
                return Err(GenerationError::InvalidConfig(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}
