//! Procedural dungeon generation.
//!
//! One run goes: BSP split of the whole grid, a room per leaf, scattered
//! obstacles, hallways between the rooms picked by a [`ConnectionPolicy`],
//! then the player and potions dropped on free floor.

pub mod astar;
pub mod bsp;
pub mod hallways;
pub mod primitives;

use std::collections::BTreeSet;
use std::ops::Range;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::logging::TimingSpan;

pub use astar::calculate_astar_path;
pub use bsp::{BspConfig, Leaf, SplitAxis};
pub use hallways::{
    create_hallways, Connection, ConnectionPolicy, LoopedSpanningTree, MinimumSpanningTree,
    NearestNeighbour, PolicyKind,
};
pub use primitives::{Grid, Point, Rect, TileType};

/// Root seed for a run of levels. Each level gets its own seed hashed from
/// this one, so any level can be regenerated alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonSeed {
    pub seed: u64,
}

impl Default for DungeonSeed {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl DungeonSeed {
    /// Deterministic per-level seed from the root seed and level
    pub fn level_hash(&self, level: i32) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(level.to_le_bytes());
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// A generated level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonMap {
    pub level: i32,
    /// Seed the run actually used, drawn or configured
    pub seed: u64,
    pub grid: Grid,
    pub rooms: Vec<Rect>,
    /// Hallway path cells, the centre line of every corridor
    pub hallways: BTreeSet<Point>,
    /// Absent only when the map has no floor at all
    pub player: Option<Point>,
    pub items: Vec<Point>,
}

impl DungeonMap {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Generate one level from `config`.
///
/// # Errors
/// Invalid configs fail before anything is generated; a root container too
/// small for a room fails with `ContainerTooSmall`.
pub fn create_map(config: &GenerationConfig) -> Result<DungeonMap> {
    config.validate()?;
    let _timing = TimingSpan::new("create_map");

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let (width, height) = (config.map_width(), config.map_height());
    let mut grid = Grid::try_new(width, height)?;

    let mut root = Leaf::new(Rect::new(
        Point::new(0, 0),
        Point::new(width - 1, height - 1),
    ));
    root.split(&mut rng, &config.bsp);
    if config.debug_split_walls {
        root.mark_split_lines(&mut grid)?;
    }

    let mut rooms = Vec::new();
    root.create_room(&mut grid, &mut rng, &config.bsp, &mut rooms)?;

    let obstacles = place_tiles(
        &mut grid,
        &mut rng,
        TileType::Empty,
        TileType::Obstacle,
        config.map_obstacle_count(),
    )?;

    let connections = config.connection.policy().connect(&rooms)?;
    let hallways = create_hallways(&mut grid, &connections, config.hallway_size)?;

    let player = place_tiles(&mut grid, &mut rng, TileType::Floor, TileType::Player, 1)?
        .first()
        .copied();
    let items = place_tiles(
        &mut grid,
        &mut rng,
        TileType::Floor,
        TileType::Potion,
        config.map_item_count(),
    )?;

    tracing::info!(
        level = config.level,
        seed,
        width,
        height,
        depth = root.depth(),
        rooms = rooms.len(),
        connections = connections.len(),
        obstacles = obstacles.len(),
        items = items.len(),
        "Generated dungeon level"
    );

    Ok(DungeonMap {
        level: config.level,
        seed,
        grid,
        rooms,
        hallways,
        player,
        items,
    })
}

/// Generate `levels` in parallel, each seeded from `seed.level_hash(level)`
/// with the level's default config.
pub fn generate_levels(seed: &DungeonSeed, levels: Range<i32>) -> Result<Vec<DungeonMap>> {
    levels
        .into_par_iter()
        .map(|level| create_map(&GenerationConfig::for_level(level).with_seed(seed.level_hash(level))))
        .collect()
}

/// Turn up to `count` distinct random `on` tiles into `tile`
fn place_tiles<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    on: TileType,
    tile: TileType,
    count: usize,
) -> Result<Vec<Point>> {
    let chosen: Vec<Point> = grid
        .positions_of(on)
        .choose_multiple(rng, count)
        .copied()
        .collect();
    for &pos in &chosen {
        grid.set(pos, tile)?;
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;

    fn seeded(seed: u64) -> GenerationConfig {
        GenerationConfig::default().with_seed(seed)
    }

    #[test]
    fn test_level_hash_deterministic() {
        let seed = DungeonSeed { seed: 12345 };
        assert_eq!(seed.level_hash(1), seed.level_hash(1));
        assert_ne!(seed.level_hash(1), seed.level_hash(2));
        assert_ne!(
            seed.level_hash(1),
            DungeonSeed { seed: 54321 }.level_hash(1)
        );
    }

    #[test]
    fn test_same_seed_same_map() {
        let a = create_map(&seeded(7)).unwrap();
        let b = create_map(&seeded(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 7);
    }

    #[test]
    fn test_unseeded_run_records_seed() {
        let map = create_map(&GenerationConfig::default()).unwrap();
        let replay = create_map(&seeded(map.seed)).unwrap();
        assert_eq!(map.grid, replay.grid);
    }

    #[test]
    fn test_map_layout_invariants() {
        let map = create_map(&seeded(2024)).unwrap();
        assert_eq!((map.grid.width(), map.grid.height()), (30, 20));
        assert!(!map.rooms.is_empty());

        for room in &map.rooms {
            assert!(map.grid.contains(room.top_left));
            assert!(map.grid.contains(room.bottom_right));
        }
        // hallway cells may since have become the player or a potion
        for pos in &map.hallways {
            let tile = map.grid.get(*pos).unwrap();
            assert!(matches!(
                tile,
                TileType::Floor | TileType::Player | TileType::Potion
            ));
        }
        let (width, height) = (map.grid.width(), map.grid.height());
        for x in 0..width {
            for y in [0, height - 1] {
                assert_ne!(map.grid.get(Point::new(x, y)).unwrap(), TileType::Floor);
            }
        }
        for y in 0..height {
            for x in [0, width - 1] {
                assert_ne!(map.grid.get(Point::new(x, y)).unwrap(), TileType::Floor);
            }
        }
    }

    #[test]
    fn test_placements() {
        let map = create_map(&seeded(11)).unwrap();
        let player = map.player.unwrap();
        assert_eq!(map.grid.get(player).unwrap(), TileType::Player);
        assert_eq!(map.grid.count(TileType::Player), 1);
        assert_eq!(map.items.len(), 5);
        assert_eq!(map.grid.count(TileType::Potion), 5);
        assert!(!map.items.contains(&player));
    }

    #[test]
    fn test_obstacles_never_on_hallways() {
        let map = create_map(&seeded(3)).unwrap();
        for pos in map.grid.positions_of(TileType::Obstacle) {
            assert!(!map.hallways.contains(&pos));
        }
    }

    #[test]
    fn test_debug_split_walls() {
        let config = GenerationConfig {
            debug_split_walls: true,
            obstacle_count: Some(0),
            ..seeded(5)
        };
        let map = create_map(&config).unwrap();
        let plain = create_map(&GenerationConfig {
            obstacle_count: Some(0),
            ..seeded(5)
        })
        .unwrap();
        assert_eq!(plain.grid.count(TileType::DebugWall), 0);
        assert_eq!(map.rooms, plain.rooms);
        assert!(map.grid.count(TileType::DebugWall) > 0);

        // the split is the first use of the run's rng, so the tree can be rebuilt
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut root = Leaf::new(Rect::new(Point::new(0, 0), Point::new(29, 19)));
        root.split(&mut rng, &config.bsp);
        let mut gaps = Grid::new(30, 20);
        root.mark_split_lines(&mut gaps).unwrap();
        for pos in map.grid.positions_of(TileType::DebugWall) {
            assert_eq!(gaps.get(pos).unwrap(), TileType::DebugWall, "{pos} is off the split lines");
        }
    }

    #[test]
    fn test_too_small_map_fails() {
        let config = GenerationConfig {
            width: Some(3),
            height: Some(3),
            ..seeded(1)
        };
        assert!(matches!(
            create_map(&config),
            Err(GenerationError::ContainerTooSmall { .. })
        ));
    }

    #[test]
    fn test_negative_level_fails() {
        assert!(matches!(
            create_map(&GenerationConfig::for_level(-2)),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_generate_levels_parallel() {
        let seed = DungeonSeed::default();
        let maps = generate_levels(&seed, 0..4).unwrap();
        assert_eq!(maps.len(), 4);
        for (level, map) in (0..4).zip(&maps) {
            assert_eq!(map.level, level);
            assert_eq!(map.seed, seed.level_hash(level));
        }
        assert!(maps[1].grid.width() > maps[0].grid.width());

        let again = generate_levels(&seed, 2..3).unwrap();
        assert_eq!(again[0], maps[2]);
    }

    #[test]
    fn test_map_json_roundtrip() {
        let map = create_map(&seeded(8)).unwrap();
        let restored = DungeonMap::from_json(&map.to_json().unwrap()).unwrap();
        assert_eq!(restored, map);
    }
}
