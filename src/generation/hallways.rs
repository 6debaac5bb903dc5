//! Hallway connection between rooms.
//!
//! A [`ConnectionPolicy`] decides which room pairs get joined; every chosen
//! pair is then pathfound centre to centre with A* and the path is carved
//! into the grid.

use std::collections::{BTreeSet, HashSet};

use petgraph::algo::min_spanning_tree;
use petgraph::data::Element;
use petgraph::graph::UnGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::astar::calculate_astar_path;
use super::primitives::{Grid, Point, Rect, TileType};
use crate::constants::{EXTRA_MAXIMUM_PERCENTAGE, REMOVED_CONNECTION_LIMIT};
use crate::error::{GenerationError, Result};

/// An undirected, weighted pair of rooms to join with a hallway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Chebyshev distance between the two room centres
    pub cost: i32,
    pub source: Rect,
    pub destination: Rect,
}

impl Connection {
    pub fn new(source: Rect, destination: Rect) -> Self {
        Self {
            cost: source.distance_to(&destination),
            source,
            destination,
        }
    }
}

/// Decides which rooms get connected
pub trait ConnectionPolicy {
    /// Pairs to connect. Fails with `NoRooms` on an empty slice; a single
    /// room yields no pairs.
    fn connect(&self, rooms: &[Rect]) -> Result<Vec<Connection>>;
}

/// Minimum spanning tree over the complete room graph: every room is
/// reachable with the least total hallway length
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumSpanningTree;

impl ConnectionPolicy for MinimumSpanningTree {
    fn connect(&self, rooms: &[Rect]) -> Result<Vec<Connection>> {
        Ok(spanning_tree_indices(rooms)?
            .into_iter()
            .map(|(a, b)| Connection::new(rooms[a], rooms[b]))
            .collect())
    }
}

/// Each room joins its closest neighbour. Cheap, but clusters of rooms can
/// end up disconnected from each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighbour;

impl ConnectionPolicy for NearestNeighbour {
    fn connect(&self, rooms: &[Rect]) -> Result<Vec<Connection>> {
        if rooms.is_empty() {
            return Err(GenerationError::NoRooms);
        }

        let mut seen = HashSet::new();
        let mut connections = Vec::new();
        for (i, room) in rooms.iter().enumerate() {
            let nearest = rooms
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .min_by_key(|(_, other)| room.distance_to(other));
            if let Some((j, other)) = nearest {
                if seen.insert((i.min(j), i.max(j))) {
                    connections.push(Connection::new(*room, *other));
                }
            }
        }
        Ok(connections)
    }
}

/// Spanning tree plus a share of the cheaper non-tree pairs, so the dungeon
/// has some loops instead of being a pure tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopedSpanningTree {
    /// Extra pairs must cost less than this multiple of the dearest tree pair
    pub max_cost_ratio: f64,
    /// Share of the qualifying extra pairs to keep, cheapest first
    pub extra_fraction: f64,
}

impl Default for LoopedSpanningTree {
    fn default() -> Self {
        Self {
            max_cost_ratio: EXTRA_MAXIMUM_PERCENTAGE,
            extra_fraction: REMOVED_CONNECTION_LIMIT,
        }
    }
}

impl ConnectionPolicy for LoopedSpanningTree {
    fn connect(&self, rooms: &[Rect]) -> Result<Vec<Connection>> {
        let tree = spanning_tree_indices(rooms)?;
        let mut connections: Vec<Connection> = tree
            .iter()
            .map(|&(a, b)| Connection::new(rooms[a], rooms[b]))
            .collect();
        let Some(dearest) = connections.iter().map(|c| c.cost).max() else {
            return Ok(connections);
        };
        let max_cost = f64::from(dearest) * self.max_cost_ratio;

        let in_tree: HashSet<(usize, usize)> = tree.into_iter().collect();
        let mut candidates: Vec<(i32, usize, usize)> = Vec::new();
        for a in 0..rooms.len() {
            for b in a + 1..rooms.len() {
                let cost = rooms[a].distance_to(&rooms[b]);
                if !in_tree.contains(&(a, b)) && f64::from(cost) < max_cost {
                    candidates.push((cost, a, b));
                }
            }
        }
        candidates.sort_unstable();

        let keep = (candidates.len() as f64 * self.extra_fraction).round() as usize;
        connections.extend(
            candidates
                .into_iter()
                .take(keep)
                .map(|(_, a, b)| Connection::new(rooms[a], rooms[b])),
        );
        Ok(connections)
    }
}

/// Serializable choice of policy for configs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PolicyKind {
    #[default]
    MinimumSpanningTree,
    NearestNeighbour,
    LoopedSpanningTree(LoopedSpanningTree),
}

impl PolicyKind {
    pub fn policy(&self) -> Box<dyn ConnectionPolicy> {
        match self {
            Self::MinimumSpanningTree => Box::new(MinimumSpanningTree),
            Self::NearestNeighbour => Box::new(NearestNeighbour),
            Self::LoopedSpanningTree(looped) => Box::new(*looped),
        }
    }
}

/// Index pairs `(low, high)` of the minimum spanning tree over all rooms,
/// weighted by centre distance
fn spanning_tree_indices(rooms: &[Rect]) -> Result<Vec<(usize, usize)>> {
    if rooms.is_empty() {
        return Err(GenerationError::NoRooms);
    }

    let mut graph = UnGraph::<Rect, i32>::with_capacity(rooms.len(), rooms.len() * rooms.len() / 2);
    let nodes: Vec<_> = rooms.iter().map(|room| graph.add_node(*room)).collect();
    for (a, room) in rooms.iter().enumerate() {
        for (b, other) in rooms.iter().enumerate().skip(a + 1) {
            graph.add_edge(nodes[a], nodes[b], room.distance_to(other));
        }
    }

    Ok(min_spanning_tree(&graph)
        .filter_map(|element| match element {
            Element::Edge { source, target, .. } => Some((source.min(target), source.max(target))),
            Element::Node { .. } => None,
        })
        .collect())
}

/// Carve a hallway for every connection and return the path cells.
///
/// All paths are computed against the grid as it is before any carving.
/// Each path cell gets a `hallway_size` square stamped around it (walls on
/// replaceable tiles, floor inside) and is itself set to floor. Pairs with no
/// path are skipped.
pub fn create_hallways(
    grid: &mut Grid,
    connections: &[Connection],
    hallway_size: i32,
) -> Result<BTreeSet<Point>> {
    let paths = {
        let grid: &Grid = grid;
        connections
            .par_iter()
            .map(|c| calculate_astar_path(grid, c.source.centre(), c.destination.centre()))
            .collect::<Result<Vec<_>>>()?
    };

    let half = hallway_size / 2;
    let mut hallway = BTreeSet::new();
    for (connection, path) in connections.iter().zip(&paths) {
        if path.is_empty() {
            tracing::warn!(
                source = %connection.source,
                destination = %connection.destination,
                "No path between rooms, hallway skipped"
            );
            continue;
        }
        tracing::debug!(cost = connection.cost, cells = path.len(), "Carving hallway");

        for &pos in path {
            Rect::new(
                Point::new(pos.x - half, pos.y - half),
                Point::new(pos.x + half, pos.y + half),
            )
            .place(grid)?;
            grid.set(pos, TileType::Floor)?;
            hallway.insert(pos);
        }
    }
    Ok(hallway)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// Three rooms in a row plus one far away
    fn rooms() -> Vec<Rect> {
        vec![
            rect(1, 1, 5, 5),
            rect(8, 1, 12, 5),
            rect(15, 1, 19, 5),
            rect(1, 20, 5, 24),
        ]
    }

    /// Union-find check that the connections reach every room
    fn is_connected(rooms: &[Rect], connections: &[Connection]) -> bool {
        let mut parent: Vec<usize> = (0..rooms.len()).collect();
        fn find(parent: &mut [usize], i: usize) -> usize {
            if parent[i] != i {
                parent[i] = find(parent, parent[i]);
            }
            parent[i]
        }
        for c in connections {
            let a = rooms.iter().position(|r| *r == c.source).unwrap();
            let b = rooms.iter().position(|r| *r == c.destination).unwrap();
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            parent[ra] = rb;
        }
        let root = find(&mut parent, 0);
        (0..rooms.len()).all(|i| find(&mut parent, i) == root)
    }

    #[test]
    fn test_connection_cost() {
        let c = Connection::new(rect(1, 1, 5, 5), rect(8, 1, 12, 5));
        assert_eq!(c.cost, 7);
    }

    #[test]
    fn test_spanning_tree_connects_everything() {
        let rooms = rooms();
        let connections = MinimumSpanningTree.connect(&rooms).unwrap();
        assert_eq!(connections.len(), rooms.len() - 1);
        assert!(is_connected(&rooms, &connections));
        // 7 + 7 along the row, 19 down to the far room
        assert_eq!(connections.iter().map(|c| c.cost).sum::<i32>(), 33);
    }

    #[test]
    fn test_policies_reject_no_rooms() {
        assert!(matches!(
            MinimumSpanningTree.connect(&[]),
            Err(GenerationError::NoRooms)
        ));
        assert!(matches!(
            NearestNeighbour.connect(&[]),
            Err(GenerationError::NoRooms)
        ));
        assert!(matches!(
            LoopedSpanningTree::default().connect(&[]),
            Err(GenerationError::NoRooms)
        ));
    }

    #[test]
    fn test_single_room_needs_no_hallways() {
        let single = [rect(1, 1, 5, 5)];
        assert!(MinimumSpanningTree.connect(&single).unwrap().is_empty());
        assert!(NearestNeighbour.connect(&single).unwrap().is_empty());
        assert!(LoopedSpanningTree::default()
            .connect(&single)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_nearest_neighbour_dedupes_pairs() {
        let rooms = rooms();
        let connections = NearestNeighbour.connect(&rooms).unwrap();
        // 0<->1 is mutual, 2->1 and 3->0 are one-way
        assert_eq!(connections.len(), 3);
        let mut pairs: Vec<(Rect, Rect)> = connections
            .iter()
            .map(|c| (c.source, c.destination))
            .collect();
        pairs.dedup();
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_looped_tree_adds_cheap_extras() {
        let rooms = vec![
            rect(1, 1, 5, 5),
            rect(8, 1, 12, 5),
            rect(1, 8, 5, 12),
            rect(8, 8, 12, 12),
        ];
        let tree = MinimumSpanningTree.connect(&rooms).unwrap();
        let looped = LoopedSpanningTree {
            max_cost_ratio: 1.5,
            extra_fraction: 1.0,
        }
        .connect(&rooms)
        .unwrap();

        // square of rooms: every side and diagonal costs 7, so all 6 pairs qualify
        assert_eq!(tree.len(), 3);
        assert_eq!(looped.len(), 6);
        assert!(is_connected(&rooms, &looped));

        let none_extra = LoopedSpanningTree {
            max_cost_ratio: 1.5,
            extra_fraction: 0.0,
        }
        .connect(&rooms)
        .unwrap();
        assert_eq!(none_extra.len(), 3);
    }

    #[test]
    fn test_policy_kind_dispatch() {
        let rooms = rooms();
        let from_kind = PolicyKind::default().policy().connect(&rooms).unwrap();
        assert_eq!(from_kind, MinimumSpanningTree.connect(&rooms).unwrap());
    }

    #[test]
    fn test_create_hallways_carves_floor() {
        let mut grid = Grid::new(30, 12);
        let left = rect(1, 1, 7, 9);
        let right = rect(20, 1, 27, 9);
        left.place(&mut grid).unwrap();
        right.place(&mut grid).unwrap();

        let connections = [Connection::new(left, right)];
        let hallway = create_hallways(&mut grid, &connections, 5).unwrap();

        assert!(hallway.contains(&left.centre()));
        assert!(hallway.contains(&right.centre()));
        for pos in &hallway {
            assert_eq!(grid.get(*pos).unwrap(), TileType::Floor);
        }
        // the rooms' facing walls were opened
        assert_eq!(grid.get(Point::new(7, 3)).unwrap(), TileType::Floor);
        assert_eq!(grid.get(Point::new(20, 3)).unwrap(), TileType::Floor);
        // the corridor is walled in and leaves the rest untouched
        assert_eq!(grid.get(Point::new(13, 9)).unwrap(), TileType::Wall);
        assert_eq!(grid.get(Point::new(8, 5)).unwrap(), TileType::Wall);
        assert_eq!(grid.get(Point::new(9, 7)).unwrap(), TileType::Empty);
    }

    #[test]
    fn test_create_hallways_skips_unreachable() {
        let mut grid = Grid::new(20, 9);
        let left = rect(1, 1, 5, 7);
        let right = rect(13, 1, 18, 7);
        left.place(&mut grid).unwrap();
        right.place(&mut grid).unwrap();
        for y in 0..9 {
            grid.set(Point::new(9, y), TileType::Obstacle).unwrap();
        }

        let before = grid.clone();
        let hallway = create_hallways(&mut grid, &[Connection::new(left, right)], 5).unwrap();
        assert!(hallway.is_empty());
        assert_eq!(grid, before);
    }
}
