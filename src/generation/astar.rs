//! A* shortest path over a dungeon grid.
//!
//! Movement is 8-directional with a uniform cost of 1 per step, so the
//! Chebyshev distance to the goal is an admissible and consistent heuristic.
//! See <https://en.wikipedia.org/wiki/A*_search_algorithm>.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::primitives::{Grid, Point, TileType};
use crate::error::{GenerationError, Result};

/// North-west, north, north-east, west, east, south-west, south, south-east.
/// The order is part of the output: it decides between equal-cost paths.
const INTERCARDINAL_OFFSETS: [Point; 8] = [
    Point::new(-1, -1),
    Point::new(0, -1),
    Point::new(1, -1),
    Point::new(-1, 0),
    Point::new(1, 0),
    Point::new(-1, 1),
    Point::new(0, 1),
    Point::new(1, 1),
];

/// Frontier entry: a grid position and its estimated total cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Neighbour {
    cost: i32,
    destination: Point,
}

// BinaryHeap is a max-heap; reversed on cost alone so the cheapest entry pops
// first and ties keep the heap's own order
impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Calculate the shortest path from `start` to `end`.
///
/// The result runs from `end` back to `start`, both included. It is empty
/// when no path exists or either endpoint is outside the grid. Cells on the
/// grid's outermost ring and `Obstacle` tiles are never entered.
///
/// # Errors
/// `GenerationError::EmptyGrid` if the grid has no cells.
pub fn calculate_astar_path(grid: &Grid, start: Point, end: Point) -> Result<Vec<Point>> {
    if grid.is_empty() {
        return Err(GenerationError::EmptyGrid);
    }
    if !grid.contains(start) || !grid.contains(end) {
        return Ok(Vec::new());
    }

    // position -> (cost from start, previous position); start points at itself
    let mut came_from: HashMap<Point, (i32, Point)> = HashMap::from([(start, (0, start))]);
    let mut queue = BinaryHeap::new();
    queue.push(Neighbour {
        cost: 0,
        destination: start,
    });

    while let Some(Neighbour {
        destination: current,
        ..
    }) = queue.pop()
    {
        if current == end {
            return Ok(reconstruct_path(&came_from, start, end));
        }

        let distance = came_from[&current].0 + 1;
        for offset in INTERCARDINAL_OFFSETS {
            let neighbour = current + offset;
            if !is_walkable(grid, neighbour)? {
                continue;
            }

            let improves = came_from
                .get(&neighbour)
                .map_or(true, |&(known, _)| distance < known);
            if improves {
                came_from.insert(neighbour, (distance, current));
                queue.push(Neighbour {
                    cost: distance + neighbour.chebyshev(&end),
                    destination: neighbour,
                });
            }
        }
    }

    Ok(Vec::new())
}

/// Interior, non-obstacle cells. The bounds test runs before the grid read.
fn is_walkable(grid: &Grid, pos: Point) -> Result<bool> {
    let interior =
        pos.x >= 1 && pos.x < grid.width() - 1 && pos.y >= 1 && pos.y < grid.height() - 1;
    Ok(interior && grid.get(pos)? != TileType::Obstacle)
}

fn reconstruct_path(came_from: &HashMap<Point, (i32, Point)>, start: Point, end: Point) -> Vec<Point> {
    let mut path = Vec::new();
    let mut current = end;
    while let Some(&(_, previous)) = came_from.get(&current) {
        if previous == current {
            break;
        }
        path.push(current);
        current = previous;
    }
    path.push(start);
    path
}
