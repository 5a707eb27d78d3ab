use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use delivery_map::OccupancyMap;
use delivery_protocol::Waypoint;

use crate::error::NavError;

#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    pub max_iterations: usize,
    pub waypoint_spacing_m: f64,
    /// Radius searched outward for a free cell when the start point falls
    /// inside an inflated obstacle.
    pub start_rescue_radius_m: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { max_iterations: 200_000, waypoint_spacing_m: 0.5, start_rescue_radius_m: 0.5 }
    }
}

/// An (f-score, g-score) pair with a total order, for use as a `BinaryHeap`
/// priority. Ties on f are broken by lower g (§4.5). A* never produces NaN
/// costs here (all inputs are finite), so `total_cmp` is safe and avoids
/// pulling in an external ordered-float crate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scored {
    f: f64,
    g: f64,
}

impl Eq for Scored {}
impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want smallest f (then smallest g) first
        other.f.total_cmp(&self.f).then_with(|| other.g.total_cmp(&self.g))
    }
}
impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type CellCoord = (i64, i64);

/// Plans a waypoint path on the *inflated* map from `start` to `goal`.
/// `map` must already have obstacle clearance applied via
/// [`OccupancyMap::inflate`].
pub fn plan(map: &OccupancyMap, start: (f64, f64), goal: (f64, f64), config: &PlannerConfig) -> Result<Vec<Waypoint>, NavError> {
    if !map.is_reachable(goal.0, goal.1) {
        return Err(NavError::PathNotFound);
    }

    let start = rescue_start(map, start, config)?;

    let start_cell = map.cell_index(start.0, start.1).ok_or(NavError::PathNotFound)?;
    let goal_cell = map.cell_index(goal.0, goal.1).ok_or(NavError::PathNotFound)?;
    let start_cell: CellCoord = (start_cell.0 as i64, start_cell.1 as i64);
    let goal_cell: CellCoord = (goal_cell.0 as i64, goal_cell.1 as i64);

    if start_cell == goal_cell {
        let (gx, gy) = map.cell_to_world_center(goal_cell.0 as usize, goal_cell.1 as usize);
        return Ok(vec![Waypoint::with_default_tolerance(gx, gy)]);
    }

    let path_cells = astar(map, start_cell, goal_cell, config)?;
    let world_path: Vec<(f64, f64)> = path_cells
        .into_iter()
        .map(|(c, r)| map.cell_to_world_center(c as usize, r as usize))
        .collect();

    let simplified = remove_collinear(&world_path);
    let resampled = resample(&simplified, config.waypoint_spacing_m);
    Ok(resampled.into_iter().map(|(x, y)| Waypoint::with_default_tolerance(x, y)).collect())
}

/// If `start` lies inside an inflated obstacle, searches outward in
/// expanding rings (one cell-resolution step at a time) for the nearest
/// free world point within `start_rescue_radius_m`.
fn rescue_start(map: &OccupancyMap, start: (f64, f64), config: &PlannerConfig) -> Result<(f64, f64), NavError> {
    if map.is_reachable(start.0, start.1) {
        return Ok(start);
    }
    let resolution = map.resolution();
    let max_steps = (config.start_rescue_radius_m / resolution).ceil() as i64;
    for radius in 1..=max_steps {
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dr.abs() != radius && dc.abs() != radius {
                    continue; // only the current ring
                }
                let x = start.0 + dc as f64 * resolution;
                let y = start.1 + dr as f64 * resolution;
                if map.is_reachable(x, y) {
                    return Ok((x, y));
                }
            }
        }
    }
    Err(NavError::PathNotFound)
}

fn astar(map: &OccupancyMap, start: CellCoord, goal: CellCoord, config: &PlannerConfig) -> Result<Vec<CellCoord>, NavError> {
    let heuristic = |cell: CellCoord| -> f64 {
        (((goal.0 - cell.0) as f64).powi(2) + ((goal.1 - cell.1) as f64).powi(2)).sqrt()
    };

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<CellCoord, f64> = HashMap::new();
    let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
    let mut closed: HashSet<CellCoord> = HashSet::new();

    g_score.insert(start, 0.0);
    open.push((Scored { f: heuristic(start), g: 0.0 }, start));

    let neighbours: [(i64, i64); 8] =
        [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

    let mut iterations = 0usize;
    while let Some((_, current)) = open.pop() {
        if current == goal {
            return Ok(reconstruct_path(&came_from, current));
        }
        if !closed.insert(current) {
            continue;
        }
        iterations += 1;
        if iterations > config.max_iterations {
            break;
        }

        for (dc, dr) in neighbours {
            let neighbour = (current.0 + dc, current.1 + dr);
            if neighbour.0 < 0 || neighbour.1 < 0 {
                continue;
            }
            if neighbour.0 as usize >= map.width_cells() || neighbour.1 as usize >= map.height_cells() {
                continue;
            }
            let (wx, wy) = map.cell_to_world_center(neighbour.0 as usize, neighbour.1 as usize);
            if !map.is_reachable(wx, wy) {
                continue;
            }
            if closed.contains(&neighbour) {
                continue;
            }
            let step_cost = if dc != 0 && dr != 0 { std::f64::consts::SQRT_2 } else { 1.0 };
            let tentative_g = g_score.get(&current).copied().unwrap_or(f64::INFINITY) + step_cost;
            if tentative_g < g_score.get(&neighbour).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbour, current);
                g_score.insert(neighbour, tentative_g);
                open.push((Scored { f: tentative_g + heuristic(neighbour), g: tentative_g }, neighbour));
            }
        }
    }
    Err(NavError::PathNotFound)
}

fn reconstruct_path(came_from: &HashMap<CellCoord, CellCoord>, mut current: CellCoord) -> Vec<CellCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Drops interior points that lie on the straight line between their
/// neighbours, leaving only the path's genuine turns.
fn remove_collinear(path: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let mut simplified = vec![path[0]];
    for window in path.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
        if cross.abs() > 1e-9 {
            simplified.push(b);
        }
    }
    simplified.push(path[path.len() - 1]);
    simplified
}

/// Ensures consecutive waypoints are no further apart than `max_spacing`,
/// inserting intermediate points along straight segments as needed.
fn resample(path: &[(f64, f64)], max_spacing: f64) -> Vec<(f64, f64)> {
    if path.is_empty() {
        return vec![];
    }
    let mut out = vec![path[0]];
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dist = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        let steps = (dist / max_spacing).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            out.push((a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use delivery_map::{MapDescription, RectObstacle};

    fn empty_map() -> OccupancyMap {
        let desc = MapDescription { resolution: 0.1, width: 10.0, height: 10.0, origin: (0.0, 0.0), obstacles: vec![] };
        OccupancyMap::from_description(&desc).unwrap()
    }

    #[test]
    fn start_equals_goal_yields_single_waypoint() {
        let map = empty_map();
        let path = plan(&map, (5.0, 5.0), (5.04, 5.04), &PlannerConfig::default()).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn plans_a_clear_path_endpoint_to_endpoint() {
        let map = empty_map();
        let path = plan(&map, (0.5, 0.5), (8.0, 8.0), &PlannerConfig::default()).unwrap();
        assert!(path.len() >= 2);
        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert!((first.x - 0.5).abs() < 0.2);
        assert!((first.y - 0.5).abs() < 0.2);
        assert!((last.x - 8.0).abs() < 0.2);
        assert!((last.y - 8.0).abs() < 0.2);
    }

    #[test]
    fn consecutive_waypoints_are_never_further_than_spacing() {
        let map = empty_map();
        let config = PlannerConfig { waypoint_spacing_m: 0.5, ..Default::default() };
        let path = plan(&map, (0.5, 0.5), (8.0, 0.5), &config).unwrap();
        for pair in path.windows(2) {
            let dist = ((pair[1].x - pair[0].x).powi(2) + (pair[1].y - pair[0].y).powi(2)).sqrt();
            assert!(dist <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn unreachable_goal_inside_obstacle_fails() {
        let desc = MapDescription {
            resolution: 0.1,
            width: 10.0,
            height: 10.0,
            origin: (0.0, 0.0),
            obstacles: vec![RectObstacle { min: (4.0, 4.0), max: (6.0, 6.0) }],
        };
        let map = OccupancyMap::from_description(&desc).unwrap().inflate(0.3);
        let result = plan(&map, (0.5, 0.5), (5.0, 5.0), &PlannerConfig::default());
        assert!(matches!(result, Err(NavError::PathNotFound)));
    }

    #[test]
    fn start_inside_inflated_obstacle_rescues_to_nearby_free_cell() {
        let desc = MapDescription {
            resolution: 0.1,
            width: 10.0,
            height: 10.0,
            origin: (0.0, 0.0),
            obstacles: vec![RectObstacle { min: (0.0, 0.0), max: (0.15, 0.15) }],
        };
        let map = OccupancyMap::from_description(&desc).unwrap().inflate(0.05);
        // (0.05, 0.05) is inside the inflated obstacle but a free cell is nearby
        let result = plan(&map, (0.05, 0.05), (8.0, 8.0), &PlannerConfig::default());
        assert!(result.is_ok());
    }
}
