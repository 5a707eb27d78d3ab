use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::obstacle::RectObstacle;

/// Tri-valued cell classification. Maps built from a static
/// description never populate `Unknown` (every cell is known ahead of
/// time), but the variant exists so a future live-sensor overlay has
/// somewhere to put cells it hasn't observed, without changing this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Free,
    Occupied,
    Unknown,
}

/// The on-disk description of a map: resolution, extent, origin, and a
/// flat list of rectangular obstacles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDescription {
    /// Metres per cell.
    pub resolution: f64,
    /// Extent in metres.
    pub width: f64,
    pub height: f64,
    /// World-frame coordinates of the `(0, 0)` cell's lower-left corner.
    pub origin: (f64, f64),
    pub obstacles: Vec<RectObstacle>,
}

impl MapDescription {
    /// Parses a map file in the flat TOML form documented for this core:
    /// `resolution`, `width`, `height`, `origin`, and a list of `[[obstacles]]`
    /// tables. Structural validity (positive resolution/extent, obstacles
    /// inside the extent) is only checked by [`OccupancyMap::from_description`];
    /// this step only has to produce a well-typed value.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| MapError::Read { path: path.display().to_string(), source })?;
        Ok(toml::from_str(&text)?)
    }
}

/// An immutable, static occupancy grid.
///
/// Never mutated after construction; [`OccupancyMap::inflate`]
/// returns a new, independent map rather than mutating `self`.
#[derive(Debug, Clone)]
pub struct OccupancyMap {
    resolution: f64,
    width_cells: usize,
    height_cells: usize,
    origin: (f64, f64),
    cells: Vec<Cell>,
}

impl OccupancyMap {
    pub fn from_description(desc: &MapDescription) -> Result<Self, MapError> {
        if desc.resolution <= 0.0 {
            return Err(MapError::NonPositiveResolution(desc.resolution));
        }
        if desc.width <= 0.0 || desc.height <= 0.0 {
            return Err(MapError::NonPositiveExtent { width: desc.width, height: desc.height });
        }
        for (index, obstacle) in desc.obstacles.iter().enumerate() {
            if !obstacle.is_within_extent(desc.width, desc.height) {
                return Err(MapError::ObstacleOutsideExtent { index });
            }
        }

        let width_cells = (desc.width / desc.resolution).ceil() as usize;
        let height_cells = (desc.height / desc.resolution).ceil() as usize;
        let mut cells = vec![Cell::Free; width_cells * height_cells];

        for obstacle in &desc.obstacles {
            for row in 0..height_cells {
                for col in 0..width_cells {
                    let (cx, cy) = cell_center(desc.resolution, col, row);
                    if obstacle.contains(Point2::new(cx, cy)) {
                        cells[row * width_cells + col] = Cell::Occupied;
                    }
                }
            }
        }

        Ok(Self { resolution: desc.resolution, width_cells, height_cells, origin: desc.origin, cells })
    }

    /// Parses and validates a map file in one step.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, MapError> {
        let desc = MapDescription::load_from_file(path)?;
        Self::from_description(&desc)
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn width_cells(&self) -> usize {
        self.width_cells
    }

    pub fn height_cells(&self) -> usize {
        self.height_cells
    }

    /// Cell indices `(col, row)` containing `(x, y)`, or `None` if outside
    /// the grid. Exposed for callers (e.g. the planner) that need to walk
    /// the grid directly rather than query individual world points.
    pub fn cell_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.world_to_cell(x, y)
    }

    fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let local_x = x - self.origin.0;
        let local_y = y - self.origin.1;
        if local_x < 0.0 || local_y < 0.0 {
            return None;
        }
        let col = (local_x / self.resolution) as usize;
        let row = (local_y / self.resolution) as usize;
        if col >= self.width_cells || row >= self.height_cells {
            return None;
        }
        Some((col, row))
    }

    pub fn cell_at(&self, x: f64, y: f64) -> Cell {
        match self.world_to_cell(x, y) {
            Some((col, row)) => self.cells[row * self.width_cells + col],
            None => Cell::Unknown,
        }
    }

    /// False when `(x, y)` is outside the grid or occupied. The planner
    /// and navigator both call this on the *inflated* map.
    pub fn is_reachable(&self, x: f64, y: f64) -> bool {
        match self.world_to_cell(x, y) {
            Some((col, row)) => self.cells[row * self.width_cells + col] != Cell::Occupied,
            None => false,
        }
    }

    /// Casts a ray from `(origin_x, origin_y)` at world-frame `angle` and
    /// returns the distance to the first occupied cell or the grid
    /// boundary, capped at `max_range`. Used only by the localizer's
    /// measurement model.
    pub fn ray_cast(&self, origin_x: f64, origin_y: f64, angle: f64, max_range: f64) -> f64 {
        let step = self.resolution * 0.5;
        let (dx, dy) = (angle.cos(), angle.sin());
        let mut traveled = 0.0;
        while traveled < max_range {
            let (x, y) = (origin_x + dx * traveled, origin_y + dy * traveled);
            match self.world_to_cell(x, y) {
                None => return traveled,
                Some((col, row)) => {
                    if self.cells[row * self.width_cells + col] == Cell::Occupied {
                        return traveled;
                    }
                }
            }
            traveled += step;
        }
        max_range
    }

    /// Returns a new map with every free cell within `radius` metres of an
    /// occupied cell reclassified as occupied. The source map is untouched.
    pub fn inflate(&self, radius: f64) -> OccupancyMap {
        let mut cells = self.cells.clone();
        let cell_radius = (radius / self.resolution).ceil() as isize;
        for row in 0..self.height_cells as isize {
            for col in 0..self.width_cells as isize {
                if self.cells[(row as usize) * self.width_cells + col as usize] != Cell::Occupied {
                    continue;
                }
                for dr in -cell_radius..=cell_radius {
                    for dc in -cell_radius..=cell_radius {
                        let nr = row + dr;
                        let nc = col + dc;
                        if nr < 0 || nc < 0 || nr >= self.height_cells as isize || nc >= self.width_cells as isize {
                            continue;
                        }
                        let dist = ((dr * dr + dc * dc) as f64).sqrt() * self.resolution;
                        if dist <= radius {
                            cells[(nr as usize) * self.width_cells + nc as usize] = Cell::Occupied;
                        }
                    }
                }
            }
        }
        OccupancyMap {
            resolution: self.resolution,
            width_cells: self.width_cells,
            height_cells: self.height_cells,
            origin: self.origin,
            cells,
        }
    }

    pub fn cell_to_world_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (x, y) = cell_center(self.resolution, col, row);
        (x + self.origin.0, y + self.origin.1)
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

fn cell_center(resolution: f64, col: usize, row: usize) -> (f64, f64) {
    ((col as f64 + 0.5) * resolution, (row as f64 + 0.5) * resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_10x10() -> OccupancyMap {
        let desc = MapDescription {
            resolution: 0.1,
            width: 10.0,
            height: 10.0,
            origin: (0.0, 0.0),
            obstacles: vec![],
        };
        OccupancyMap::from_description(&desc).unwrap()
    }

    #[test]
    fn rejects_non_positive_resolution() {
        let desc = MapDescription { resolution: 0.0, width: 10.0, height: 10.0, origin: (0.0, 0.0), obstacles: vec![] };
        assert!(matches!(OccupancyMap::from_description(&desc), Err(MapError::NonPositiveResolution(_))));
    }

    #[test]
    fn rejects_obstacle_outside_extent() {
        let desc = MapDescription {
            resolution: 0.1,
            width: 10.0,
            height: 10.0,
            origin: (0.0, 0.0),
            obstacles: vec![RectObstacle { min: (9.0, 9.0), max: (11.0, 11.0) }],
        };
        assert!(matches!(
            OccupancyMap::from_description(&desc),
            Err(MapError::ObstacleOutsideExtent { index: 0 })
        ));
    }

    #[test]
    fn empty_map_is_fully_reachable() {
        let map = empty_10x10();
        assert!(map.is_reachable(5.0, 5.0));
        assert_eq!(map.cell_at(5.0, 5.0), Cell::Free);
    }

    #[test]
    fn outside_extent_is_not_reachable() {
        let map = empty_10x10();
        assert!(!map.is_reachable(-1.0, 5.0));
        assert!(!map.is_reachable(20.0, 5.0));
    }

    #[test]
    fn ray_cast_hits_occupied_cell() {
        let desc = MapDescription {
            resolution: 0.1,
            width: 10.0,
            height: 10.0,
            origin: (0.0, 0.0),
            obstacles: vec![RectObstacle { min: (3.0, 4.9), max: (3.2, 5.1) }],
        };
        let map = OccupancyMap::from_description(&desc).unwrap();
        let range = map.ray_cast(0.0, 5.0, 0.0, 10.0);
        assert!((range - 3.0).abs() < 0.2);
    }

    #[test]
    fn ray_cast_returns_max_range_when_clear() {
        let map = empty_10x10();
        let range = map.ray_cast(5.0, 5.0, 0.0, 3.0);
        assert!((range - 3.0).abs() < 1e-9);
    }

    #[test]
    fn inflate_expands_occupied_cells_without_mutating_original() {
        let desc = MapDescription {
            resolution: 0.1,
            width: 2.0,
            height: 2.0,
            origin: (0.0, 0.0),
            obstacles: vec![RectObstacle { min: (1.0, 1.0), max: (1.1, 1.1) }],
        };
        let map = OccupancyMap::from_description(&desc).unwrap();
        assert!(map.is_reachable(0.8, 1.0));
        let inflated = map.inflate(0.3);
        assert!(!inflated.is_reachable(0.8, 1.0));
        // original untouched
        assert!(map.is_reachable(0.8, 1.0));
    }

    #[test]
    fn load_from_file_parses_and_validates() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("delivery_map_test_{:?}.toml", std::thread::current().id()));
        std::fs::write(
            &path,
            r#"
resolution = 0.1
width = 10.0
height = 10.0
origin = [0.0, 0.0]

[[obstacles]]
min = [3.0, 3.0]
max = [4.0, 4.0]
"#,
        )
        .unwrap();
        let map = OccupancyMap::load_from_file(&path).unwrap();
        assert_eq!(map.cell_at(3.5, 3.5), Cell::Occupied);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let result = OccupancyMap::load_from_file("/nonexistent/path/map.toml");
        assert!(matches!(result, Err(MapError::Read { .. })));
    }
}
