use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// An obstacle as described by a map file. Only axis-aligned rectangles
/// are supported at this level of fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectObstacle {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl RectObstacle {
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= self.min.0 && point.x <= self.max.0 && point.y >= self.min.1 && point.y <= self.max.1
    }

    pub fn is_within_extent(&self, width: f64, height: f64) -> bool {
        self.min.0 >= 0.0
            && self.min.1 >= 0.0
            && self.max.0 <= width
            && self.max.1 <= height
            && self.min.0 <= self.max.0
            && self.min.1 <= self.max.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_inside_and_outside() {
        let rect = RectObstacle { min: (1.0, 1.0), max: (2.0, 2.0) };
        assert!(rect.contains(Point2::new(1.5, 1.5)));
        assert!(!rect.contains(Point2::new(0.5, 1.5)));
    }

    #[test]
    fn is_within_extent_rejects_obstacle_outside_map() {
        let rect = RectObstacle { min: (9.0, 9.0), max: (11.0, 11.0) };
        assert!(!rect.is_within_extent(10.0, 10.0));
    }
}
