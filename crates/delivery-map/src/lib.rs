//! # Delivery Map
//!
//! The static occupancy grid the navigator plans and localizes against:
//! load from a description, ray-cast for the localizer's measurement
//! model, inflate for the planner's clearance, and answer reachability
//! queries.
//!
//! A map is immutable once built; [`grid::OccupancyMap::inflate`] returns a
//! derived copy rather than mutating in place.

pub mod error;
pub mod grid;
pub mod obstacle;

pub use error::MapError;
pub use grid::{Cell, MapDescription, OccupancyMap};
pub use obstacle::RectObstacle;
