//! This module is the geospatial half of the enrichment engine: hierarchical
//! area labeling and per-category nearest-point matching. Both are one-shot
//! batch computations rebuilt from scratch on every run.

pub mod area_tree;
pub mod geometry;
pub mod nearest;

pub use self::area_tree::{Area, AreaId, AreaLabels, AreaTree};
pub use self::geometry::LonLat;
pub use self::nearest::{Nearest, NearestMatcher};
