//! Vector helpers used by the border algorithms
//!
//! - Bounding boxes of geometries and feature layers
//! - Douglas-Peucker simplification of border lines

mod simplify;
mod spatial;

pub use simplify::simplify_lines;
pub use spatial::{bounding_box, collection_bounds, BoundingBox};
