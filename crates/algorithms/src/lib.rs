//! # Carto Algorithms
//!
//! Border extraction for thematic maps.
//!
//! ## Available Algorithm Categories
//!
//! - **borders**: outer borders (proximity partition of non-contiguous
//!   regions), inner borders (shared edges of touching regions), and the
//!   raster pipeline stages behind them
//! - **vector**: bounding boxes and line simplification

pub mod borders;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::borders::{
        all_borders, inner_borders, outer_borders, partition_polygons, BorderParams, IdField,
        InnerBorders, LegacyBorderArgs, OuterBorders,
    };
    pub use crate::vector::{collection_bounds, simplify_lines, BoundingBox};
    pub use carto_core::prelude::*;
}
