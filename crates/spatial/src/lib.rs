//! Spatial index for resolver and sensor queries.
//!
//! # Invariants
//! - Every static or kinematic block with a solid collider is present.
//! - Queries return a superset of true hits, sorted by entity id.

mod grid;

pub use grid::{CellCoord, SpatialError, SpatialGrid};
