//! Shared types for the echostep simulation core.
//!
//! # Invariants
//! - No floating point on any per-tick path: positions are integer sub-pixels,
//!   velocities are Q16.16 [`Fixed`].
//! - Ids are allocated monotonically, so id order is creation order.

pub mod fixed;
pub mod geom;
pub mod types;
pub mod units;

pub use fixed::{Fixed, Velocity};
pub use geom::{
    GeomError, Rect, Shape, Triangle, rect_contains, rect_intersect, rect_overlap_area,
    rect_triangle_intersect, segment_segment_intersect, triangle_contains,
    triangle_triangle_intersect,
};
pub use glam::IVec2;
pub use types::{ColliderId, EntityId, IdAllocator, PhysicsGroup};
pub use units::{
    PIXELS_PER_CELL, SUBPIXELS_PER_CELL, SUBPIXELS_PER_PIXEL, TICKS_PER_SECOND, pixel_of,
    subpixel_of, to_pixel, to_subpixel,
};
