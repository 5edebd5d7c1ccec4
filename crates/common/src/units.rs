//! Sub-pixel coordinate system.
//!
//! One cell is 16 pixels, one pixel is 10 sub-pixels. Positions are stored in
//! sub-pixels; geometry runs on whole pixels obtained by floor division.

use glam::IVec2;

pub const SUBPIXELS_PER_PIXEL: i32 = 10;
pub const PIXELS_PER_CELL: i32 = 16;
pub const SUBPIXELS_PER_CELL: i32 = SUBPIXELS_PER_PIXEL * PIXELS_PER_CELL;
pub const TICKS_PER_SECOND: u32 = 60;

/// Floor a sub-pixel coordinate to its pixel.
#[inline]
pub fn to_pixel(subpixel: i32) -> i32 {
    subpixel.div_euclid(SUBPIXELS_PER_PIXEL)
}

#[inline]
pub fn to_subpixel(pixel: i32) -> i32 {
    pixel * SUBPIXELS_PER_PIXEL
}

#[inline]
pub fn pixel_of(pos: IVec2) -> IVec2 {
    IVec2::new(to_pixel(pos.x), to_pixel(pos.y))
}

#[inline]
pub fn subpixel_of(pixel: IVec2) -> IVec2 {
    pixel * SUBPIXELS_PER_PIXEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rounding_floors() {
        assert_eq!(to_pixel(0), 0);
        assert_eq!(to_pixel(9), 0);
        assert_eq!(to_pixel(10), 1);
        assert_eq!(to_pixel(-1), -1);
        assert_eq!(to_pixel(-10), -1);
        assert_eq!(to_pixel(-11), -2);
    }

    #[test]
    fn cell_is_160_subpixels() {
        assert_eq!(SUBPIXELS_PER_CELL, 160);
        assert_eq!(subpixel_of(IVec2::new(16, -3)), IVec2::new(160, -30));
        assert_eq!(pixel_of(IVec2::new(805, -5)), IVec2::new(80, -1));
    }
}
