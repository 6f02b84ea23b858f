//! Fractional search regions for targeted image matching

use imageproc::rect::Rect;

/// Clamp a fraction into `[0, 1]`; NaN collapses to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// A region of interest expressed as fractions of the frame size, in
/// left/top/right/bottom order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Roi {
    /// The whole frame
    pub const FULL: Roi = Roi::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Pixel rectangle inside a `width` x `height` frame, or `None` when the
    /// clamped region has no area.
    pub fn to_rect(&self, width: u32, height: u32) -> Option<Rect> {
        let (l, t, r, b) = self.pixel_bounds(width, height);
        if r <= l || b <= t {
            return None;
        }
        Some(Rect::at(l as i32, t as i32).of_size(r - l, b - t))
    }

    /// Center of the region in frame pixels. Degenerate regions still have a
    /// center, which is what blind fallback clicks aim at.
    pub fn center(&self, width: u32, height: u32) -> (u32, u32) {
        let (l, t, r, b) = self.pixel_bounds(width, height);
        ((l + r) / 2, (t + b) / 2)
    }

    fn pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let scale = |size: u32, f: f64| (size as f64 * clamp01(f)) as u32;
        (
            scale(width, self.left),
            scale(height, self.top),
            scale(width, self.right),
            scale(height, self.bottom),
        )
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}, {:.2})",
            self.left, self.top, self.right, self.bottom
        )
    }
}
