//! Mapping between overlay pixels and page-normalized coordinates.
//!
//! Strokes are stored relative to the unrotated page, with both axes in
//! `0.0..=1.0` and the origin at the top-left. The overlay may be resized,
//! zoomed, or rotated after capture; rendering maps the stored points through
//! whatever geometry is current, so strokes stay attached to the page content.

use viewer_core::Rotation;

/// Point on the unrotated page, as fractions of its width and height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size and orientation of the overlay covering one rendered page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub width_px: f32,
    pub height_px: f32,
    pub rotation: Rotation,
}

impl OverlayGeometry {
    pub fn new(width_px: f32, height_px: f32, rotation: Rotation) -> Self {
        Self { width_px, height_px, rotation }
    }

    /// Whether points can be mapped; a zero-sized overlay cannot.
    pub fn is_usable(&self) -> bool {
        self.width_px > 0.0 && self.height_px > 0.0
    }

    /// Maps an overlay-local pixel position onto the page.
    pub fn to_page(&self, x_px: f32, y_px: f32) -> PagePoint {
        let u = (x_px / self.width_px).clamp(0.0, 1.0);
        let v = (y_px / self.height_px).clamp(0.0, 1.0);

        match self.rotation {
            Rotation::Deg0 => PagePoint::new(u, v),
            Rotation::Deg90 => PagePoint::new(v, 1.0 - u),
            Rotation::Deg180 => PagePoint::new(1.0 - u, 1.0 - v),
            Rotation::Deg270 => PagePoint::new(1.0 - v, u),
        }
    }

    /// Maps a page point to overlay-local pixels.
    pub fn to_overlay(&self, point: PagePoint) -> (f32, f32) {
        let (u, v) = match self.rotation {
            Rotation::Deg0 => (point.x, point.y),
            Rotation::Deg90 => (1.0 - point.y, point.x),
            Rotation::Deg180 => (1.0 - point.x, 1.0 - point.y),
            Rotation::Deg270 => (point.y, 1.0 - point.x),
        };
        (u * self.width_px, v * self.height_px)
    }
}

impl Default for OverlayGeometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, Rotation::Deg0)
    }
}
