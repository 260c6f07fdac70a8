//! Canvas Geometry Layer
//!
//! Describes where the rendered document sits inside the canvas and converts
//! raw recognition coordinates into canvas-space rectangles. Three stages:
//! classify the batch's coordinate system, derive a grid mapping when the
//! coordinates are table indices, and transform individual items.

pub mod classifier;
pub mod mapping;
pub mod transform;

use serde::Serialize;

pub use classifier::{classify_batch, Classification, TableExtent};
pub use mapping::{build_mapping, DocumentMapping};
pub use transform::{transform_item, TransformInput};

/// Margin kept between the canvas edge and the fitted document
pub const CANVAS_MARGIN: f32 = 20.0;

/// An axis-aligned rectangle in canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the point lies inside the rectangle (boundary counts as inside)
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Rectangle grown by `padding` on every side
    pub fn expanded(&self, padding: f32) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }
}

/// Placement of the document bitmap inside the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportGeometry {
    /// Canvas x of the document's top-left corner
    pub offset_x: f32,
    /// Canvas y of the document's top-left corner
    pub offset_y: f32,
    /// Displayed document width in canvas pixels
    pub width: f32,
    /// Displayed document height in canvas pixels
    pub height: f32,
    /// Uniform scale applied when fitting the bitmap
    pub scale_factor: f32,
    /// Full canvas width
    pub canvas_width: f32,
    /// Full canvas height
    pub canvas_height: f32,
}

impl ViewportGeometry {
    /// Whether the document has been placed on the canvas yet
    pub fn is_placed(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Fit a document bitmap into the canvas, preserving aspect ratio and
/// keeping a margin on every side. The document is centered.
pub fn fit_document(
    canvas_width: f32,
    canvas_height: f32,
    bitmap_width: f32,
    bitmap_height: f32,
) -> ViewportGeometry {
    if bitmap_width <= 0.0 || bitmap_height <= 0.0 || canvas_width <= 0.0 || canvas_height <= 0.0 {
        return ViewportGeometry::default();
    }

    let usable_w = (canvas_width - CANVAS_MARGIN * 2.0).max(1.0);
    let usable_h = (canvas_height - CANVAS_MARGIN * 2.0).max(1.0);
    let scale = (usable_w / bitmap_width).min(usable_h / bitmap_height);

    let width = bitmap_width * scale;
    let height = bitmap_height * scale;

    ViewportGeometry {
        offset_x: (canvas_width - width) / 2.0,
        offset_y: (canvas_height - height) / 2.0,
        width,
        height,
        scale_factor: scale,
        canvas_width,
        canvas_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_boundary() {
        let rect = CanvasRect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(110.0, 60.0));
        assert!(rect.contains(50.0, 30.0));
        assert!(!rect.contains(9.9, 10.0));
        assert!(!rect.contains(110.1, 60.0));
    }

    #[test]
    fn test_rect_expanded() {
        let rect = CanvasRect::new(10.0, 10.0, 100.0, 50.0).expanded(5.0);
        assert!((rect.x - 5.0).abs() < 0.001);
        assert!((rect.y - 5.0).abs() < 0.001);
        assert!((rect.width - 110.0).abs() < 0.001);
        assert!((rect.height - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_fit_document_contained_with_margins() {
        let vp = fit_document(800.0, 600.0, 2100.0, 2970.0);
        assert!(vp.is_placed());
        assert!(vp.offset_x >= CANVAS_MARGIN - 0.001);
        assert!(vp.offset_y >= CANVAS_MARGIN - 0.001);
        assert!(vp.offset_x + vp.width <= 800.0 - CANVAS_MARGIN + 0.001);
        assert!(vp.offset_y + vp.height <= 600.0 - CANVAS_MARGIN + 0.001);
        // Aspect ratio preserved
        let aspect = vp.width / vp.height;
        assert!((aspect - 2100.0 / 2970.0).abs() < 0.001);
    }

    #[test]
    fn test_fit_document_centered() {
        let vp = fit_document(1000.0, 1000.0, 500.0, 500.0);
        assert!((vp.offset_x - (1000.0 - vp.width) / 2.0).abs() < 0.001);
        assert!((vp.offset_y - (1000.0 - vp.height) / 2.0).abs() < 0.001);
    }

    #[test]
    fn test_fit_document_degenerate_bitmap() {
        let vp = fit_document(800.0, 600.0, 0.0, 0.0);
        assert!(!vp.is_placed());
    }
}
