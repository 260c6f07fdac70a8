//! Raw item to canvas rectangle transformation
//!
//! Converts one recognized item (table cell or document pixel) into a
//! canvas-space rectangle, given the current document placement. Must stay
//! deterministic and side-effect-free: identical inputs yield the identical
//! rectangle.

use crate::stream::events::RawRecognizedItem;

use super::mapping::DocumentMapping;
use super::{CanvasRect, ViewportGeometry};

/// Smallest rendered box side, keeps fields visible and clickable
pub const MIN_BOX_SIZE: f32 = 10.0;
/// Average glyph width used when the item carries no width
const AVG_GLYPH_WIDTH: f32 = 8.0;
/// Horizontal padding added to the glyph estimate
const TEXT_PADDING: f32 = 12.0;
/// Floor for estimated text widths
const MIN_TEXT_WIDTH: f32 = 50.0;
/// Fallback box height when the item carries no height
const DEFAULT_ITEM_HEIGHT: f32 = 20.0;

/// Inputs the transformation reads, borrowed from the overlay context
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    pub viewport: &'a ViewportGeometry,
    pub mapping: Option<&'a DocumentMapping>,
    /// Native pixel dimensions of the pre-display bitmap, when reported
    pub original_dimensions: Option<(f32, f32)>,
}

/// Estimate a rendered text width from its character count
pub fn estimated_text_width(text: &str) -> f32 {
    (text.chars().count() as f32 * AVG_GLYPH_WIDTH + TEXT_PADDING).max(MIN_TEXT_WIDTH)
}

/// Transform one raw item into a canvas-space rectangle.
///
/// Priority: grid mapping (table-indexed mode), then original-bitmap
/// scaling, then the uniform viewport scale. The result is clamped into the
/// canvas and floored at [`MIN_BOX_SIZE`] per side.
pub fn transform_item(item: &RawRecognizedItem, input: &TransformInput) -> CanvasRect {
    let viewport = input.viewport;

    let (x, y, width, height) = if let Some(mapping) = input.mapping {
        let px = mapping.start_x + item.x as f32 * mapping.cell_width;
        let py = mapping.start_y + item.y as f32 * mapping.cell_height;
        let w = estimated_text_width(&item.text).min(mapping.cell_width * 0.9);
        let h = item
            .height
            .map(|h| h as f32)
            .unwrap_or(DEFAULT_ITEM_HEIGHT)
            .min(mapping.cell_height * 0.8);
        (px, py, w, h)
    } else if let Some((original_w, original_h)) = input.original_dimensions {
        let scale_x = viewport.width / original_w.max(1.0);
        let scale_y = viewport.height / original_h.max(1.0);
        let px = viewport.offset_x + item.x as f32 * scale_x;
        let py = viewport.offset_y + item.y as f32 * scale_y;
        let w = item
            .width
            .map(|w| w as f32 * scale_x)
            .unwrap_or_else(|| estimated_text_width(&item.text));
        let h = item
            .height
            .map(|h| h as f32 * scale_y)
            .unwrap_or(DEFAULT_ITEM_HEIGHT);
        (px, py, w, h)
    } else {
        let scale = viewport.scale_factor;
        let px = viewport.offset_x + item.x as f32 * scale;
        let py = viewport.offset_y + item.y as f32 * scale;
        let w = item
            .width
            .map(|w| w as f32 * scale)
            .unwrap_or_else(|| estimated_text_width(&item.text));
        let h = item
            .height
            .map(|h| h as f32 * scale)
            .unwrap_or(DEFAULT_ITEM_HEIGHT);
        (px, py, w, h)
    };

    CanvasRect {
        x: x.clamp(0.0, viewport.canvas_width),
        y: y.clamp(0.0, viewport.canvas_height),
        width: width.clamp(0.0, viewport.canvas_width).max(MIN_BOX_SIZE),
        height: height.clamp(0.0, viewport.canvas_height).max(MIN_BOX_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::classifier::TableExtent;
    use crate::geometry::mapping::build_mapping;

    fn viewport() -> ViewportGeometry {
        ViewportGeometry {
            offset_x: 100.0,
            offset_y: 50.0,
            width: 600.0,
            height: 800.0,
            scale_factor: 0.5,
            canvas_width: 800.0,
            canvas_height: 900.0,
        }
    }

    fn item(text: &str, x: f64, y: f64) -> RawRecognizedItem {
        RawRecognizedItem {
            text: text.to_string(),
            x,
            y,
            width: None,
            height: None,
            confidence: Some(0.9),
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let vp = viewport();
        let input = TransformInput {
            viewport: &vp,
            mapping: None,
            original_dimensions: Some((1200.0, 1600.0)),
        };
        let it = item("€ 450,00", 300.0, 400.0);
        assert_eq!(transform_item(&it, &input), transform_item(&it, &input));
    }

    #[test]
    fn test_table_mode_uses_grid_cells() {
        let vp = viewport();
        let extent = TableExtent { rows: 10, columns: 4 };
        let mapping = build_mapping(&vp, &extent).unwrap();
        let input = TransformInput {
            viewport: &vp,
            mapping: Some(&mapping),
            original_dimensions: None,
        };

        let rect = transform_item(&item("ab", 2.0, 3.0), &input);
        assert!((rect.x - (mapping.start_x + 2.0 * mapping.cell_width)).abs() < 0.001);
        assert!((rect.y - (mapping.start_y + 3.0 * mapping.cell_height)).abs() < 0.001);
        assert!(rect.width <= mapping.cell_width * 0.9 + 0.001);
        assert!(rect.height <= mapping.cell_height * 0.8 + 0.001);
    }

    #[test]
    fn test_original_dimension_scaling() {
        let vp = viewport();
        let input = TransformInput {
            viewport: &vp,
            mapping: None,
            original_dimensions: Some((1200.0, 1600.0)),
        };
        // 600/1200 = 0.5 horizontal, 800/1600 = 0.5 vertical
        let mut it = item("total", 400.0, 800.0);
        it.width = Some(100.0);
        it.height = Some(40.0);
        let rect = transform_item(&it, &input);
        assert!((rect.x - 300.0).abs() < 0.001);
        assert!((rect.y - 450.0).abs() < 0.001);
        assert!((rect.width - 50.0).abs() < 0.001);
        assert!((rect.height - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_uniform_scale_fallback() {
        let vp = viewport();
        let input = TransformInput {
            viewport: &vp,
            mapping: None,
            original_dimensions: None,
        };
        let rect = transform_item(&item("x", 200.0, 100.0), &input);
        assert!((rect.x - 200.0).abs() < 0.001); // 100 + 200 * 0.5
        assert!((rect.y - 100.0).abs() < 0.001); // 50 + 100 * 0.5
    }

    #[test]
    fn test_output_clamped_to_canvas_with_minimum_size() {
        let vp = viewport();
        let input = TransformInput {
            viewport: &vp,
            mapping: None,
            original_dimensions: None,
        };
        // Far outside the canvas
        let rect = transform_item(&item("far", 10_000.0, 10_000.0), &input);
        assert!(rect.x <= vp.canvas_width);
        assert!(rect.y <= vp.canvas_height);
        assert!(rect.width >= MIN_BOX_SIZE);
        assert!(rect.height >= MIN_BOX_SIZE);
    }

    #[test]
    fn test_estimated_text_width_floor() {
        assert!((estimated_text_width("ab") - 50.0).abs() < 0.001);
        let wide = estimated_text_width("a long recognized value");
        assert!(wide > 50.0);
    }
}
