//! Document grid mapping
//!
//! When a batch is table-indexed, a uniform grid is laid over the displayed
//! document region so cell indices can be converted to canvas pixels.

use tracing::{debug, warn};

use super::classifier::TableExtent;
use super::ViewportGeometry;

/// Fraction of the document width reserved as margin on each side
pub const HORIZONTAL_MARGIN_RATIO: f32 = 0.10;
/// Fraction of the document height reserved as margin on top and bottom,
/// accounting for headers and footers outside the tabular region
pub const VERTICAL_MARGIN_RATIO: f32 = 0.15;

/// Uniform grid over the displayed document region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentMapping {
    pub cell_width: f32,
    pub cell_height: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub table_rows: u32,
    pub table_columns: u32,
}

/// Derive the grid mapping for a table-indexed batch.
///
/// Pure function of the viewport and extent; must be recomputed whenever the
/// document placement changes. Returns `None` (logged, prior mapping kept by
/// the caller) when the document has not been placed on the canvas yet.
pub fn build_mapping(viewport: &ViewportGeometry, extent: &TableExtent) -> Option<DocumentMapping> {
    if !viewport.is_placed() {
        warn!(
            "Skipping grid mapping: document not yet placed on canvas ({}x{})",
            viewport.width, viewport.height
        );
        return None;
    }

    let rows = extent.rows.max(1);
    let columns = extent.columns.max(1);

    let margin_x = viewport.width * HORIZONTAL_MARGIN_RATIO;
    let margin_y = viewport.height * VERTICAL_MARGIN_RATIO;

    let usable_width = viewport.width - margin_x * 2.0;
    let usable_height = viewport.height - margin_y * 2.0;

    let mapping = DocumentMapping {
        cell_width: usable_width / columns as f32,
        cell_height: usable_height / rows as f32,
        start_x: viewport.offset_x + margin_x,
        start_y: viewport.offset_y + margin_y,
        table_rows: rows,
        table_columns: columns,
    };

    debug!(
        "Built grid mapping: {}x{} cells of {:.1}x{:.1}px starting at ({:.1}, {:.1})",
        columns, rows, mapping.cell_width, mapping.cell_height, mapping.start_x, mapping.start_y
    );

    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_viewport() -> ViewportGeometry {
        ViewportGeometry {
            offset_x: 100.0,
            offset_y: 50.0,
            width: 600.0,
            height: 800.0,
            scale_factor: 1.0,
            canvas_width: 800.0,
            canvas_height: 900.0,
        }
    }

    #[test]
    fn test_mapping_divides_usable_area_evenly() {
        let extent = TableExtent { rows: 10, columns: 4 };
        let mapping = build_mapping(&placed_viewport(), &extent).unwrap();

        // 10% horizontal margin: 60px each side, 480 usable over 4 columns
        assert!((mapping.cell_width - 120.0).abs() < 0.001);
        // 15% vertical margin: 120px each side, 560 usable over 10 rows
        assert!((mapping.cell_height - 56.0).abs() < 0.001);
        assert!((mapping.start_x - 160.0).abs() < 0.001);
        assert!((mapping.start_y - 170.0).abs() < 0.001);
        assert_eq!(mapping.table_rows, 10);
        assert_eq!(mapping.table_columns, 4);
    }

    #[test]
    fn test_mapping_requires_placed_document() {
        let extent = TableExtent { rows: 3, columns: 3 };
        let unplaced = ViewportGeometry::default();
        assert!(build_mapping(&unplaced, &extent).is_none());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let extent = TableExtent { rows: 7, columns: 5 };
        let a = build_mapping(&placed_viewport(), &extent).unwrap();
        let b = build_mapping(&placed_viewport(), &extent).unwrap();
        assert_eq!(a, b);
    }
}
