//! Coordinate system classification
//!
//! OCR backends emit either dense pixel coordinates or small integer
//! table-cell indices, without a schema flag to tell them apart. A batch
//! whose coordinates all sit in `[0, 50)` on both axes is treated as
//! table-indexed; anything else is pixel-based.

use tracing::debug;

/// Coordinates below this bound on both axes are considered table indices.
/// Preserved from the original client behavior; legitimate pixel coordinates
/// for a very small document would be misclassified, see DESIGN.md.
pub const TABLE_INDEX_LIMIT: f64 = 50.0;

/// Row/column extent of a table-indexed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableExtent {
    pub rows: u32,
    pub columns: u32,
}

/// Result of classifying one positional batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Coordinates are grid indices; carries the grid extent
    TableIndexed(TableExtent),
    /// Coordinates are document pixels
    PixelBased,
}

/// Classify the coordinate system of a batch from its full `(x, y)` set.
///
/// Returns `None` for an empty set: the caller keeps its prior
/// classification and mapping.
pub fn classify_batch(points: &[(f64, f64)]) -> Option<Classification> {
    if points.is_empty() {
        return None;
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let table_indexed = max_x < TABLE_INDEX_LIMIT
        && max_y < TABLE_INDEX_LIMIT
        && min_x >= 0.0
        && min_y >= 0.0;

    if table_indexed {
        let extent = TableExtent {
            columns: ((max_x - min_x).floor() as u32 + 1).max(1),
            rows: ((max_y - min_y).floor() as u32 + 1).max(1),
        };
        debug!(
            "Classified batch as table-indexed: {} columns x {} rows (x {:.1}..{:.1}, y {:.1}..{:.1})",
            extent.columns, extent.rows, min_x, max_x, min_y, max_y
        );
        Some(Classification::TableIndexed(extent))
    } else {
        debug!(
            "Classified batch as pixel-based (x {:.1}..{:.1}, y {:.1}..{:.1})",
            min_x, max_x, min_y, max_y
        );
        Some(Classification::PixelBased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_coordinates_are_table_indexed() {
        let points = vec![(0.0, 0.0), (3.0, 5.0), (12.0, 49.9)];
        match classify_batch(&points) {
            Some(Classification::TableIndexed(extent)) => {
                assert_eq!(extent.columns, 13);
                assert_eq!(extent.rows, 50);
            }
            other => panic!("expected table-indexed, got {:?}", other),
        }
    }

    #[test]
    fn test_value_at_limit_is_pixel_based() {
        let points = vec![(0.0, 0.0), (50.0, 10.0)];
        assert_eq!(classify_batch(&points), Some(Classification::PixelBased));

        let points = vec![(0.0, 0.0), (10.0, 50.0)];
        assert_eq!(classify_batch(&points), Some(Classification::PixelBased));
    }

    #[test]
    fn test_large_coordinates_are_pixel_based() {
        let points = vec![(120.0, 340.0), (800.0, 1100.0)];
        assert_eq!(classify_batch(&points), Some(Classification::PixelBased));
    }

    #[test]
    fn test_negative_coordinates_are_pixel_based() {
        let points = vec![(-1.0, 5.0), (3.0, 7.0)];
        assert_eq!(classify_batch(&points), Some(Classification::PixelBased));
    }

    #[test]
    fn test_empty_set_is_no_op() {
        assert_eq!(classify_batch(&[]), None);
    }

    #[test]
    fn test_single_cell_extent_is_at_least_one() {
        let points = vec![(4.0, 4.0)];
        match classify_batch(&points) {
            Some(Classification::TableIndexed(extent)) => {
                assert_eq!(extent.columns, 1);
                assert_eq!(extent.rows, 1);
            }
            other => panic!("expected table-indexed, got {:?}", other),
        }
    }
}
