//! Shared overlay state
//!
//! One explicit owned context object holds everything the components
//! mutate: the field registry, the document placement, the derived grid
//! mapping, progress, and the current selection. No ambient globals; every
//! operation receives this context.

use crate::fields::{Field, FieldRegistry};
use crate::geometry::{
    build_mapping, DocumentMapping, TableExtent, TransformInput, ViewportGeometry,
};
use crate::stream::{ProcessingState, ProgressState};

/// Mutable state of one overlay session
#[derive(Debug, Default)]
pub struct OverlayContext {
    /// Source of truth for what is drawn
    pub registry: FieldRegistry,
    /// Where the document bitmap sits inside the canvas
    pub viewport: ViewportGeometry,
    /// Grid mapping, present only while the batch is table-indexed
    pub mapping: Option<DocumentMapping>,
    /// Extent of the last table-indexed batch; used to rebuild the mapping
    /// when the document placement changes
    pub table_extent: Option<TableExtent>,
    /// Native pixel dimensions of the source bitmap, when reported
    pub original_dimensions: Option<(f32, f32)>,
    /// Processing state, progress percent, and step label
    pub progress: ProgressState,
    /// Index of the selected field, if any
    pub selected: Option<usize>,
    /// Raw extraction result from `processing_complete`, kept for export
    pub backend_result: Option<serde_json::Value>,
    /// Invoice metadata from the latest positional batch, kept for export
    pub invoice_details: Option<serde_json::Value>,
}

impl OverlayContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the document placement. The grid mapping is a pure function
    /// of the placement, so it is rebuilt from the last classification and
    /// every field rectangle is re-derived whenever the placement moves.
    pub fn set_viewport(&mut self, viewport: ViewportGeometry) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.mapping = self
            .table_extent
            .as_ref()
            .and_then(|extent| build_mapping(&self.viewport, extent));

        let mapping = self.mapping;
        let input = TransformInput {
            viewport: &self.viewport,
            mapping: mapping.as_ref(),
            original_dimensions: self.original_dimensions,
        };
        self.registry.retransform(&input);
    }

    /// Reset for a new document. Idempotent and safe to call repeatedly.
    pub fn reset_for_new_document(&mut self) {
        self.registry.clear();
        self.mapping = None;
        self.table_extent = None;
        self.original_dimensions = None;
        self.selected = None;
        self.backend_result = None;
        self.invoice_details = None;
        self.progress = ProgressState::default();
    }

    pub fn selected_field(&self) -> Option<&Field> {
        self.selected.and_then(|i| self.registry.get(i))
    }

    pub fn state(&self) -> ProcessingState {
        self.progress.state
    }
}
