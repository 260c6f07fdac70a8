//! Extraction export
//!
//! On-demand JSON snapshot of everything the session extracted: the
//! transformed fields, registry totals, and the raw backend result.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::geometry::CanvasRect;
use crate::state::OverlayContext;

/// One exported field
#[derive(Debug, Clone, Serialize)]
pub struct FieldSnapshot {
    pub label: String,
    pub value: String,
    pub confidence: f32,
    pub rect: CanvasRect,
}

/// Full session snapshot
#[derive(Debug, Serialize)]
pub struct ExportSnapshot {
    pub fields: Vec<FieldSnapshot>,
    pub total_fields: usize,
    pub high_confidence_fields: usize,
    pub average_confidence_percent: f32,
    /// Raw `processing_complete` payload, when the backend delivered one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_result: Option<serde_json::Value>,
    /// Invoice metadata from the latest positional batch, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_details: Option<serde_json::Value>,
}

/// Build the snapshot from the current overlay state
pub fn build_snapshot(ctx: &OverlayContext) -> ExportSnapshot {
    let stats = ctx.registry.stats();
    ExportSnapshot {
        fields: ctx
            .registry
            .fields()
            .iter()
            .map(|f| FieldSnapshot {
                label: f.label.clone(),
                value: f.value.clone(),
                confidence: f.confidence,
                rect: f.rect,
            })
            .collect(),
        total_fields: stats.total,
        high_confidence_fields: stats.high_confidence,
        average_confidence_percent: ctx.registry.avg_confidence_percent(),
        backend_result: ctx.backend_result.clone(),
        invoice_details: ctx.invoice_details.clone(),
    }
}

/// Write the snapshot as pretty-printed JSON
pub fn write_snapshot(ctx: &OverlayContext, path: &Path) -> Result<()> {
    let snapshot = build_snapshot(ctx);
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write export to {:?}", path))?;
    info!("Exported {} fields to {:?}", snapshot.total_fields, path);
    Ok(())
}
