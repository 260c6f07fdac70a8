//! Field Registry
//!
//! Ordered source of truth for the overlay: each recognized item that
//! survives validation becomes a `Field` with a canvas rectangle and
//! transient render state. Registry order equals arrival order and is the
//! canonical index used for on-screen numbering and hit-testing.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::geometry::{transform_item, CanvasRect, TransformInput};
use crate::stream::events::RawRecognizedItem;

/// Confidence above which a field counts as high-confidence
pub const HIGH_CONFIDENCE: f32 = 0.8;

/// One recognized text element as displayed on the overlay
#[derive(Debug, Clone)]
pub struct Field {
    /// Display label, derived from the registry index
    pub label: String,
    /// Recognized text
    pub value: String,
    /// Recognition confidence, 0.0..=1.0
    pub confidence: f32,
    /// Canvas-space rectangle
    pub rect: CanvasRect,
    /// Set on arrival, decays after the animation window
    pub is_new: bool,
    /// Set by hit-testing selection
    pub is_highlighted: bool,
    /// Arrival animation progress, 0.0..=1.0
    pub animation_phase: f32,
    created_at: Instant,
    source: SourceGeometry,
}

/// Raw source coordinates, kept so the rectangle can be re-derived when the
/// document placement changes
#[derive(Debug, Clone, Copy)]
struct SourceGeometry {
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
}

/// Counts returned by one batch ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub valid: usize,
    pub invalid: usize,
}

/// Registry totals for the HUD and the completion banner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub high_confidence: usize,
}

/// Ordered mapping from field index to field record
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate, transform, and append one group of raw items.
    ///
    /// Items lacking finite non-negative coordinates or non-empty text are
    /// dropped and counted; each drop is logged with enough context to
    /// reproduce. `group_index` identifies the group within its batch.
    pub fn ingest_batch(
        &mut self,
        group_index: usize,
        items: &[RawRecognizedItem],
        input: &TransformInput<'_>,
    ) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let now = Instant::now();

        for (item_index, item) in items.iter().enumerate() {
            if !is_valid_item(item) {
                warn!(
                    "Dropping malformed item (group {}, item {}): text={:?} x={} y={}",
                    group_index, item_index, item.text, item.x, item.y
                );
                outcome.invalid += 1;
                continue;
            }

            let rect = transform_item(item, input);
            let index = self.fields.len();
            self.fields.push(Field {
                label: format!("Field {}", index + 1),
                value: item.text.clone(),
                confidence: item.confidence.unwrap_or(0.0).clamp(0.0, 1.0) as f32,
                rect,
                is_new: true,
                is_highlighted: false,
                animation_phase: 0.0,
                created_at: now,
                source: SourceGeometry {
                    x: item.x,
                    y: item.y,
                    width: item.width,
                    height: item.height,
                },
            });
            outcome.valid += 1;
        }

        debug!(
            "Ingested group {}: {} valid, {} invalid",
            group_index, outcome.valid, outcome.invalid
        );
        outcome
    }

    /// Re-derive every rectangle from its source coordinates. Called when
    /// the document placement changes so the boxes follow the document.
    pub fn retransform(&mut self, input: &TransformInput<'_>) {
        for field in &mut self.fields {
            let item = RawRecognizedItem {
                text: field.value.clone(),
                x: field.source.x,
                y: field.source.y,
                width: field.source.width,
                height: field.source.height,
                confidence: None,
            };
            field.rect = transform_item(&item, input);
        }
    }

    /// Drop all fields. Called when a new document is selected or
    /// processing restarts.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Highlight exactly one field, clearing any prior highlight
    pub fn set_highlighted(&mut self, index: Option<usize>) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.is_highlighted = index == Some(i);
        }
    }

    /// Read-only view of fields at or above the confidence threshold
    /// (fraction, 0.0..=1.0), paired with their canonical indices.
    pub fn filter_by_confidence(
        &self,
        threshold: f32,
    ) -> impl Iterator<Item = (usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.confidence >= threshold)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.fields.len(),
            high_confidence: self
                .fields
                .iter()
                .filter(|f| f.confidence > HIGH_CONFIDENCE)
                .count(),
        }
    }

    /// Average confidence across all fields, as a percentage
    pub fn avg_confidence_percent(&self) -> f32 {
        if self.fields.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.fields.iter().map(|f| f.confidence).sum();
        sum / self.fields.len() as f32 * 100.0
    }

    /// Advance arrival animations. Time-based rather than frame-based so it
    /// is robust to frame-rate variation. Returns whether any field is
    /// still animating (one more redraw is needed after the last decay).
    pub fn advance_animations(&mut self, now: Instant, window: Duration) -> bool {
        let mut any_new = false;
        for field in &mut self.fields {
            if !field.is_new {
                continue;
            }
            let elapsed = now.saturating_duration_since(field.created_at);
            if elapsed >= window {
                field.is_new = false;
                field.animation_phase = 1.0;
                any_new = true; // final redraw for this field
            } else {
                let phase = elapsed.as_secs_f32() / window.as_secs_f32();
                field.animation_phase = field.animation_phase.max(phase.clamp(0.0, 1.0));
                any_new = true;
            }
        }
        any_new
    }
}

fn is_valid_item(item: &RawRecognizedItem) -> bool {
    item.x.is_finite()
        && item.y.is_finite()
        && item.x >= 0.0
        && item.y >= 0.0
        && !item.text.trim().is_empty()
}
