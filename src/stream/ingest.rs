//! Stream ingestion state machine
//!
//! Applies backend events to the overlay context: drives the processing
//! state, maps steps to progress, and turns positional batches into field
//! registry contents. Positional bursts are debounced before application so
//! a rapid run of batches costs one redraw, not many.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::geometry::{build_mapping, classify_batch, Classification, TransformInput};
use crate::state::OverlayContext;

use super::events::{PositionalBatch, StreamEvent};
use super::{step_progress, ProcessingState, ProgressState};

/// Delay before a stashed positional batch is applied; later batches in the
/// burst replace the stash and the newest one wins.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Consumes stream events and updates the overlay context
#[derive(Debug)]
pub struct StreamIngestion {
    debounce: Duration,
    pending: Option<PendingBatch>,
}

#[derive(Debug)]
struct PendingBatch {
    batch: PositionalBatch,
    deadline: Instant,
}

impl Default for StreamIngestion {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl StreamIngestion {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
        }
    }

    /// Apply one event. Positional batches are stashed and applied by
    /// [`tick`](Self::tick) once the debounce delay elapses.
    pub fn handle_event(&mut self, event: StreamEvent, ctx: &mut OverlayContext) {
        match event {
            StreamEvent::ProcessingStart {} => {
                info!("Processing session started");
                self.pending = None;
                ctx.registry.clear();
                ctx.selected = None;
                ctx.backend_result = None;
                ctx.invoice_details = None;
                ctx.mapping = None;
                ctx.table_extent = None;
                ctx.progress = ProgressState {
                    state: ProcessingState::Initializing,
                    percent: 0.0,
                    step_label: "Starting".to_string(),
                };
            }
            StreamEvent::ProcessingStep { step, message } => {
                // Steps only advance an active session; a settled Error or
                // Complete state persists until the next processing_start
                if !matches!(
                    ctx.state(),
                    ProcessingState::Initializing | ProcessingState::Running
                ) {
                    warn!("Ignoring step '{}' outside an active session", step);
                    return;
                }
                let (percent, label) = step_progress(&step);
                debug!("Processing step '{}' -> {}%", step, percent);
                ctx.progress.state = ProcessingState::Running;
                ctx.progress.percent = percent;
                ctx.progress.step_label = message.unwrap_or_else(|| label.to_string());
            }
            StreamEvent::PositionalData(batch) => {
                if !matches!(
                    ctx.state(),
                    ProcessingState::Initializing | ProcessingState::Running
                ) {
                    warn!("Ignoring positional batch outside an active session");
                    return;
                }
                ctx.progress.state = ProcessingState::Running;
                self.pending = Some(PendingBatch {
                    batch,
                    deadline: Instant::now() + self.debounce,
                });
            }
            StreamEvent::ProcessingComplete(result) => {
                // Apply any stashed batch so the final fields are shown
                if let Some(pending) = self.pending.take() {
                    apply_batch(pending.batch, ctx);
                }
                let stats = ctx.registry.stats();
                info!(
                    "Processing complete: {} fields, {} high-confidence",
                    stats.total, stats.high_confidence
                );
                ctx.backend_result = Some(result);
                ctx.progress = ProgressState {
                    state: ProcessingState::Complete,
                    percent: 100.0,
                    step_label: "Complete".to_string(),
                };
            }
            StreamEvent::Error { message } => {
                let label = message.unwrap_or_else(|| "Processing failed".to_string());
                warn!("Stream error: {}", label);
                // Registry retained for last-good display
                self.pending = None;
                ctx.progress.state = ProcessingState::Error;
                ctx.progress.step_label = label;
            }
        }
    }

    /// Apply a debounced batch whose delay has elapsed. Called once per
    /// frame from the UI loop.
    pub fn tick(&mut self, now: Instant, ctx: &mut OverlayContext) {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if due {
            if let Some(pending) = self.pending.take() {
                apply_batch(pending.batch, ctx);
            }
        }
    }

    /// Whether a batch is waiting for its debounce delay
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any stashed batch. Idempotent; part of session teardown.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Classify, map, transform, and replace: the registry is replaced
/// wholesale with the batch contents, per batch-replacement semantics.
fn apply_batch(mut batch: PositionalBatch, ctx: &mut OverlayContext) {
    if let Some(dims) = batch.image_dimensions {
        ctx.original_dimensions = Some((dims.width as f32, dims.height as f32));
    }
    if let Some(details) = batch.invoice_details.take() {
        ctx.invoice_details = Some(details);
    }

    let points: Vec<(f64, f64)> = batch
        .grouped_data
        .iter()
        .flatten()
        .map(|item| (item.x, item.y))
        .collect();

    match classify_batch(&points) {
        Some(Classification::TableIndexed(extent)) => {
            ctx.table_extent = Some(extent);
            // On a mapping precondition failure the prior mapping is kept
            if let Some(mapping) = build_mapping(&ctx.viewport, &extent) {
                ctx.mapping = Some(mapping);
            }
        }
        Some(Classification::PixelBased) => {
            ctx.table_extent = None;
            ctx.mapping = None;
        }
        None => {
            // Empty coordinate set keeps the prior classification
        }
    }

    ctx.registry.clear();
    ctx.selected = None;

    let mapping = ctx.mapping;
    let input = TransformInput {
        viewport: &ctx.viewport,
        mapping: mapping.as_ref(),
        original_dimensions: ctx.original_dimensions,
    };

    let mut valid = 0;
    let mut invalid = 0;
    for (group_index, group) in batch.grouped_data.iter().enumerate() {
        let outcome = ctx.registry.ingest_batch(group_index, group, &input);
        valid += outcome.valid;
        invalid += outcome.invalid;
    }

    debug!(
        "Applied positional batch: {} groups, {} fields, {} dropped",
        batch.grouped_data.len(),
        valid,
        invalid
    );
}
