//! Recognition Stream Layer
//!
//! Consumes the backend's push event stream: tagged payloads, the
//! processing state machine with its step table, debounced ingestion into
//! the field registry, and the reconnecting stream client.

pub mod client;
pub mod events;
pub mod ingest;

pub use client::{ReconnectPolicy, StreamError};
pub use events::{PositionalBatch, RawRecognizedItem, StreamEvent};
pub use ingest::StreamIngestion;

/// Lifecycle of one recognition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Initializing,
    Running,
    Complete,
    Error,
}

/// Processing state plus the progress shown in the HUD
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    pub state: ProcessingState,
    /// Percent complete, 0..=100
    pub percent: f32,
    /// Human-readable label for the current step
    pub step_label: String,
}

impl ProgressState {
    /// Whether the render loop should keep redrawing
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            ProcessingState::Initializing | ProcessingState::Running
        )
    }
}

/// Known pipeline steps in execution order, with their fixed progress
/// percentages and labels. Unknown steps map to 0% and a generic label.
const STEP_TABLE: &[(&str, f32, &str)] = &[
    ("received", 10.0, "Document received"),
    ("preprocessing", 25.0, "Preparing document"),
    ("ocr", 50.0, "Recognizing text"),
    ("parsing", 75.0, "Extracting fields"),
    ("finalizing", 90.0, "Finalizing results"),
];

/// Map a symbolic step identifier to its progress percentage and label
pub fn step_progress(step: &str) -> (f32, &'static str) {
    for &(name, percent, label) in STEP_TABLE {
        if name == step {
            return (percent, label);
        }
    }
    (0.0, "Processing")
}
