//! Viewer application
//!
//! eframe shell around the overlay: polls the event channel once per frame,
//! ticks the debounced ingestion, fits the document into the canvas, and
//! hands the painter to the render engine. Repaints are scheduled only
//! while something is animating; a slow heartbeat keeps the channel polled
//! otherwise.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use eframe::egui;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::export;
use crate::geometry::fit_document;
use crate::hit_test;
use crate::render::RenderEngine;
use crate::state::OverlayContext;
use crate::stream::{StreamEvent, StreamIngestion};

/// How long an export confirmation stays in the toolbar
const FEEDBACK_TTL: Duration = Duration::from_secs(4);

/// Fallback page proportions when no preview bitmap was provided (A4)
const DEFAULT_PAGE: (f32, f32) = (595.0, 842.0);

/// The main viewer application
pub struct ViewerApp {
    overlay: OverlayContext,
    ingestion: StreamIngestion,
    render: RenderEngine,
    /// Events pushed by the stream client thread
    events: Receiver<StreamEvent>,
    animation_window: Duration,
    /// Preview bitmap awaiting GPU upload
    document_image: Option<egui::ColorImage>,
    document_texture: Option<egui::TextureHandle>,
    /// Pixel dimensions the viewport fit is computed against
    page_dims: (f32, f32),
    export_path: PathBuf,
    export_feedback: Option<(String, Instant)>,
}

impl ViewerApp {
    pub fn new(
        config: &AppConfig,
        events: Receiver<StreamEvent>,
        document_image: Option<egui::ColorImage>,
        export_path: PathBuf,
    ) -> Self {
        let page_dims = document_image
            .as_ref()
            .map(|img| (img.size[0] as f32, img.size[1] as f32))
            .unwrap_or(DEFAULT_PAGE);

        Self {
            overlay: OverlayContext::new(),
            ingestion: StreamIngestion::new(Duration::from_millis(config.stream.debounce_ms)),
            render: RenderEngine::new(Duration::from_millis(config.overlay.scan_period_ms)),
            events,
            animation_window: Duration::from_millis(config.overlay.animation_window_ms),
            document_image,
            document_texture: None,
            page_dims,
            export_path,
            export_feedback: None,
        }
    }

    /// Create eframe options for the viewer window
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 800.0])
                .with_min_inner_size([640.0, 480.0])
                .with_title("InvoiceLens"),
            ..Default::default()
        }
    }

    /// Abandon the current session: drop any stashed batch and return the
    /// overlay to idle. Safe to trigger repeatedly; also the manual restart
    /// path out of a parked error state.
    pub fn reset_session(&mut self) {
        info!("Session reset");
        self.ingestion.cancel();
        self.overlay.reset_for_new_document();
    }

    /// Upload the preview bitmap the first time a GPU context is available
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.document_texture.is_none() {
            if let Some(image) = self.document_image.take() {
                self.document_texture =
                    Some(ctx.load_texture("document_preview", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui, now: Instant) {
        ui.horizontal(|ui| {
            ui.heading("InvoiceLens");
            ui.separator();

            let threshold = self.render.confidence_threshold();
            let filter_label = if threshold <= 0.0 {
                "Filter: off".to_string()
            } else {
                format!("Filter: \u{2265}{:.0}%", threshold)
            };
            if ui.button(filter_label).clicked() {
                let next = self.render.cycle_confidence_filter();
                info!("Confidence filter set to {}%", next);
            }

            if ui.button("Reset").clicked() {
                self.reset_session();
            }

            if ui.button("Export JSON").clicked() {
                match export::write_snapshot(&self.overlay, &self.export_path) {
                    Ok(()) => {
                        self.export_feedback =
                            Some((format!("Saved {}", self.export_path.display()), now));
                    }
                    Err(e) => {
                        error!("Export failed: {}", e);
                        self.export_feedback = Some((format!("Export failed: {}", e), now));
                    }
                }
            }

            let expired = self
                .export_feedback
                .as_ref()
                .is_some_and(|(_, shown_at)| now.duration_since(*shown_at) > FEEDBACK_TTL);
            if expired {
                self.export_feedback = None;
            }
            if let Some((message, _)) = &self.export_feedback {
                ui.label(message);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let stats = self.overlay.registry.stats();
                ui.label(format!(
                    "{} fields ({} high-confidence)",
                    stats.total, stats.high_confidence
                ));
            });
        });
    }

    fn draw_field_detail(&mut self, ui: &mut egui::Ui) {
        let mut clear_selection = false;

        if let Some(field) = self.overlay.selected_field() {
            ui.heading(&field.label);
            ui.separator();
            ui.label(&field.value);
            ui.add_space(8.0);
            ui.label(format!("Confidence: {:.0}%", field.confidence * 100.0));
            ui.label(format!(
                "Position: ({:.0}, {:.0})  {:.0}\u{00d7}{:.0}",
                field.rect.x, field.rect.y, field.rect.width, field.rect.height
            ));
            ui.add_space(8.0);
            if ui.button("Clear selection").clicked() {
                clear_selection = true;
            }
        }

        if clear_selection {
            self.overlay.selected = None;
            self.overlay.registry.set_highlighted(None);
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Drain events pushed by the stream thread since the last frame
        while let Ok(event) = self.events.try_recv() {
            self.ingestion.handle_event(event, &mut self.overlay);
        }
        self.ingestion.tick(now, &mut self.overlay);

        let animating = self
            .overlay
            .registry
            .advance_animations(now, self.animation_window);

        self.ensure_texture(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui, now);
        });

        if self.overlay.selected.is_some() {
            egui::SidePanel::right("field_detail")
                .default_width(240.0)
                .show(ctx, |ui| {
                    self.draw_field_detail(ui);
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::click());
                let canvas = response.rect;

                self.overlay.set_viewport(fit_document(
                    canvas.width(),
                    canvas.height(),
                    self.page_dims.0,
                    self.page_dims.1,
                ));

                self.render.draw(
                    &painter,
                    &self.overlay,
                    canvas,
                    self.document_texture.as_ref(),
                    now,
                );

                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let local = pos - canvas.min;
                        hit_test::select_at(&mut self.overlay, local.x, local.y);
                    }
                }
            });

        if self.render.loop_active(&self.overlay) || animating || self.ingestion.has_pending() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            // Settled; keep a slow heartbeat so the channel stays polled
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{PositionalBatch, ProcessingState, RawRecognizedItem};

    fn viewer() -> ViewerApp {
        let (_sender, receiver) = crossbeam_channel::unbounded();
        ViewerApp::new(
            &AppConfig::default(),
            receiver,
            None,
            PathBuf::from("export.json"),
        )
    }

    #[test]
    fn test_reset_returns_overlay_to_idle() {
        let mut app = viewer();
        app.ingestion
            .handle_event(StreamEvent::ProcessingStart {}, &mut app.overlay);
        app.ingestion.handle_event(
            StreamEvent::PositionalData(PositionalBatch {
                grouped_data: vec![vec![RawRecognizedItem {
                    text: "total".to_string(),
                    x: 1.0,
                    y: 1.0,
                    width: None,
                    height: None,
                    confidence: Some(0.9),
                }]],
                image_dimensions: None,
                invoice_details: None,
            }),
            &mut app.overlay,
        );
        assert!(app.ingestion.has_pending());

        app.reset_session();
        app.reset_session();
        assert!(!app.ingestion.has_pending());
        assert!(app.overlay.registry.is_empty());
        assert_eq!(app.overlay.state(), ProcessingState::Idle);
    }
}
