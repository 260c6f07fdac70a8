//! Render Engine
//!
//! Composites one frame of the overlay: the document bitmap, a sinusoidal
//! scanning sweep while recognition runs, the field rectangles with badges,
//! and the progress HUD. Completion and error states each get a single
//! banner instead. Scheduling is cooperative: the app requests a repaint
//! while [`loop_active`](RenderEngine::loop_active) holds, and stops when
//! the session settles.

use std::time::{Duration, Instant};

use egui::{Align2, Color32, FontId, Rounding, Stroke};

use crate::fields::Field;
use crate::geometry::CanvasRect;
use crate::state::OverlayContext;
use crate::stream::ProcessingState;

/// User-cyclable confidence filter thresholds, in percent
pub const CONFIDENCE_STEPS: [f32; 4] = [0.0, 50.0, 70.0, 90.0];
/// Character budget for the badge's text preview
const PREVIEW_CHARS: usize = 18;
/// HUD bar height in canvas pixels
const HUD_HEIGHT: f32 = 34.0;

const HUD_BG: Color32 = Color32::from_rgba_premultiplied(18, 18, 26, 230);
const FIELD_STROKE: Color32 = Color32::from_rgb(0, 200, 120);
const FIELD_FILL: Color32 = Color32::from_rgba_premultiplied(0, 60, 36, 40);
const HIGHLIGHT_STROKE: Color32 = Color32::from_rgb(255, 210, 60);
const SCAN_COLOR: Color32 = Color32::from_rgb(80, 180, 255);
const ERROR_BG: Color32 = Color32::from_rgba_premultiplied(70, 16, 16, 240);
const COMPLETE_BG: Color32 = Color32::from_rgba_premultiplied(14, 50, 30, 240);

/// Per-frame overlay compositor
#[derive(Debug)]
pub struct RenderEngine {
    started_at: Instant,
    /// Current confidence filter threshold, percent
    confidence_threshold: f32,
    scan_period: Duration,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(2400))
    }
}

impl RenderEngine {
    pub fn new(scan_period: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            confidence_threshold: CONFIDENCE_STEPS[0],
            scan_period,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Advance the confidence filter to the next step in the cycle.
    /// Only affects which fields are drawn; never mutates the registry.
    pub fn cycle_confidence_filter(&mut self) -> f32 {
        self.confidence_threshold = next_confidence_step(self.confidence_threshold);
        self.confidence_threshold
    }

    /// Whether the cooperative redraw loop should keep scheduling frames
    pub fn loop_active(&self, ctx: &OverlayContext) -> bool {
        ctx.progress.is_active()
    }

    /// Draw one frame into the given painter. `canvas` is the screen-space
    /// rectangle the overlay occupies; all context coordinates are relative
    /// to its top-left corner. `document_texture` is the externally rendered
    /// document bitmap, already uploaded to the GPU.
    pub fn draw(
        &self,
        painter: &egui::Painter,
        ctx: &OverlayContext,
        canvas: egui::Rect,
        document_texture: Option<&egui::TextureHandle>,
        now: Instant,
    ) {
        let origin = canvas.min.to_vec2();

        self.draw_document(painter, ctx, origin, document_texture);

        if ctx.progress.is_active() {
            self.draw_scan_sweep(painter, ctx, origin, now);
        }

        self.draw_fields(painter, ctx, origin);

        match ctx.state() {
            ProcessingState::Initializing | ProcessingState::Running => {
                self.draw_progress_hud(painter, ctx, origin);
            }
            ProcessingState::Complete => self.draw_completion_banner(painter, ctx, origin),
            ProcessingState::Error => self.draw_error_banner(painter, ctx, origin),
            ProcessingState::Idle => {}
        }
    }

    fn draw_document(
        &self,
        painter: &egui::Painter,
        ctx: &OverlayContext,
        origin: egui::Vec2,
        texture: Option<&egui::TextureHandle>,
    ) {
        let vp = &ctx.viewport;
        if !vp.is_placed() {
            return;
        }
        let doc_rect = egui::Rect::from_min_size(
            egui::pos2(vp.offset_x, vp.offset_y) + origin,
            egui::vec2(vp.width, vp.height),
        );
        if let Some(texture) = texture {
            painter.image(
                texture.id(),
                doc_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            painter.rect_filled(doc_rect, Rounding::same(2.0), Color32::from_gray(235));
        }
        painter.rect_stroke(
            doc_rect,
            Rounding::same(2.0),
            Stroke::new(1.0, Color32::from_gray(70)),
        );
    }

    /// Vertical scan line sweeping the document height. The position is a
    /// function of the period phase, not of how many frames have elapsed.
    fn draw_scan_sweep(
        &self,
        painter: &egui::Painter,
        ctx: &OverlayContext,
        origin: egui::Vec2,
        now: Instant,
    ) {
        let vp = &ctx.viewport;
        if !vp.is_placed() {
            return;
        }
        let phase = scan_phase(now.saturating_duration_since(self.started_at), self.scan_period);
        let y = vp.offset_y + scan_offset(phase) * vp.height;

        painter.line_segment(
            [
                egui::pos2(vp.offset_x, y) + origin,
                egui::pos2(vp.offset_x + vp.width, y) + origin,
            ],
            Stroke::new(2.0, SCAN_COLOR),
        );
        // Soft trail above the line
        let trail = egui::Rect::from_min_size(
            egui::pos2(vp.offset_x, (y - 14.0).max(vp.offset_y)) + origin,
            egui::vec2(vp.width, (y - vp.offset_y).min(14.0).max(0.0)),
        );
        painter.rect_filled(
            trail,
            Rounding::ZERO,
            Color32::from_rgba_premultiplied(20, 45, 64, 36),
        );
    }

    fn draw_fields(&self, painter: &egui::Painter, ctx: &OverlayContext, origin: egui::Vec2) {
        let threshold = self.confidence_threshold / 100.0;
        for (index, field) in ctx.registry.filter_by_confidence(threshold) {
            self.draw_field(painter, index, field, origin);
        }
    }

    fn draw_field(&self, painter: &egui::Painter, index: usize, field: &Field, origin: egui::Vec2) {
        let rect = to_egui_rect(&field.rect).translate(origin);

        let stroke_color = if field.is_highlighted {
            HIGHLIGHT_STROKE
        } else {
            FIELD_STROKE
        };

        painter.rect_filled(rect, Rounding::same(2.0), FIELD_FILL);
        painter.rect_stroke(rect, Rounding::same(2.0), Stroke::new(1.5, stroke_color));

        // Arrival glow, fading out over the animation window
        if field.is_new {
            let alpha = (glow_alpha(field.animation_phase) * 255.0) as u8;
            let glow = Color32::from_rgba_unmultiplied(120, 255, 180, alpha);
            painter.rect_stroke(
                to_egui_rect(&field.rect.expanded(3.0)).translate(origin),
                Rounding::same(3.0),
                Stroke::new(2.5, glow),
            );
        }

        // Index badge
        let badge_center = rect.left_top() + egui::vec2(-2.0, -2.0);
        painter.circle_filled(badge_center, 8.0, stroke_color);
        painter.text(
            badge_center,
            Align2::CENTER_CENTER,
            format!("{}", index + 1),
            FontId::proportional(10.0),
            Color32::BLACK,
        );

        // Confidence and preview above the box
        let label = format!(
            "{}%  {}",
            (field.confidence * 100.0).round() as u32,
            truncate_preview(&field.value, PREVIEW_CHARS)
        );
        painter.text(
            rect.left_top() + egui::vec2(12.0, -4.0),
            Align2::LEFT_BOTTOM,
            label,
            FontId::proportional(11.0),
            stroke_color,
        );
    }

    fn draw_progress_hud(&self, painter: &egui::Painter, ctx: &OverlayContext, origin: egui::Vec2) {
        let vp = &ctx.viewport;
        let hud = egui::Rect::from_min_size(
            egui::pos2(0.0, 0.0) + origin,
            egui::vec2(vp.canvas_width.max(1.0), HUD_HEIGHT),
        );
        painter.rect_filled(hud, Rounding::ZERO, HUD_BG);

        painter.text(
            egui::pos2(12.0, HUD_HEIGHT / 2.0) + origin,
            Align2::LEFT_CENTER,
            &ctx.progress.step_label,
            FontId::proportional(13.0),
            Color32::WHITE,
        );

        // Progress bar on the right
        let bar_width = (vp.canvas_width * 0.3).clamp(80.0, 260.0);
        let bar = egui::Rect::from_min_size(
            egui::pos2(vp.canvas_width - bar_width - 56.0, HUD_HEIGHT / 2.0 - 5.0) + origin,
            egui::vec2(bar_width, 10.0),
        );
        painter.rect_filled(bar, Rounding::same(5.0), Color32::from_gray(55));
        let fill = egui::Rect::from_min_size(
            bar.min,
            egui::vec2(bar_width * (ctx.progress.percent / 100.0).clamp(0.0, 1.0), 10.0),
        );
        painter.rect_filled(fill, Rounding::same(5.0), SCAN_COLOR);
        painter.text(
            egui::pos2(vp.canvas_width - 12.0, HUD_HEIGHT / 2.0) + origin,
            Align2::RIGHT_CENTER,
            format!("{:.0}%", ctx.progress.percent),
            FontId::monospace(12.0),
            Color32::WHITE,
        );
    }

    fn draw_completion_banner(
        &self,
        painter: &egui::Painter,
        ctx: &OverlayContext,
        origin: egui::Vec2,
    ) {
        let stats = ctx.registry.stats();
        let message = format!(
            "\u{2714} Extraction complete: {} fields, avg confidence {:.0}%",
            stats.total,
            ctx.registry.avg_confidence_percent()
        );
        self.draw_banner(painter, ctx, origin, &message, COMPLETE_BG, FIELD_STROKE);
    }

    fn draw_error_banner(&self, painter: &egui::Painter, ctx: &OverlayContext, origin: egui::Vec2) {
        let message = format!("\u{26a0} {}", ctx.progress.step_label);
        self.draw_banner(
            painter,
            ctx,
            origin,
            &message,
            ERROR_BG,
            Color32::from_rgb(255, 120, 120),
        );
    }

    fn draw_banner(
        &self,
        painter: &egui::Painter,
        ctx: &OverlayContext,
        origin: egui::Vec2,
        message: &str,
        bg: Color32,
        fg: Color32,
    ) {
        let vp = &ctx.viewport;
        let banner = egui::Rect::from_min_size(
            egui::pos2(0.0, 0.0) + origin,
            egui::vec2(vp.canvas_width.max(1.0), HUD_HEIGHT),
        );
        painter.rect_filled(banner, Rounding::ZERO, bg);
        painter.text(
            banner.center(),
            Align2::CENTER_CENTER,
            message,
            FontId::proportional(13.0),
            fg,
        );
    }
}

/// Phase within the scan period, 0.0..1.0
pub fn scan_phase(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f32() / period.as_secs_f32()).fract()
}

/// Sinusoidal vertical offset for a phase: 0 at the top, 1 at the bottom,
/// easing at both ends of the sweep
pub fn scan_offset(phase: f32) -> f32 {
    0.5 - 0.5 * (phase * std::f32::consts::TAU).cos()
}

/// Glow strength for a new field, fading out as the phase advances
pub fn glow_alpha(animation_phase: f32) -> f32 {
    (1.0 - animation_phase).clamp(0.0, 1.0)
}

/// Next threshold in the {0, 50, 70, 90} cycle
pub fn next_confidence_step(current: f32) -> f32 {
    let position = CONFIDENCE_STEPS
        .iter()
        .position(|&step| (step - current).abs() < 0.001)
        .unwrap_or(CONFIDENCE_STEPS.len() - 1);
    CONFIDENCE_STEPS[(position + 1) % CONFIDENCE_STEPS.len()]
}

/// Shorten a value for the badge, appending an ellipsis when cut
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}\u{2026}", cut)
    }
}

fn to_egui_rect(rect: &CanvasRect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.x, rect.y),
        egui::vec2(rect.width, rect.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ProgressState;

    #[test]
    fn test_scan_phase_wraps() {
        let period = Duration::from_millis(2000);
        assert!((scan_phase(Duration::from_millis(500), period) - 0.25).abs() < 0.001);
        assert!((scan_phase(Duration::from_millis(2500), period) - 0.25).abs() < 0.001);
        assert!(scan_phase(Duration::ZERO, period).abs() < 0.001);
    }

    #[test]
    fn test_scan_offset_covers_document_height() {
        assert!(scan_offset(0.0).abs() < 0.001);
        assert!((scan_offset(0.5) - 1.0).abs() < 0.001);
        for phase in [0.1, 0.3, 0.7, 0.9] {
            let offset = scan_offset(phase);
            assert!((0.0..=1.0).contains(&offset));
        }
    }

    #[test]
    fn test_confidence_cycle() {
        assert_eq!(next_confidence_step(0.0), 50.0);
        assert_eq!(next_confidence_step(50.0), 70.0);
        assert_eq!(next_confidence_step(70.0), 90.0);
        assert_eq!(next_confidence_step(90.0), 0.0);
        // Unknown value resets the cycle
        assert_eq!(next_confidence_step(33.0), 0.0);
    }

    #[test]
    fn test_cycle_does_not_touch_registry() {
        let mut engine = RenderEngine::default();
        let ctx = OverlayContext::new();
        let before = ctx.registry.len();
        engine.cycle_confidence_filter();
        assert_eq!(ctx.registry.len(), before);
        assert_eq!(engine.confidence_threshold(), 50.0);
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short", 18), "short");
        let long = "a very long recognized invoice value";
        let cut = truncate_preview(long, 18);
        assert_eq!(cut.chars().count(), 18);
        assert!(cut.ends_with('\u{2026}'));
    }

    #[test]
    fn test_glow_fades_out() {
        assert!((glow_alpha(0.0) - 1.0).abs() < 0.001);
        assert!(glow_alpha(1.0).abs() < 0.001);
        assert!(glow_alpha(0.25) > glow_alpha(0.75));
    }

    #[test]
    fn test_loop_stops_when_settled() {
        let engine = RenderEngine::default();
        let mut ctx = OverlayContext::new();
        assert!(!engine.loop_active(&ctx));
        ctx.progress = ProgressState {
            state: ProcessingState::Running,
            percent: 50.0,
            step_label: String::new(),
        };
        assert!(engine.loop_active(&ctx));
        ctx.progress.state = ProcessingState::Complete;
        assert!(!engine.loop_active(&ctx));
    }
}
