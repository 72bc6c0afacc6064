//! Magic Verdict widget — egui/eframe application.
//!
//! # Architecture
//!
//! [`MagicVerdictApp`] is the top-level [`eframe::App`].  It owns no session
//! state of its own:
//!
//! * `shared`    — the [`SharedSnapshot`] the session runner publishes after
//!   every transition; copied out once per frame.
//! * `intent_tx` — sends [`Intent`]s (start, stop, file, retry, language) to
//!   the runner.  Sends are non-blocking; a full channel drops the click.
//!
//! # Layout
//!
//! | Phase | Stage area |
//! |-------|------------|
//! | `Idle` | Camera status, or the verdict card once one is revealed |
//! | `Countdown` | Large countdown digit |
//! | `Recording` | Red REC indicator |
//! | `Uploading` | Upload progress bar |
//! | `Analyzing` | Analysis progress bar + spinner |

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::analysis::{AnalysisResult, Verdict};
use crate::i18n::{label, Label, Language};
use crate::media::expand_path;
use crate::session::{read_snapshot, CameraStatus, Intent, Phase, SessionSnapshot, SharedSnapshot};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(168, 85, 247);
const CAUGHT: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);
const FOOLED: egui::Color32 = egui::Color32::from_rgb(34, 197, 94);
const WARN: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const DIM: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

/// System fonts that cover Chinese, tried in order.
const CJK_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

// ---------------------------------------------------------------------------
// MagicVerdictApp
// ---------------------------------------------------------------------------

/// eframe application — the capture / verdict widget.
pub struct MagicVerdictApp {
    shared: SharedSnapshot,
    intent_tx: mpsc::Sender<Intent>,
    /// Contents of the file path field.
    path_input: String,
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,
}

impl MagicVerdictApp {
    pub fn new(shared: SharedSnapshot, intent_tx: mpsc::Sender<Intent>) -> Self {
        Self {
            shared,
            intent_tx,
            path_input: String::new(),
            spinner_phase: 0.0,
        }
    }

    /// Register the first available system CJK font as a fallback so the
    /// Chinese strings render.  Without one, egui shows placeholder glyphs.
    pub fn install_fonts(ctx: &egui::Context) {
        let Some((path, bytes)) = CJK_FONT_CANDIDATES
            .iter()
            .find_map(|p| std::fs::read(p).ok().map(|b| (*p, b)))
        else {
            log::warn!("ui: no CJK system font found; Chinese text may not render");
            return;
        };
        log::info!("ui: using CJK font {path}");

        let mut fonts = egui::FontDefinitions::default();
        fonts
            .font_data
            .insert("cjk".into(), Arc::new(egui::FontData::from_owned(bytes)));
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts.families.entry(family).or_default().push("cjk".into());
        }
        ctx.set_fonts(fonts);
    }

    fn send(&self, intent: Intent) {
        if let Err(e) = self.intent_tx.try_send(intent) {
            log::warn!("ui: dropped intent: {e}");
        }
    }

    // ── Sections ─────────────────────────────────────────────────────────

    fn draw_header(&self, ui: &mut egui::Ui, snap: &SessionSnapshot) {
        let lang = snap.language;
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(label(lang, Label::Title))
                    .color(ACCENT)
                    .strong()
                    .size(20.0),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(label(lang, Label::SwitchLanguage)).clicked() {
                    self.send(Intent::SetLanguage(lang.toggled()));
                }
            });
        });
        ui.label(egui::RichText::new(label(lang, Label::Tagline)).color(DIM));
    }

    /// The area where the camera preview would sit.
    fn draw_stage(&self, ui: &mut egui::Ui, snap: &SessionSnapshot) {
        let lang = snap.language;
        egui::Frame::new()
            .fill(egui::Color32::from_rgb(20, 20, 24))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(12))
            .show(ui, |ui| {
                ui.set_min_size(egui::vec2(ui.available_width(), 160.0));
                ui.vertical_centered(|ui| match snap.phase {
                    Phase::Countdown { remaining } => {
                        ui.add_space(24.0);
                        ui.label(
                            egui::RichText::new(remaining.to_string())
                                .color(egui::Color32::WHITE)
                                .strong()
                                .size(72.0),
                        );
                    }
                    Phase::Recording { .. } => {
                        ui.add_space(48.0);
                        ui.label(
                            egui::RichText::new(format!("● {}", label(lang, Label::Rec)))
                                .color(CAUGHT)
                                .strong()
                                .size(24.0),
                        );
                    }
                    Phase::Uploading => {
                        ui.add_space(48.0);
                        ui.label(label(lang, Label::Uploading));
                        ui.add(
                            egui::ProgressBar::new(f32::from(snap.upload_progress) / 100.0)
                                .show_percentage(),
                        );
                    }
                    Phase::Analyzing { .. } => {
                        ui.add_space(48.0);
                        ui.label(format!(
                            "{} {}",
                            self.spinner_char(),
                            label(lang, Label::Analyzing)
                        ));
                        ui.add(
                            egui::ProgressBar::new(snap.analysis_progress / 100.0)
                                .fill(ACCENT)
                                .show_percentage(),
                        );
                    }
                    Phase::Idle => match &snap.outcome {
                        Some(result) => self.draw_verdict(ui, lang, result),
                        None => self.draw_camera_status(ui, snap),
                    },
                });
            });
    }

    fn draw_camera_status(&self, ui: &mut egui::Ui, snap: &SessionSnapshot) {
        ui.add_space(48.0);
        match &snap.camera {
            CameraStatus::Initializing => {
                ui.label(format!("{} {}", self.spinner_char(), snap.instructions()));
            }
            CameraStatus::Ready => {
                ui.label(egui::RichText::new("◉").color(FOOLED).size(28.0));
            }
            CameraStatus::Failed(_) => {
                ui.label(egui::RichText::new("✖").color(WARN).size(28.0));
                if ui.button(label(snap.language, Label::RetryCamera)).clicked() {
                    self.send(Intent::RetryCamera);
                }
            }
        }
    }

    fn draw_verdict(&self, ui: &mut egui::Ui, lang: Language, result: &AnalysisResult) {
        let (title, subtitle, color) = match result.verdict {
            Verdict::Caught => (Label::Caught, Label::CaughtSubtitle, CAUGHT),
            Verdict::Fooled => (Label::Fooled, Label::FooledSubtitle, FOOLED),
        };

        ui.label(
            egui::RichText::new(label(lang, title))
                .color(color)
                .strong()
                .size(28.0),
        );
        ui.label(label(lang, subtitle));
        ui.label(format!(
            "{} {}%",
            label(lang, Label::Confidence),
            result.confidence_percent()
        ));

        if !result.timestamps.is_empty() {
            ui.add_space(6.0);
            let stamps = result
                .timestamps
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("  ");
            ui.label(
                egui::RichText::new(format!("{} {stamps}", label(lang, Label::DetectedAt)))
                    .color(color),
            );
        }

        ui.add_space(6.0);
        ui.label(egui::RichText::new(label(lang, Label::Analysis)).strong());
        egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
            ui.label(result.analysis.as_str());
        });

        ui.add_space(8.0);
        if ui.button(label(lang, Label::TryAgain)).clicked() {
            self.send(Intent::Retry);
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, snap: &SessionSnapshot) {
        let lang = snap.language;

        ui.label(egui::RichText::new(snap.instructions()).color(DIM).italics());
        if let Some(text) = snap.notice_text() {
            ui.label(egui::RichText::new(text).color(WARN));
        }
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            if snap.can_stop() {
                if ui
                    .button(egui::RichText::new(label(lang, Label::Stop)).color(CAUGHT))
                    .clicked()
                {
                    self.send(Intent::Stop);
                }
            } else if ui
                .add_enabled(snap.can_start(), egui::Button::new(label(lang, Label::Start)))
                .clicked()
            {
                self.send(Intent::Start);
            }
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.path_input)
                    .hint_text(label(lang, Label::FileHint))
                    .desired_width(ui.available_width() - 110.0),
            );
            let ready = snap.can_select_file() && !self.path_input.trim().is_empty();
            if ui
                .add_enabled(ready, egui::Button::new(label(lang, Label::AnalyzeFile)))
                .clicked()
            {
                self.send(Intent::SelectPath(expand_path(&self.path_input)));
            }
        });
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        chars[(self.spinner_phase as usize) % chars.len()]
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for MagicVerdictApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snap = read_snapshot(&self.shared);

        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // The runner never wakes the UI, so keep polling the snapshot.
        let interval = if snap.is_busy() || snap.camera == CameraStatus::Initializing {
            Duration::from_millis(33)
        } else {
            Duration::from_millis(250)
        };
        ctx.request_repaint_after(interval);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui, &snap);
            ui.separator();
            self.draw_stage(ui, &snap);
            ui.add_space(8.0);
            self.draw_controls(ui, &snap);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("Magic Verdict widget closing");
    }
}
