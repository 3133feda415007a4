// src/gui.rs
use eframe::egui;
use egui::{Color32, Pos2, Rect, Rounding, Stroke, Vec2};
use egui_plot::{Line, Plot, PlotPoints};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::Context;
use crate::drivers::{Color, Display, FrameBuffer};
use crate::types::*;

const SCALE: f32 = 2.0;
const MAX_LOG_LINES: usize = 8;
const MAX_BPM_POINTS: usize = 600;

fn to_color32(c: Color) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

/// Window standing in for the board: screen, three buttons, log and BPM trend.
pub struct BoardApp {
    rx: Receiver<DeviceMessage>,
    tx_cmd: Sender<DeviceCommand>,
    running: Arc<AtomicBool>,

    // board state
    frame: Option<FrameBuffer>,
    texture: Option<egui::TextureHandle>,
    texture_revision: Option<u64>,
    state: MenuState,
    storage_ok: bool,
    sent_levels: ButtonLevels,

    // heart rate trend
    time: f64,
    bpm_history: Vec<[f64; 2]>,

    log_messages: Vec<String>,
    snapshot_dir: PathBuf,
}

impl BoardApp {
    pub fn new(
        rx: Receiver<DeviceMessage>,
        tx_cmd: Sender<DeviceCommand>,
        running: Arc<AtomicBool>,
        snapshot_dir: PathBuf,
    ) -> Self {
        Self {
            rx,
            tx_cmd,
            running,
            frame: None,
            texture: None,
            texture_revision: None,
            state: MenuState::MainMenu,
            storage_ok: false,
            sent_levels: ButtonLevels::default(),
            time: 0.0,
            bpm_history: Vec::new(),
            log_messages: vec!["CardioStick board emulator.".to_owned()],
            snapshot_dir,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn save_snapshot(&self) -> anyhow::Result<PathBuf> {
        let frame = self.frame.as_ref().context("no frame received yet")?;
        let png = frame.encode_png()?;
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        std::fs::create_dir_all(&self.snapshot_dir)
            .with_context(|| format!("failed to create {}", self.snapshot_dir.display()))?;
        let path = self.snapshot_dir.join(format!("screen_{stamp}.png"));
        std::fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    // Raster as a texture, text layer on top with a real font
    fn draw_screen(&mut self, ui: &mut egui::Ui) {
        let Some(frame) = &self.frame else {
            ui.label("Waiting for the first frame...");
            return;
        };
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        if self.texture_revision != Some(frame.revision()) {
            let image = egui::ColorImage::from_rgb([w, h], &frame.to_rgb_bytes());
            match &mut self.texture {
                Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                None => {
                    self.texture =
                        Some(ui.ctx().load_texture("board_screen", image, egui::TextureOptions::NEAREST));
                }
            }
            self.texture_revision = Some(frame.revision());
        }
        let size = Vec2::new(w as f32 * SCALE, h as f32 * SCALE);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;
        if let Some(texture) = &self.texture {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }
        for span in frame.texts() {
            let pos = rect.min + Vec2::new(span.x as f32, span.y as f32) * SCALE;
            painter.text(
                pos,
                egui::Align2::LEFT_TOP,
                &span.text,
                egui::FontId::monospace(8.0 * span.style.size as f32 * SCALE),
                to_color32(span.style.color),
            );
        }
        painter.rect_stroke(rect, Rounding::same(2.0), Stroke::new(1.0, Color32::from_rgb(60, 60, 60)));
    }

    // Held while the pointer is down on it
    fn draw_buttons(&mut self, ui: &mut egui::Ui) -> ButtonLevels {
        let mut levels = ButtonLevels::default();
        ui.horizontal(|ui| {
            for (button, label) in [
                (Button::Previous, "▲ PREV"),
                (Button::Select, "● SELECT"),
                (Button::Next, "▼ NEXT"),
            ] {
                let held = self.sent_levels.is_down(button);
                let fill = if held { Color32::DARK_GREEN } else { Color32::from_rgb(40, 40, 40) };
                let response = ui.add(
                    egui::Button::new(egui::RichText::new(label).color(Color32::WHITE))
                        .fill(fill)
                        .min_size(Vec2::new(110.0, 36.0)),
                );
                if response.is_pointer_button_down_on() {
                    levels = levels.with(button, true);
                }
            }
        });
        levels
    }
}

impl eframe::App for BoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. engine messages
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                DeviceMessage::Log(s) => self.log(&s),
                DeviceMessage::Frame(fb) => self.frame = Some(fb),
                DeviceMessage::State(s) => {
                    if s == MenuState::Measuring && self.state != MenuState::Measuring {
                        self.bpm_history.clear();
                        self.time = 0.0;
                    }
                    self.state = s;
                }
                DeviceMessage::StorageStatus(ok) => self.storage_ok = ok,
                DeviceMessage::Bpm(bpm) => {
                    self.time += 0.25;
                    self.bpm_history.push([self.time, bpm]);
                    if self.bpm_history.len() > MAX_BPM_POINTS {
                        self.bpm_history.remove(0);
                    }
                }
            }
        }

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        let mut levels = ButtonLevels::default();
        egui::SidePanel::left("L").min_width(260.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("CardioStick");
            ui.label("3-lead ECG board emulator");
            ui.separator();

            let (txt, col) = if self.storage_ok {
                ("Storage: mounted", Color32::GREEN)
            } else {
                ("Storage: missing", Color32::RED)
            };
            ui.label(egui::RichText::new(txt).color(col));
            ui.label(format!("State: {:?}", self.state));
            ui.add_space(10.0);

            if ui.button("📷 SNAPSHOT").clicked() {
                match self.save_snapshot() {
                    Ok(path) => self.log(&format!("Snapshot saved to {}", path.display())),
                    Err(err) => self.log(&format!("Snapshot failed: {err:#}")),
                }
            }

            ui.add_space(10.0);
            ui.label("Keys: ↑ previous, ↓ next, Enter select");
            ui.separator();
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_screen(ui);
            ui.add_space(8.0);
            levels = self.draw_buttons(ui);
            ui.add_space(8.0);

            let latest = self.bpm_history.last().map(|p| p[1]).unwrap_or(0.0);
            ui.label(format!("Heart rate: {:.0} BPM", latest));
            Plot::new("bpm_plot")
                .height(160.0)
                .include_y(0.0)
                .include_y(180.0)
                .auto_bounds_x()
                .show(ui, |plot_ui| {
                    if !self.bpm_history.is_empty() {
                        plot_ui.line(
                            Line::new(PlotPoints::new(self.bpm_history.clone()))
                                .name("BPM")
                                .color(Color32::from_rgb(0, 255, 120)),
                        );
                    }
                });
        });

        // 2. keyboard mirrors the buttons
        ctx.input(|i| {
            if i.key_down(egui::Key::ArrowUp) {
                levels = levels.with(Button::Previous, true);
            }
            if i.key_down(egui::Key::ArrowDown) {
                levels = levels.with(Button::Next, true);
            }
            if i.key_down(egui::Key::Enter) {
                levels = levels.with(Button::Select, true);
            }
        });
        if levels != self.sent_levels {
            self.tx_cmd.send(DeviceCommand::Buttons(levels)).ok();
            self.sent_levels = levels;
        }

        if self.running.load(Ordering::Relaxed) {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        }
    }
}

impl Drop for BoardApp {
    fn drop(&mut self) {
        self.tx_cmd.send(DeviceCommand::Shutdown).ok();
        self.running.store(false, Ordering::Relaxed);
    }
}
