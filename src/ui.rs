mod launcher;
mod viewer;

use eframe::egui;

use crate::config::AppConfig;
use crate::video::{CaptureCommand, CaptureHandle};
use viewer::{Viewer, ViewerAction};

enum Screen {
    Launcher,
    Viewer(Viewer),
}

pub struct CameraApp {
    config: AppConfig,
    capture: CaptureHandle,
    screen: Screen,
}

impl CameraApp {
    pub fn new(config: AppConfig, ctx: egui::Context) -> Self {
        let capture = CaptureHandle::spawn(config.fps_window, ctx);
        Self {
            config,
            capture,
            screen: Screen::Launcher,
        }
    }
}

impl eframe::App for CameraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match &mut self.screen {
            Screen::Launcher => {
                if launcher::show(ctx) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(true));
                    self.screen = Screen::Viewer(Viewer::open(&self.config, &self.capture));
                }
            }
            Screen::Viewer(viewer) => {
                if let ViewerAction::BackToHome = viewer.show(ctx, &mut self.config, &self.capture) {
                    self.capture.send(CaptureCommand::Close);
                    self.screen = Screen::Launcher;
                }
            }
        }
    }
}

/// A small caption over a large value, used for the top bar readouts.
fn param_widget(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.vertical(|ui| {
        ui.label(
            egui::RichText::new(label)
                .size(10.0)
                .color(egui::Color32::LIGHT_GRAY),
        );
        ui.label(
            egui::RichText::new(value)
                .size(16.0)
                .strong()
                .color(egui::Color32::WHITE),
        );
    });
}
