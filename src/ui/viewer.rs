use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use eframe::egui;

use super::param_widget;
use crate::config::AppConfig;
use crate::devices::{self, CameraDevice};
use crate::layout;
use crate::resolution::{self, Resolution};
use crate::video::record::{Container, RecordSettings, VideoEncoder};
use crate::video::snapshot::SnapshotFormat;
use crate::video::{self, CaptureCommand, CaptureHandle, CaptureStatus};

pub(super) enum ViewerAction {
    None,
    BackToHome,
}

/// The live camera screen: preview, device/resolution selectors and the
/// record/snapshot controls.
pub(super) struct Viewer {
    /// Index into the device list the controller last published.
    selected: usize,
    resolutions: Vec<Resolution>,
    resolution: Resolution,
    enable_4k: bool,
    output_dir: String,
    texture: Option<egui::TextureHandle>,
    frame_size: [usize; 2],
    last_sequence: Option<u64>,
}

impl Viewer {
    /// Asks the controller to find the cameras and open the first one.
    pub fn open(config: &AppConfig, capture: &CaptureHandle) -> Self {
        let resolutions = resolution::available(config.enable_4k);
        let resolution = resolution::reselect(config.resolution, &resolutions);

        capture.send(CaptureCommand::Discover {
            scan_limit: config.device_scan_limit,
            resolution,
        });

        Self {
            selected: 0,
            resolutions,
            resolution,
            enable_4k: config.enable_4k,
            output_dir: config.output_dir.display().to_string(),
            texture: None,
            frame_size: [0, 0],
            last_sequence: None,
        }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        config: &mut AppConfig,
        capture: &CaptureHandle,
    ) -> ViewerAction {
        let status = capture.status();
        let fps = capture.frames().lock().fps();
        self.upload_frame(ctx, capture);

        let recording = status.recording.is_some();
        let mut action = ViewerAction::None;
        let mut reopen = false;

        if !ctx.wants_keyboard_input() {
            let (toggle, snap) =
                ctx.input(|i| (i.key_pressed(egui::Key::R), i.key_pressed(egui::Key::S)));
            if toggle {
                self.toggle_recording(config, capture, recording);
            }
            if snap {
                self.take_snapshot(config, capture);
            }
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Back to Home").clicked() {
                    action = ViewerAction::BackToHome;
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if recording {
                        ui.label(
                            egui::RichText::new("● REC")
                                .color(egui::Color32::RED)
                                .strong(),
                        );
                    } else if status.device.is_some() {
                        ui.label(
                            egui::RichText::new("● LIVE")
                                .color(egui::Color32::GREEN)
                                .strong(),
                        );
                    }
                    ui.add_space(20.0);
                    param_widget(ui, "FPS", &format!("{fps:.1}"));
                    ui.add_space(20.0);
                    param_widget(ui, "RESOLUTION", &self.resolution.to_string());
                });
            });
        });

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                reopen |= self.camera_selector(ui, &status);
                reopen |= self.resolution_selector(ui);
                if ui.checkbox(&mut self.enable_4k, "Enable 4K").changed() {
                    config.enable_4k = self.enable_4k;
                    reopen |= self.rebuild_resolutions();
                }

                let label = if recording { "Stop Recording" } else { "Start Recording" };
                if ui.button(label).clicked() {
                    self.toggle_recording(config, capture, recording);
                }
                if ui.button("Take Snapshot").clicked() {
                    self.take_snapshot(config, capture);
                }
            });
            ui.collapsing("Output", |ui| self.output_settings(ui, config));
            ui.label(egui::RichText::new(status_line(&status)).weak());
            ui.add_space(4.0);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let area = ui.max_rect();
                match &self.texture {
                    Some(texture) => {
                        let rect = layout::fit_rect(self.frame_size, area);
                        ui.painter().image(
                            texture.id(),
                            rect,
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                        ui.painter().text(
                            rect.left_top() + egui::vec2(10.0, 10.0),
                            egui::Align2::LEFT_TOP,
                            format!("FPS: {fps:.1}"),
                            egui::FontId::proportional(18.0),
                            egui::Color32::WHITE,
                        );
                    }
                    None => {
                        ui.painter().text(
                            area.center(),
                            egui::Align2::CENTER_CENTER,
                            "Waiting for camera…",
                            egui::FontId::proportional(20.0),
                            egui::Color32::GRAY,
                        );
                    }
                }
            });

        if reopen {
            config.resolution = self.resolution;
            self.request_open(capture, &status.devices);
        }

        // frames repaint on arrival; this keeps the status line fresh
        ctx.request_repaint_after(Duration::from_millis(250));
        action
    }

    /// Swaps the camera or resolution: the controller releases the current
    /// device before opening the new one.
    fn request_open(&self, capture: &CaptureHandle, devices: &[CameraDevice]) {
        capture.send(CaptureCommand::Open {
            device: devices.get(self.selected).cloned(),
            resolution: self.resolution,
        });
    }

    fn upload_frame(&mut self, ctx: &egui::Context, capture: &CaptureHandle) {
        let Some(frame) = capture.frames().lock().latest() else {
            return;
        };
        if self.last_sequence == Some(frame.sequence) {
            return;
        }

        let image = egui::ColorImage::from_rgba_unmultiplied(frame.size(), &frame.rgba);
        if let Some(texture) = &mut self.texture {
            texture.set(image, egui::TextureOptions::LINEAR);
        } else {
            self.texture = Some(ctx.load_texture("cam_frame", image, egui::TextureOptions::LINEAR));
        }
        self.frame_size = frame.size();
        self.last_sequence = Some(frame.sequence);
    }

    fn camera_selector(&mut self, ui: &mut egui::Ui, status: &CaptureStatus) -> bool {
        let before = self.selected;
        let current = match status.devices.get(self.selected) {
            Some(device) => device.name.as_str(),
            None if status.discovering => "Searching…",
            None => devices::NO_CAMERAS,
        };

        egui::ComboBox::from_id_salt("camera")
            .selected_text(current)
            .show_ui(ui, |ui| {
                if status.devices.is_empty() {
                    ui.label(devices::NO_CAMERAS);
                }
                for (index, device) in status.devices.iter().enumerate() {
                    ui.selectable_value(&mut self.selected, index, device.name.as_str());
                }
            });

        self.selected != before
    }

    fn resolution_selector(&mut self, ui: &mut egui::Ui) -> bool {
        let before = self.resolution;

        egui::ComboBox::from_id_salt("resolution")
            .selected_text(self.resolution.to_string())
            .show_ui(ui, |ui| {
                for res in &self.resolutions {
                    ui.selectable_value(&mut self.resolution, *res, res.to_string());
                }
            });

        self.resolution != before
    }

    /// Rebuilds the list after the 4K toggle. True when the selection moved.
    fn rebuild_resolutions(&mut self) -> bool {
        self.resolutions = resolution::available(self.enable_4k);
        let next = resolution::reselect(self.resolution, &self.resolutions);
        let moved = next != self.resolution;
        self.resolution = next;
        moved
    }

    fn output_settings(&mut self, ui: &mut egui::Ui, config: &mut AppConfig) {
        egui::Grid::new("output_settings")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("Folder");
                if ui.text_edit_singleline(&mut self.output_dir).changed() {
                    config.output_dir = PathBuf::from(self.output_dir.trim());
                }
                ui.end_row();

                ui.label("Encoder");
                egui::ComboBox::from_id_salt("encoder")
                    .selected_text(config.encoder.label())
                    .show_ui(ui, |ui| {
                        for encoder in VideoEncoder::ALL {
                            ui.selectable_value(&mut config.encoder, encoder, encoder.label());
                        }
                    });
                ui.end_row();

                ui.label("Container");
                egui::ComboBox::from_id_salt("container")
                    .selected_text(config.container.label())
                    .show_ui(ui, |ui| {
                        for container in Container::ALL {
                            ui.selectable_value(&mut config.container, container, container.label());
                        }
                    });
                ui.end_row();

                ui.label("Frame rate");
                ui.add(egui::DragValue::new(&mut config.record_fps).range(1..=120).suffix(" fps"));
                ui.end_row();

                ui.label("Snapshot");
                egui::ComboBox::from_id_salt("snapshot_format")
                    .selected_text(config.snapshot_format.label())
                    .show_ui(ui, |ui| {
                        for format in SnapshotFormat::ALL {
                            ui.selectable_value(&mut config.snapshot_format, format, format.label());
                        }
                    });
                ui.end_row();
            });
    }

    fn toggle_recording(&self, config: &AppConfig, capture: &CaptureHandle, recording: bool) {
        if recording {
            capture.send(CaptureCommand::StopRecording);
            return;
        }

        let path = video::output_path(
            &config.output_dir,
            "recording",
            config.container.extension(),
            Local::now().naive_local(),
        );
        capture.send(CaptureCommand::StartRecording(RecordSettings {
            resolution: self.resolution,
            encoder: config.encoder,
            container: config.container,
            fps: config.record_fps,
            path,
        }));
    }

    fn take_snapshot(&self, config: &AppConfig, capture: &CaptureHandle) {
        let path = video::output_path(
            &config.output_dir,
            "snapshot",
            config.snapshot_format.extension(),
            Local::now().naive_local(),
        );
        capture.send(CaptureCommand::Snapshot(path));
    }
}

fn status_line(status: &CaptureStatus) -> String {
    let device = match (&status.device, status.resolution) {
        (Some(name), Some(res)) => format!("{name} @ {res}"),
        (Some(name), None) => name.clone(),
        (None, _) => "No camera open".to_string(),
    };
    match &status.message {
        Some(message) => format!("{device} | {message}"),
        None => device,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_names_camera_and_resolution() {
        let status = CaptureStatus {
            device: Some("HD Pro Webcam C920".into()),
            resolution: Some(Resolution::new(1280, 720)),
            ..Default::default()
        };
        assert_eq!(status_line(&status), "HD Pro Webcam C920 @ 1280x720");
    }

    #[test]
    fn status_line_appends_messages() {
        let status = CaptureStatus {
            message: Some("no frame captured yet".into()),
            ..Default::default()
        };
        assert_eq!(status_line(&status), "No camera open | no frame captured yet");
    }
}
