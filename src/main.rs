mod config;
mod devices;
mod error;
mod fps;
mod layout;
mod resolution;
mod ui;
mod video;

use eframe::egui;
use tracing_subscriber::EnvFilter;

use config::AppConfig;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. GStreamer must be up before any device is touched
    if let Err(e) = gstreamer::init() {
        tracing::error!("GStreamer init failed: {e}");
        return Err(eframe::Error::AppCreation(Box::new(e)));
    }

    let config = AppConfig::default();
    tracing::info!(output_dir = %config.output_dir.display(), "starting SmartTerminal");

    // 2. window
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size(config.min_window_size),
        ..Default::default()
    };

    // 3. the capture controller is spawned by the app and shut down when it drops
    eframe::run_native(
        "SmartTerminal",
        options,
        Box::new(move |cc| {
            // SVG support for the launcher logo
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(ui::CameraApp::new(config, cc.egui_ctx.clone())))
        }),
    )
}
