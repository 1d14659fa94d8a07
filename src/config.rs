use std::path::PathBuf;
use std::time::Duration;

use crate::resolution::Resolution;
use crate::video::record::{Container, VideoEncoder};
use crate::video::snapshot::SnapshotFormat;

/// Runtime tunables. Built from defaults at startup; the output fields are
/// edited live from the viewer's settings area.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window_size: [f32; 2],
    pub min_window_size: [f32; 2],
    /// How far back the FPS overlay looks.
    pub fps_window: Duration,
    pub record_fps: u32,
    pub encoder: VideoEncoder,
    pub container: Container,
    pub snapshot_format: SnapshotFormat,
    pub output_dir: PathBuf,
    /// Upper bound on device indices scanned when the device monitor finds nothing.
    pub device_scan_limit: usize,
    pub resolution: Resolution,
    pub enable_4k: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_size: [1280.0, 720.0],
            min_window_size: [640.0, 480.0],
            fps_window: Duration::from_secs(5),
            record_fps: 30,
            encoder: VideoEncoder::Mpeg4,
            container: Container::Avi,
            snapshot_format: SnapshotFormat::Png,
            output_dir: default_output_dir(),
            device_scan_limit: 10,
            resolution: Resolution::default(),
            enable_4k: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_recorder() {
        let config = AppConfig::default();
        assert_eq!(config.record_fps, 30);
        assert_eq!(config.container, Container::Avi);
        assert_eq!(config.encoder, VideoEncoder::Mpeg4);
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert_eq!(config.fps_window, Duration::from_secs(5));
        assert_eq!(config.device_scan_limit, 10);
    }
}
