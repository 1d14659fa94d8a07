//! Camera discovery.
//!
//! The GStreamer device monitor is asked first. When it comes back empty the
//! platform fallback runs: on Windows and macOS the `ffmpeg` device listing is
//! parsed, on Linux the `/dev/video*` nodes are scanned.

use gstreamer as gst;
use gstreamer::prelude::*;

use crate::error::{CaptureError, Result};

/// Label shown in the camera selector when nothing was found.
pub const NO_CAMERAS: &str = "No Cameras Found";

#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub index: usize,
    pub name: String,
    /// Set when the device came from the device monitor.
    source: Option<gst::Device>,
}

impl CameraDevice {
    pub fn new(index: usize, name: Option<&str>) -> Self {
        Self {
            index,
            name: display_name(index, name),
            source: None,
        }
    }

    /// Builds the source element feeding the capture pipeline.
    pub fn create_source(&self) -> Result<gst::Element> {
        match &self.source {
            Some(device) => Ok(device.create_element(None)?),
            None => platform_source(self.index),
        }
    }
}

pub fn display_name(index: usize, name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Camera {index}"),
    }
}

/// Lists attached cameras. Never fails: problems are logged and an empty list
/// comes back.
pub fn enumerate(scan_limit: usize) -> Vec<CameraDevice> {
    match from_monitor() {
        Ok(devices) if !devices.is_empty() => {
            tracing::info!("device monitor found {} camera(s)", devices.len());
            return devices;
        }
        Ok(_) => tracing::debug!("device monitor found no cameras"),
        Err(e) => tracing::warn!("device monitor failed: {e}"),
    }

    match fallback(scan_limit) {
        Ok(devices) => {
            tracing::info!("fallback listing found {} camera(s)", devices.len());
            devices
        }
        Err(e) => {
            tracing::warn!("error detecting cameras: {e}");
            Vec::new()
        }
    }
}

fn from_monitor() -> Result<Vec<CameraDevice>> {
    let monitor = gst::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);
    monitor.start()?;

    let devices = monitor
        .devices()
        .into_iter()
        .filter(|device| device.device_class().as_str().contains("Video/Source"))
        .enumerate()
        .map(|(index, device)| CameraDevice {
            index,
            name: display_name(index, Some(device.display_name().as_str())),
            source: Some(device),
        })
        .collect();

    monitor.stop();
    Ok(devices)
}

#[cfg(target_os = "linux")]
fn fallback(scan_limit: usize) -> Result<Vec<CameraDevice>> {
    let devices = (0..scan_limit)
        .filter(|index| std::path::Path::new(&format!("/dev/video{index}")).exists())
        .filter(|index| {
            let node = std::fs::read_to_string(format!("/sys/class/video4linux/video{index}/index"));
            is_capture_node(node.ok().as_deref())
        })
        .map(|index| {
            let name = std::fs::read_to_string(format!("/sys/class/video4linux/video{index}/name")).ok();
            CameraDevice::new(index, name.as_deref())
        })
        .collect();
    Ok(devices)
}

/// UVC cameras expose a second `/dev/video*` node for metadata; only the node
/// with sysfs `index` 0 streams frames. A missing index file counts as capture.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn is_capture_node(index_file: Option<&str>) -> bool {
    index_file.is_none_or(|index| index.trim() == "0")
}

#[cfg(not(target_os = "linux"))]
fn fallback(scan_limit: usize) -> Result<Vec<CameraDevice>> {
    #[cfg(target_os = "macos")]
    const INPUT_FORMAT: &str = "avfoundation";
    #[cfg(not(target_os = "macos"))]
    const INPUT_FORMAT: &str = "dshow";

    let output = std::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-list_devices", "true", "-f", INPUT_FORMAT, "-i", "dummy"])
        .output()?;

    // ffmpeg prints the listing on stderr and exits non-zero on the dummy input
    let listing = String::from_utf8_lossy(&output.stderr);
    Ok(parse_ffmpeg_listing(&listing)
        .iter()
        .take(scan_limit)
        .enumerate()
        .map(|(index, name)| CameraDevice::new(index, Some(name)))
        .collect())
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Unknown,
    Video,
    Audio,
}

/// Extracts video device names from `ffmpeg -list_devices true` output.
///
/// Understands both the sectioned DirectShow/AVFoundation layout and the newer
/// DirectShow layout where each device line ends in `(video)`.
#[cfg_attr(target_os = "linux", allow(dead_code))]
pub fn parse_ffmpeg_listing(listing: &str) -> Vec<String> {
    let mut section = Section::Unknown;
    let mut names = Vec::new();

    for line in listing.lines() {
        let body = strip_log_prefix(line).trim();
        let lower = body.to_ascii_lowercase();

        if lower.contains("video devices") {
            section = Section::Video;
            continue;
        }
        if lower.contains("audio devices") {
            section = Section::Audio;
            continue;
        }
        if lower.starts_with("alternative name") {
            continue;
        }

        if let Some(kind) = trailing_kind(body) {
            if kind.contains("video") {
                if let Some(name) = quoted(body) {
                    names.push(name.to_string());
                }
            }
            continue;
        }

        if section != Section::Video {
            continue;
        }
        if let Some(name) = quoted(body).or_else(|| indexed(body)) {
            names.push(name.to_string());
        }
    }
    names
}

/// Drops the `[dshow @ 0x...]` prefix ffmpeg puts on every log line.
fn strip_log_prefix(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('[') && trimmed.contains(" @ ") {
        if let Some(end) = trimmed.find("] ") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

fn quoted(body: &str) -> Option<&str> {
    let start = body.find('"')? + 1;
    let len = body[start..].find('"')?;
    Some(&body[start..start + len]).filter(|name| !name.is_empty())
}

/// `[0] FaceTime HD Camera` as printed by AVFoundation.
fn indexed(body: &str) -> Option<&str> {
    let rest = body.strip_prefix('[')?;
    let (index, name) = rest.split_once("] ")?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(name.trim()).filter(|name| !name.is_empty())
}

/// The `(video)` / `(audio, video)` tag closing a quoted device line.
fn trailing_kind(body: &str) -> Option<&str> {
    if !body.ends_with(')') || quoted(body).is_none() {
        return None;
    }
    let open = body.rfind('(')?;
    Some(&body[open + 1..body.len() - 1])
}

/// Capture element for a bare device index. Windows uses Media Foundation,
/// which GStreamer ships from 1.18.
fn platform_source_name() -> &'static str {
    if cfg!(target_os = "linux") {
        "v4l2src"
    } else if cfg!(target_os = "windows") {
        "mfvideosrc"
    } else if cfg!(target_os = "macos") {
        "avfvideosrc"
    } else {
        "autovideosrc"
    }
}

fn platform_source(index: usize) -> Result<gst::Element> {
    let builder = gst::ElementFactory::make(platform_source_name());
    let builder = if cfg!(target_os = "linux") {
        builder.property("device", format!("/dev/video{index}"))
    } else if cfg!(any(target_os = "windows", target_os = "macos")) {
        builder.property("device-index", index as i32)
    } else {
        builder
    };
    builder.build().map_err(CaptureError::from)
}

/// Source used when no camera was enumerated at all.
pub fn default_source() -> Result<gst::Element> {
    gst::ElementFactory::make("autovideosrc")
        .build()
        .map_err(|_| CaptureError::MissingElement("autovideosrc"))
}
