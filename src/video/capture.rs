use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use eframe::egui;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use parking_lot::Mutex;

use super::CaptureStatus;
use crate::error::{CaptureError, Result};
use crate::fps::FpsMeter;
use crate::resolution::Resolution;

/// One decoded RGBA frame at capture resolution.
#[derive(Debug)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    pub sequence: u64,
}

impl Frame {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }
}

/// Latest frame plus the rate frames are arriving at.
#[derive(Debug)]
pub struct FrameSlot {
    latest: Option<Arc<Frame>>,
    meter: FpsMeter,
    next_sequence: u64,
}

pub type SharedFrames = Arc<Mutex<FrameSlot>>;

impl FrameSlot {
    pub fn new(fps_window: Duration) -> Self {
        Self {
            latest: None,
            meter: FpsMeter::new(fps_window),
            next_sequence: 0,
        }
    }

    pub fn publish(&mut self, width: usize, height: usize, rgba: Vec<u8>, now: Instant) {
        self.meter.tick(now);
        self.latest = Some(Arc::new(Frame {
            width,
            height,
            rgba,
            sequence: self.next_sequence,
        }));
        self.next_sequence += 1;
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.clone()
    }

    pub fn fps(&self) -> f64 {
        self.meter.fps()
    }

    /// Forgets the current device's frames and timing.
    pub fn reset(&mut self) {
        self.latest = None;
        self.meter.reset();
    }
}

/// Copies a possibly padded RGBA plane into a tightly packed buffer.
pub(crate) fn pack_rows(data: &[u8], width: usize, height: usize, stride: usize) -> Option<Vec<u8>> {
    let row = width * 4;
    if stride < row || height == 0 {
        return None;
    }
    let needed = stride * (height - 1) + row;
    if data.len() < needed {
        return None;
    }
    if stride == row {
        return Some(data[..row * height].to_vec());
    }

    let mut packed = Vec::with_capacity(row * height);
    for y in 0..height {
        let start = y * stride;
        packed.extend_from_slice(&data[start..start + row]);
    }
    Some(packed)
}

/// Everything after the camera source: decode, convert to RGBA at the chosen
/// size, then a tee whose first branch feeds the preview.
pub(crate) fn preview_description(resolution: Resolution) -> String {
    format!(
        "decodebin !
        videoconvert !
        videoscale !
        video/x-raw,format=RGBA,width={w},height={h},pixel-aspect-ratio=1/1 !
        tee name=t allow-not-linked=true !
        queue leaky=downstream max-size-buffers=2 !
        appsink name=preview sync=false max-buffers=1 drop=true",
        w = resolution.width,
        h = resolution.height,
    )
}

/// An open camera. At most one exists at a time; dropping it releases the
/// device.
pub struct CaptureSession {
    pipeline: gst::Pipeline,
    tee: gst::Element,
    resolution: Resolution,
    running: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn open(
        source: gst::Element,
        resolution: Resolution,
        frames: SharedFrames,
        status: Arc<Mutex<CaptureStatus>>,
        repaint: egui::Context,
    ) -> Result<Self> {
        let pipeline = gst::Pipeline::new();
        let bin = gst::parse::bin_from_description(&preview_description(resolution), true)?;
        pipeline.add_many([&source, bin.upcast_ref()])?;
        source.link(&bin)?;

        let tee = bin.by_name("t").ok_or(CaptureError::MissingElement("tee"))?;
        let appsink = bin
            .by_name("preview")
            .and_then(|e| e.dynamic_cast::<gst_app::AppSink>().ok())
            .ok_or(CaptureError::MissingElement("appsink"))?;

        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gst::FlowError::NotNegotiated)?;
                    let info = gst_video::VideoInfo::from_caps(caps)
                        .map_err(|_| gst::FlowError::NotNegotiated)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                    let (width, height) = (info.width() as usize, info.height() as usize);
                    let stride = info.stride()[0] as usize;
                    let rgba = pack_rows(map.as_slice(), width, height, stride)
                        .ok_or(gst::FlowError::Error)?;

                    frames.lock().publish(width, height, rgba, Instant::now());
                    repaint.request_repaint();
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let bus = pipeline.bus().ok_or(CaptureError::MissingElement("bus"))?;
        let running = Arc::new(AtomicBool::new(true));
        let watcher = std::thread::spawn({
            let running = running.clone();
            move || watch_bus(bus, running, status)
        });

        let mut session = Self {
            pipeline,
            tee,
            resolution,
            running,
            watcher: Some(watcher),
        };
        if let Err(e) = session.pipeline.set_state(gst::State::Playing) {
            session.close();
            return Err(e.into());
        }

        tracing::info!("capture started at {resolution}");
        Ok(session)
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    pub fn tee(&self) -> &gst::Element {
        &self.tee
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn close(&mut self) {
        let Some(watcher) = self.watcher.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!("failed to stop capture pipeline: {e}");
        }
        if watcher.join().is_err() {
            tracing::warn!("bus watcher panicked");
        }
        tracing::info!("capture stopped");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn watch_bus(bus: gst::Bus, running: Arc<AtomicBool>, status: Arc<Mutex<CaptureStatus>>) {
    while running.load(Ordering::Acquire) {
        let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(100)) else {
            continue;
        };

        match msg.view() {
            gst::MessageView::Error(err) => {
                let origin = err.src().map(|s| s.path_string().to_string()).unwrap_or_default();
                tracing::error!(%origin, debug = ?err.debug(), "capture error: {}", err.error());
                mark_failed(&mut status.lock(), &err.error().to_string());
            }
            gst::MessageView::Warning(w) => {
                tracing::warn!(debug = ?w.debug(), "capture warning: {}", w.error());
            }
            gst::MessageView::Eos(..) => {
                tracing::info!("camera stream ended");
                break;
            }
            _ => {}
        }
    }
}

/// The pipeline is unusable after an error, so the camera is no longer shown
/// as open.
fn mark_failed(status: &mut CaptureStatus, error: &str) {
    status.device = None;
    status.resolution = None;
    status.message = Some(format!("Camera error: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_rows_are_copied_whole() {
        let data: Vec<u8> = (0..16).collect();
        assert_eq!(pack_rows(&data, 2, 2, 8), Some(data.clone()));
    }

    #[test]
    fn row_padding_is_dropped() {
        // 1x2 image, 4 bytes of pixel data per row padded to 8.
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        assert_eq!(pack_rows(&data, 1, 2, 8), Some(vec![1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn short_or_inconsistent_planes_are_rejected() {
        assert_eq!(pack_rows(&[0; 7], 1, 2, 4), None);
        assert_eq!(pack_rows(&[0; 16], 2, 2, 4), None);
        assert_eq!(pack_rows(&[], 0, 0, 0), None);
    }

    #[test]
    fn slot_numbers_frames_and_measures_rate() {
        let mut slot = FrameSlot::new(Duration::from_secs(5));
        let start = Instant::now();
        slot.publish(1, 1, vec![0; 4], start);
        slot.publish(1, 1, vec![0; 4], start + Duration::from_millis(500));

        let frame = slot.latest().unwrap();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.size(), [1, 1]);
        assert!((slot.fps() - 4.0).abs() < 1e-9);

        slot.reset();
        assert!(slot.latest().is_none());
        assert_eq!(slot.fps(), 0.0);
    }

    #[test]
    fn bus_error_clears_the_open_camera() {
        let mut status = CaptureStatus {
            device: Some("HD Pro Webcam C920".into()),
            resolution: Some(Resolution::new(1280, 720)),
            ..Default::default()
        };
        mark_failed(&mut status, "Device '/dev/video0' was unplugged");

        assert!(status.device.is_none());
        assert!(status.resolution.is_none());
        assert_eq!(
            status.message.as_deref(),
            Some("Camera error: Device '/dev/video0' was unplugged")
        );
    }

    #[test]
    fn preview_requests_rgba_at_selected_size() {
        let desc = preview_description(Resolution::new(1280, 720));
        assert!(desc.starts_with("decodebin"));
        assert!(desc.contains("format=RGBA,width=1280,height=720"));
        assert!(desc.contains("tee name=t"));
        assert!(desc.contains("appsink name=preview"));
    }
}
