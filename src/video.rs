//! The capture controller.
//!
//! One thread owns the camera pipeline and the recording branch. The UI sends
//! it [`CaptureCommand`]s and reads back the shared frame slot and
//! [`CaptureStatus`].

pub mod capture;
pub mod record;
pub mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::NaiveDateTime;
use eframe::egui;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::devices::{self, CameraDevice};
use crate::error::{CaptureError, Result};
use crate::resolution::Resolution;
use capture::{CaptureSession, FrameSlot, SharedFrames};
use record::{ActiveRecording, RecordSettings};

#[derive(Debug)]
pub enum CaptureCommand {
    /// Lists the cameras, publishes them in the status and opens the first.
    Discover {
        scan_limit: usize,
        resolution: Resolution,
    },
    /// (Re)open a camera. `None` falls back to the platform default source.
    Open {
        device: Option<CameraDevice>,
        resolution: Resolution,
    },
    StartRecording(RecordSettings),
    StopRecording,
    Snapshot(PathBuf),
    Close,
    Shutdown,
}

/// What the controller last reported, for the status line.
#[derive(Debug, Clone, Default)]
pub struct CaptureStatus {
    /// Cameras found by the last `Discover`.
    pub devices: Vec<CameraDevice>,
    pub discovering: bool,
    pub device: Option<String>,
    pub resolution: Option<Resolution>,
    pub recording: Option<PathBuf>,
    pub message: Option<String>,
}

/// UI-side handle. Dropping it shuts the controller down and releases the
/// camera.
pub struct CaptureHandle {
    tx: mpsc::UnboundedSender<CaptureCommand>,
    frames: SharedFrames,
    status: Arc<Mutex<CaptureStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn spawn(fps_window: Duration, repaint: egui::Context) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let frames = Arc::new(Mutex::new(FrameSlot::new(fps_window)));
        let status = Arc::new(Mutex::new(CaptureStatus::default()));

        let controller = Controller::new(frames.clone(), status.clone(), repaint);
        let thread = std::thread::spawn(move || controller.run(rx));

        Self {
            tx,
            frames,
            status,
            thread: Some(thread),
        }
    }

    pub fn send(&self, command: CaptureCommand) {
        if self.tx.send(command).is_err() {
            tracing::error!("capture controller is gone, command dropped");
        }
    }

    pub fn frames(&self) -> &SharedFrames {
        &self.frames
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.lock().clone()
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(CaptureCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("capture controller panicked");
            }
        }
    }
}

struct Controller {
    frames: SharedFrames,
    status: Arc<Mutex<CaptureStatus>>,
    repaint: egui::Context,
    session: Option<CaptureSession>,
    recording: Option<ActiveRecording>,
}

impl Controller {
    fn new(frames: SharedFrames, status: Arc<Mutex<CaptureStatus>>, repaint: egui::Context) -> Self {
        Self {
            frames,
            status,
            repaint,
            session: None,
            recording: None,
        }
    }

    fn run(mut self, mut rx: mpsc::UnboundedReceiver<CaptureCommand>) {
        while let Some(command) = rx.blocking_recv() {
            tracing::debug!(?command, "capture command");
            if matches!(command, CaptureCommand::Shutdown) {
                break;
            }
            self.dispatch(command);
        }
        self.close();
        tracing::debug!("capture controller exited");
    }

    /// Runs one command. Failures are logged and published, never returned.
    fn dispatch(&mut self, command: CaptureCommand) {
        if let Err(e) = self.handle(command) {
            tracing::error!("{e}");
            self.report(e.to_string());
        }
        self.repaint.request_repaint();
    }

    fn handle(&mut self, command: CaptureCommand) -> Result<()> {
        match command {
            CaptureCommand::Discover {
                scan_limit,
                resolution,
            } => self.discover(scan_limit, resolution),
            CaptureCommand::Open { device, resolution } => self.open(device, resolution),
            CaptureCommand::StartRecording(settings) => self.start_recording(settings),
            CaptureCommand::StopRecording => self.stop_recording(),
            CaptureCommand::Snapshot(path) => self.snapshot(&path),
            CaptureCommand::Close => {
                self.close();
                Ok(())
            }
            CaptureCommand::Shutdown => Ok(()),
        }
    }

    fn report(&self, message: impl Into<String>) {
        self.status.lock().message = Some(message.into());
    }

    fn discover(&mut self, scan_limit: usize, resolution: Resolution) -> Result<()> {
        self.status.lock().discovering = true;
        self.repaint.request_repaint();

        let found = devices::enumerate(scan_limit);
        let first = found.first().cloned();
        {
            let mut status = self.status.lock();
            status.devices = found;
            status.discovering = false;
        }
        self.open(first, resolution)
    }

    /// Device re-initialization: whatever was open is fully released first.
    fn open(&mut self, device: Option<CameraDevice>, resolution: Resolution) -> Result<()> {
        self.close();

        let (source, name) = match &device {
            Some(device) => {
                tracing::info!(index = device.index, camera = %device.name, "opening camera at {resolution}");
                (device.create_source()?, device.name.clone())
            }
            None => {
                tracing::info!("no camera listed, opening the default source at {resolution}");
                (devices::default_source()?, "Default camera".to_string())
            }
        };

        let session = CaptureSession::open(
            source,
            resolution,
            self.frames.clone(),
            self.status.clone(),
            self.repaint.clone(),
        )?;

        let mut status = self.status.lock();
        status.device = Some(name);
        status.resolution = Some(session.resolution());
        status.message = None;
        drop(status);

        self.session = Some(session);
        Ok(())
    }

    fn start_recording(&mut self, settings: RecordSettings) -> Result<()> {
        if self.recording.is_some() {
            self.report("Already recording");
            return Ok(());
        }
        let session = self.session.as_ref().ok_or(CaptureError::NotOpen)?;

        let active = record::start_recording(session.pipeline(), session.tee(), settings)?;
        let path = active.path().clone();
        self.recording = Some(active);

        let mut status = self.status.lock();
        status.message = Some(format!("Recording to {}", path.display()));
        status.recording = Some(path);
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        let Some(active) = self.recording.take() else {
            return Ok(());
        };
        self.status.lock().recording = None;
        let session = self.session.as_ref().ok_or(CaptureError::NotOpen)?;

        let path = record::stop_recording(session.pipeline(), session.tee(), active)?;
        self.report(format!("Saved recording to {}", path.display()));
        Ok(())
    }

    fn snapshot(&self, path: &Path) -> Result<()> {
        let frame = self.frames.lock().latest().ok_or(CaptureError::NoFrame)?;
        snapshot::save(&frame, path)?;
        self.report(format!("Saved snapshot to {}", path.display()));
        Ok(())
    }

    /// Stops any recording and releases the camera.
    fn close(&mut self) {
        if let Err(e) = self.stop_recording() {
            tracing::error!("failed to finalize recording: {e}");
            self.report(e.to_string());
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.frames.lock().reset();

        let mut status = self.status.lock();
        status.device = None;
        status.resolution = None;
    }
}

/// `<dir>/<prefix>_YYYYMMDD_HHMMSS.<extension>`
pub fn output_path(dir: &Path, prefix: &str, extension: &str, now: NaiveDateTime) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", now.format("%Y%m%d_%H%M%S")))
}
