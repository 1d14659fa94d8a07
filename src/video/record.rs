use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use gstreamer as gst;
use gstreamer::prelude::*;

use crate::error::{CaptureError, Result};
use crate::resolution::Resolution;

/// How long the encoder gets to drain before the branch is torn down anyway.
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    /// MPEG-4 Part 2, the XVID-compatible default.
    Mpeg4,
    H264,
    Mjpeg,
}

impl VideoEncoder {
    pub const ALL: [Self; 3] = [Self::Mpeg4, Self::H264, Self::Mjpeg];

    pub fn label(self) -> &'static str {
        match self {
            Self::Mpeg4 => "MPEG-4 (XVID)",
            Self::H264 => "H.264",
            Self::Mjpeg => "Motion JPEG",
        }
    }

    fn elements(self) -> &'static str {
        match self {
            Self::Mpeg4 => "avenc_mpeg4 bitrate=4000000",
            Self::H264 => "x264enc tune=zerolatency speed-preset=veryfast ! h264parse",
            Self::Mjpeg => "jpegenc quality=90",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Avi,
    Mp4,
    Mov,
    Mkv,
}

impl Container {
    pub const ALL: [Self; 4] = [Self::Avi, Self::Mp4, Self::Mov, Self::Mkv];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Avi => "avi",
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Avi => "AVI",
            Self::Mp4 => "MP4",
            Self::Mov => "QuickTime",
            Self::Mkv => "Matroska",
        }
    }

    fn muxer(self) -> &'static str {
        match self {
            Self::Avi => "avimux",
            // faststart keeps the index at the front for players
            Self::Mp4 => "mp4mux faststart=true",
            Self::Mov => "qtmux",
            // the branch joins a running pipeline, start the file at zero
            Self::Mkv => "matroskamux offset-to-zero=true",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordSettings {
    pub resolution: Resolution,
    pub encoder: VideoEncoder,
    pub container: Container,
    pub fps: u32,
    pub path: PathBuf,
}

/// The recording branch hung off the capture tee, kept so it can be released.
pub(super) struct ActiveRecording {
    bin: gst::Bin,
    tee_pad: gst::Pad,
    path: PathBuf,
}

impl ActiveRecording {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// queue -> convert -> fixed rate and size -> encode -> mux -> file.
/// The file location is set as a property afterwards so paths need no quoting.
pub(crate) fn branch_description(settings: &RecordSettings) -> String {
    // format=I420 keeps the output playable in stock desktop players
    format!(
        "queue name=q_v !
        videoconvert !
        videorate !
        videoscale !
        video/x-raw,format=I420,width={w},height={h},framerate={fps}/1,pixel-aspect-ratio=1/1 !
        {enc} !
        {mux} name=mux !
        filesink name=file",
        w = settings.resolution.width,
        h = settings.resolution.height,
        fps = settings.fps.max(1),
        enc = settings.encoder.elements(),
        mux = settings.container.muxer(),
    )
}

pub(super) fn start_recording(
    pipeline: &gst::Pipeline,
    tee: &gst::Element,
    settings: RecordSettings,
) -> Result<ActiveRecording> {
    if let Some(dir) = settings.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let bin = gst::parse::bin_from_description(&branch_description(&settings), false)?;
    let file = bin.by_name("file").ok_or(CaptureError::MissingElement("filesink"))?;
    file.set_property("location", settings.path.to_string_lossy().to_string());

    let inner_sink = bin
        .by_name("q_v")
        .and_then(|q| q.static_pad("sink"))
        .ok_or(CaptureError::MissingElement("queue"))?;
    let ghost = gst::GhostPad::builder_with_target(&inner_sink)?
        .name("v_sink")
        .build();
    ghost.set_active(true)?;
    bin.add_pad(&ghost)?;

    // shift the branch's running time so the file starts at zero rather
    // than at the moment the camera was opened
    ghost.set_offset(recording_offset(pipeline.current_running_time()));

    pipeline.add(&bin)?;
    let tee_pad = match attach(tee, &bin, &ghost) {
        Ok(pad) => pad,
        Err(e) => {
            let _ = bin.set_state(gst::State::Null);
            let _ = pipeline.remove(&bin);
            return Err(e);
        }
    };

    tracing::info!(
        path = %settings.path.display(),
        encoder = settings.encoder.label(),
        container = settings.container.label(),
        "recording started at {} {}fps",
        settings.resolution,
        settings.fps
    );
    Ok(ActiveRecording {
        bin,
        tee_pad,
        path: settings.path,
    })
}

/// Pad offset cancelling the pipeline's running time at attach.
pub(crate) fn recording_offset(running_time: Option<gst::ClockTime>) -> i64 {
    running_time.map_or(0, |t| -(t.nseconds().min(i64::MAX as u64) as i64))
}

fn attach(tee: &gst::Element, bin: &gst::Bin, ghost: &gst::GhostPad) -> Result<gst::Pad> {
    let tee_pad = tee
        .request_pad_simple("src_%u")
        .ok_or(CaptureError::MissingElement("tee src pad"))?;
    if let Err(e) = tee_pad.link(ghost) {
        tee.release_request_pad(&tee_pad);
        return Err(e.into());
    }
    // bring the branch up to the pipeline's Playing state
    if let Err(e) = bin.sync_state_with_parent() {
        let _ = tee_pad.unlink(ghost);
        tee.release_request_pad(&tee_pad);
        return Err(e.into());
    }
    Ok(tee_pad)
}

/// Detaches the branch and finalizes the file. Blocks until the muxer has
/// written its trailer or the timeout passes. The branch is always torn down,
/// even when draining fails.
pub(super) fn stop_recording(
    pipeline: &gst::Pipeline,
    tee: &gst::Element,
    active: ActiveRecording,
) -> Result<PathBuf> {
    let drained = drain(&active);
    let torn_down = teardown(pipeline, tee, &active);
    first_error([drained, torn_down])?;

    tracing::info!(path = %active.path.display(), "recording stopped");
    Ok(active.path)
}

fn drain(active: &ActiveRecording) -> Result<()> {
    let ghost = active
        .bin
        .static_pad("v_sink")
        .ok_or(CaptureError::MissingElement("recording sink pad"))?;
    let file_pad = active
        .bin
        .by_name("file")
        .and_then(|f| f.static_pad("sink"))
        .ok_or(CaptureError::MissingElement("filesink"))?;

    let (eos_tx, eos_rx) = mpsc::channel();
    file_pad.add_probe(gst::PadProbeType::EVENT_DOWNSTREAM, move |_pad, info| {
        match info.data {
            Some(gst::PadProbeData::Event(ref event)) if event.type_() == gst::EventType::Eos => {
                let _ = eos_tx.send(());
                gst::PadProbeReturn::Remove
            }
            _ => gst::PadProbeReturn::Ok,
        }
    });

    // Wait for the tee pad to go idle so no buffer is mid-flight, then cut
    // the branch loose and let EOS flush the encoder.
    active
        .tee_pad
        .add_probe(gst::PadProbeType::IDLE, move |tee_pad, _info| {
            tracing::debug!("tee pad idle, detaching recording branch");
            let _ = tee_pad.unlink(&ghost);
            ghost.send_event(gst::event::Eos::new());
            gst::PadProbeReturn::Remove
        });

    if eos_rx.recv_timeout(FINALIZE_TIMEOUT).is_err() {
        tracing::warn!(
            path = %active.path.display(),
            "recording did not drain within {FINALIZE_TIMEOUT:?}, file may be truncated"
        );
    }
    Ok(())
}

/// Stops the branch, gives the tee pad back and removes the branch from the
/// pipeline. Every step runs; the first failure is reported.
fn teardown(pipeline: &gst::Pipeline, tee: &gst::Element, active: &ActiveRecording) -> Result<()> {
    let stopped = active
        .bin
        .set_state(gst::State::Null)
        .map(|_| ())
        .map_err(CaptureError::from);
    tee.release_request_pad(&active.tee_pad);
    let removed = pipeline.remove(&active.bin).map_err(CaptureError::from);
    first_error([stopped, removed])
}

fn first_error<const N: usize>(results: [Result<()>; N]) -> Result<()> {
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(encoder: VideoEncoder, container: Container) -> RecordSettings {
        RecordSettings {
            resolution: Resolution::new(1280, 720),
            encoder,
            container,
            fps: 30,
            path: PathBuf::from("/tmp/out.avi"),
        }
    }

    #[test]
    fn branch_scales_and_rates_to_settings() {
        let desc = branch_description(&settings(VideoEncoder::Mpeg4, Container::Avi));
        assert!(desc.contains("width=1280,height=720,framerate=30/1"));
        assert!(desc.contains("avenc_mpeg4"));
        assert!(desc.contains("avimux name=mux"));
        assert!(desc.contains("filesink name=file"));
        // the location is never spliced into the description
        assert!(!desc.contains("/tmp/out.avi"));
    }

    #[test]
    fn h264_is_parsed_before_muxing() {
        let desc = branch_description(&settings(VideoEncoder::H264, Container::Mp4));
        assert!(desc.contains("x264enc tune=zerolatency speed-preset=veryfast ! h264parse"));
        assert!(desc.contains("mp4mux faststart=true name=mux"));
    }

    #[test]
    fn zero_fps_is_clamped() {
        let mut s = settings(VideoEncoder::Mjpeg, Container::Mkv);
        s.fps = 0;
        assert!(branch_description(&s).contains("framerate=1/1"));
    }

    #[test]
    fn matroska_starts_the_file_at_zero() {
        let desc = branch_description(&settings(VideoEncoder::Mpeg4, Container::Mkv));
        assert!(desc.contains("matroskamux offset-to-zero=true name=mux"));
    }

    #[test]
    fn offset_cancels_running_time_at_attach() {
        assert_eq!(recording_offset(None), 0);
        assert_eq!(recording_offset(Some(gst::ClockTime::ZERO)), 0);
        assert_eq!(
            recording_offset(Some(gst::ClockTime::from_seconds(40))),
            -40_000_000_000
        );
    }

    #[test]
    fn first_error_wins() {
        assert!(first_error([Ok(()), Ok(())]).is_ok());
        assert!(matches!(
            first_error([Ok(()), Err(CaptureError::NotOpen), Err(CaptureError::NoFrame)]),
            Err(CaptureError::NotOpen)
        ));
    }

    #[test]
    fn teardown_removes_branch_and_releases_tee_pad() {
        gst::init().unwrap();
        let pipeline = gst::Pipeline::new();
        let tee = gst::ElementFactory::make("tee").build().unwrap();
        let bin = gst::Bin::new();
        bin.add(&gst::ElementFactory::make("fakesink").build().unwrap())
            .unwrap();
        pipeline.add_many([&tee, bin.upcast_ref()]).unwrap();

        let tee_pad = tee.request_pad_simple("src_%u").unwrap();
        let active = ActiveRecording {
            bin: bin.clone(),
            tee_pad,
            path: PathBuf::from("branch.avi"),
        };

        teardown(&pipeline, &tee, &active).unwrap();
        assert!(bin.parent().is_none());
        assert!(tee.src_pads().is_empty());
    }

    #[test]
    fn every_container_has_a_distinct_extension() {
        let mut exts: Vec<_> = Container::ALL.iter().map(|c| c.extension()).collect();
        exts.sort_unstable();
        exts.dedup();
        assert_eq!(exts.len(), Container::ALL.len());
    }
}
