use gstreamer as gst;

/// Everything that can go wrong between the camera and the disk.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("GStreamer error: {0}")]
    Glib(#[from] gst::glib::Error),

    #[error("GStreamer call failed: {0}")]
    Bool(#[from] gst::glib::BoolError),

    #[error("state change failed: {0}")]
    StateChange(#[from] gst::StateChangeError),

    #[error("pad link failed: {0}")]
    PadLink(#[from] gst::PadLinkError),

    #[error("missing pipeline element `{0}`")]
    MissingElement(&'static str),

    #[error("no camera is open")]
    NotOpen,

    #[error("no frame captured yet")]
    NoFrame,

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
