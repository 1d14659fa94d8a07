use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use super::capture::Frame;
use crate::error::{CaptureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Png,
    Jpeg,
}

impl SnapshotFormat {
    pub const ALL: [Self; 2] = [Self::Png, Self::Jpeg];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(CaptureError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Writes `frame` at full capture resolution; the format follows the file
/// extension.
pub fn save(frame: &Frame, path: &Path) -> Result<()> {
    let format = SnapshotFormat::from_path(path)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let image = RgbaImage::from_raw(frame.width as u32, frame.height as u32, frame.rgba.clone())
        .ok_or(CaptureError::NoFrame)?;
    match format {
        SnapshotFormat::Png => image.save_with_format(path, ImageFormat::Png)?,
        // JPEG has no alpha channel
        SnapshotFormat::Jpeg => DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)?,
    }

    tracing::info!(path = %path.display(), "snapshot saved ({}x{})", frame.width, frame.height);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn frame() -> Frame {
        // 2x1: one red pixel, one blue pixel
        Frame {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
            sequence: 0,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("smart-terminal-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a.png")).unwrap(), SnapshotFormat::Png);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.PNG")).unwrap(), SnapshotFormat::Png);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.jpeg")).unwrap(), SnapshotFormat::Jpeg);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.jpg")).unwrap(), SnapshotFormat::Jpeg);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            SnapshotFormat::from_path(Path::new("a.bmp")),
            Err(CaptureError::UnsupportedFormat(_))
        ));
        assert!(SnapshotFormat::from_path(Path::new("snapshot")).is_err());
    }

    #[test]
    fn png_keeps_exact_pixels() {
        let path = scratch("exact.png");
        save(&frame(), &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 255]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn jpeg_is_written_without_alpha() {
        let path = scratch("lossy.jpg");
        save(&frame(), &path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.to_rgb8().dimensions(), (2, 1));
        assert!(!decoded.color().has_alpha());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn nothing_is_written_for_unsupported_names() {
        let path = scratch("nope.gif");
        assert!(save(&frame(), &path).is_err());
        assert!(!path.exists());
    }
}
