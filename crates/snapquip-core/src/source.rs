//! Image sources: gallery selection and camera capture.
//!
//! A source is a triggerable acquisition that completes with a selection,
//! with nothing (the user cancelled), or with a source error. Selections are
//! mutually exclusive by construction: the flow holds at most one
//! `ImageSelection`, and a new acquisition replaces the whole value.

use crate::error::FlowError;
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::path::{Path, PathBuf};

/// The currently chosen photo source.
#[derive(Clone)]
pub enum ImageSelection {
    /// A reference to image data in the gallery; decoded at submission time.
    Gallery(PathBuf),

    /// An already-decoded in-memory bitmap handed over by the camera.
    Camera(DynamicImage),
}

impl ImageSelection {
    pub fn is_gallery(&self) -> bool {
        matches!(self, Self::Gallery(_))
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, Self::Camera(_))
    }
}

// DynamicImage's derived Debug dumps pixel buffers; log dimensions instead.
impl fmt::Debug for ImageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gallery(path) => f.debug_tuple("Gallery").field(path).finish(),
            Self::Camera(image) => write!(f, "Camera({}x{})", image.width(), image.height()),
        }
    }
}

/// An asynchronous image acquisition.
///
/// `Ok(None)` means the user cancelled; the caller leaves the current
/// selection untouched. Uses `async_trait` because native async fn in trait
/// is not object-safe (sources are driven as `Box<dyn ImageSource>`).
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Source name for logging (e.g., "gallery", "camera").
    fn name(&self) -> &str;

    /// Trigger the acquisition and wait for its completion.
    async fn acquire(&self) -> Result<Option<ImageSelection>, FlowError>;
}

/// Extension-filtered view over a gallery directory.
///
/// This is the listing facility an interactive picker builds on; it does not
/// prompt by itself.
pub struct GalleryScan {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl GalleryScan {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a path passes the extension filter.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|known| known == &e.to_lowercase()))
            .unwrap_or(false)
    }

    /// List gallery entries, sorted by file name.
    pub fn entries(&self) -> Result<Vec<PathBuf>, FlowError> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| {
            FlowError::Source(format!("Cannot read gallery {}: {e}", self.dir.display()))
        })?;

        let mut entries: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.accepts(path))
            .collect();
        entries.sort();
        Ok(entries)
    }
}

/// Gallery source resolved from an explicit path.
///
/// The handle is accepted as-is, without validating the image content;
/// unreadable or undecodable files surface as captioning failures at
/// submission time.
pub struct PathGallery {
    path: PathBuf,
}

impl PathGallery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for PathGallery {
    fn name(&self) -> &str {
        "gallery"
    }

    async fn acquire(&self) -> Result<Option<ImageSelection>, FlowError> {
        Ok(Some(ImageSelection::Gallery(self.path.clone())))
    }
}

/// Camera-capture analog: raw bytes decoded immediately to a bitmap.
///
/// Mirrors a capture-preview callback, which hands the application a decoded
/// frame rather than a file reference. Empty input means the capture was
/// aborted.
pub struct CameraFrame {
    bytes: Vec<u8>,
}

impl CameraFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ImageSource for CameraFrame {
    fn name(&self) -> &str {
        "camera"
    }

    async fn acquire(&self) -> Result<Option<ImageSelection>, FlowError> {
        if self.bytes.is_empty() {
            return Ok(None);
        }

        let bytes = self.bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| FlowError::Source(format!("Capture decode task failed: {e}")))?
            .map_err(|e| FlowError::Source(format!("Cannot decode captured frame: {e}")))?;

        Ok(Some(ImageSelection::Camera(decoded)))
    }
}
