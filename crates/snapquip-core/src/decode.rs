//! Image decoding with format detection, validation, and timeout support.
//!
//! Resolves a gallery reference into decoded pixels at submission time; the
//! camera path never comes through here because captures arrive pre-decoded.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::FlowError;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read and decode a gallery file with validation and timeout.
    pub async fn decode_file(&self, path: &Path) -> Result<DecodedImage, FlowError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| FlowError::FileNotFound(path.to_path_buf()))?;

        let size_mb = metadata.len() / (1024 * 1024);
        if size_mb > self.limits.max_file_size_mb {
            return Err(FlowError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb,
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| FlowError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {e}"),
        })?;

        self.decode_from_bytes(bytes, path).await
    }

    /// Decode an image from an in-memory byte buffer with validation and timeout.
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DecodedImage, FlowError> {
        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, &path_owned)).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(FlowError::ImageTooLarge {
                        path: path.to_path_buf(),
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(FlowError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            }),
            Err(_) => Err(FlowError::DecodeTimeout {
                path: path.to_path_buf(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    fn decode_bytes_sync(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, FlowError> {
        use std::io::Cursor;

        let cursor = Cursor::new(bytes);
        let reader = image::ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| FlowError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {e}"),
            })?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| FlowError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };
        let image = reader.decode().map_err(|e| FlowError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }
}

/// Convert an ImageFormat to a lowercase string for logging.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_fixture(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([64, 128, 255]),
        ));
        let path = dir.join(name);
        image.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[tokio::test]
    async fn test_decode_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_fixture(dir.path(), "photo.png", 8, 6);

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let decoded = decoder.decode_file(&path).await.unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (8, 6));
    }

    #[tokio::test]
    async fn test_decode_format_detected_by_content() {
        // A PNG under a .jpg extension decodes as PNG: content wins.
        let dir = tempfile::tempdir().unwrap();
        let path = png_fixture(dir.path(), "misnamed.jpg", 4, 4);

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let decoded = decoder.decode_file(&path).await.unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_decode_missing_file() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode_file(Path::new("/nowhere/ghost.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_decode_rejects_oversized_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_fixture(dir.path(), "wide.png", 32, 4);

        let limits = LimitsConfig {
            max_image_dimension: 16,
            ..LimitsConfig::default()
        };
        let decoder = ImageDecoder::new(limits);
        let err = decoder.decode_file(&path).await.unwrap_err();
        assert!(matches!(err, FlowError::ImageTooLarge { width: 32, .. }));
    }

    #[tokio::test]
    async fn test_decode_garbage_bytes() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode_from_bytes(vec![0; 64], Path::new("junk.bin"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Decode { .. } | FlowError::UnsupportedFormat { .. }
        ));
    }
}
