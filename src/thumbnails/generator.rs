//! Thumbnail rendering

use image::{ImageError, ImageFormat, ImageReader};
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use thiserror::Error;

/// Extension of every persisted thumbnail
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Why a source image could not be turned into a thumbnail
#[derive(Error, Debug)]
pub enum RenderError {
    /// The source is corrupt or not an image format we can decode
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces encoded thumbnail bytes from a source image
///
/// Called on the blocking thread pool.
pub trait ThumbnailGenerator: Send + Sync {
    fn render(&self, source: &Path) -> Result<Vec<u8>, RenderError>;
}

/// Shrinks images with the `image` crate and encodes them as PNG
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailGenerator {
    max_width: u32,
    max_height: u32,
}

impl ImageThumbnailGenerator {
    pub fn new((max_width, max_height): (u32, u32)) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

impl ThumbnailGenerator for ImageThumbnailGenerator {
    fn render(&self, source: &Path) -> Result<Vec<u8>, RenderError> {
        let image = ImageReader::open(source)?
            .with_guessed_format()?
            .decode()
            .map_err(classify_decode_error)?;

        // Never upscale, only shrink to fit the bounding box
        let image = if image.width() > self.max_width || image.height() > self.max_height {
            image.thumbnail(self.max_width, self.max_height)
        } else {
            image
        };

        let mut encoded = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(encoded)
    }
}

fn classify_decode_error(error: ImageError) -> RenderError {
    match error {
        // Truncated files surface as I/O errors from the decoders
        ImageError::IoError(e)
            if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::InvalidData) =>
        {
            RenderError::Decode(e.to_string())
        }
        ImageError::IoError(e) => RenderError::Io(e),
        other => RenderError::Decode(other.to_string()),
    }
}
