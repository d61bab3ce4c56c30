//! Thumbnail cache
//!
//! Thumbnails are generated on first demand, written atomically to the
//! thumbnail directory as `<identity>.png` with a `<identity>.json` sidecar,
//! and regenerated when their source image changes.

pub mod cache;
pub mod generator;
pub mod record;

pub use cache::{ReconcileStats, ThumbnailCache};
pub use generator::{ImageThumbnailGenerator, RenderError, THUMBNAIL_EXTENSION, ThumbnailGenerator};
pub use record::{ThumbnailMetadata, ThumbnailRecord};
