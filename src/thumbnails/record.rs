//! Thumbnail records and their on-disk sidecar metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::images::{ImageIdentity, ImageRecord};

/// A persisted thumbnail derived from one source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    pub identity: ImageIdentity,
    /// Location of the artifact, derived only from `identity`
    pub path: PathBuf,
    /// Source mtime the artifact was generated from
    pub source_modified: DateTime<Utc>,
    pub source_size: u64,
    pub generated_at: DateTime<Utc>,
    pub bytes_on_disk: u64,
}

impl ThumbnailRecord {
    /// Whether this thumbnail still reflects `image`
    pub fn matches_source(&self, image: &ImageRecord) -> bool {
        self.identity == image.identity
            && self.source_modified == image.modified
            && self.source_size == image.size
    }
}

/// Metadata stored in .json files next to thumbnails
///
/// Lets a restarted service adopt thumbnails that are still valid instead of
/// regenerating every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailMetadata {
    /// Source image path relative to the image directory
    pub relative_path: String,
    pub source_modified: DateTime<Utc>,
    pub source_size: u64,
    pub generated_at: DateTime<Utc>,
}

impl ThumbnailMetadata {
    pub fn for_record(image: &ImageRecord, record: &ThumbnailRecord) -> Self {
        Self {
            relative_path: image.relative_path.clone(),
            source_modified: record.source_modified,
            source_size: record.source_size,
            generated_at: record.generated_at,
        }
    }

    /// Whether the thumbnail this describes was generated from `image` as it is now
    pub fn matches_source(&self, image: &ImageRecord) -> bool {
        self.relative_path == image.relative_path
            && self.source_modified == image.modified
            && self.source_size == image.size
    }
}
