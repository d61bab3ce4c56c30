//! Image identities and records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// File extensions accepted as background images (lowercase)
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Extensions Teams will not load directly; they are advertised as `jpg`
const REMAPPED_EXTENSIONS: &[(&str, &str)] = &[("jpeg", "jpg"), ("gif", "jpg")];

/// Number of digest bytes kept in an identity
const IDENTITY_BYTES: usize = 16;

/// Stable key for a source image
///
/// Derived from the image's path relative to the image directory, so it stays
/// the same across scans and restarts and is safe to use as a filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIdentity(String);

impl ImageIdentity {
    pub fn from_relative_path(relative_path: &str) -> Self {
        let digest = Sha256::digest(relative_path.as_bytes());
        Self(hex::encode(&digest[..IDENTITY_BYTES]))
    }

    /// Parse an identity back out of a thumbnail filename stem
    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == IDENTITY_BYTES * 2
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One source image file as observed by the last scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub identity: ImageIdentity,
    /// Slash separated path relative to the image directory
    pub relative_path: String,
    /// Absolute location on disk
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl ImageRecord {
    pub fn new(relative_path: String, path: PathBuf, modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            identity: ImageIdentity::from_relative_path(&relative_path),
            relative_path,
            path,
            modified,
            size,
        }
    }

    /// Whether a filename has one of the accepted image extensions
    pub fn is_accepted(file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Lowercase extension of the source file
    pub fn extension(&self) -> String {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.relative_path)
    }

    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
    }

    /// Relative path without its extension, unique within the directory
    pub fn catalog_id(&self) -> &str {
        let name_start = self.relative_path.len() - self.file_name().len();
        &self.relative_path[..name_start + self.stem().len()]
    }

    fn remapped_extension(&self) -> Option<&'static str> {
        let ext = self.extension();
        REMAPPED_EXTENSIONS
            .iter()
            .find(|(from, _)| *from == ext)
            .map(|(_, to)| *to)
    }

    /// File type advertised to the client
    pub fn served_filetype(&self) -> String {
        self.remapped_extension()
            .map(str::to_string)
            .unwrap_or_else(|| self.extension())
    }

    /// Name the client requests this image (and its thumbnail) by
    ///
    /// Remapped types get the advertised extension appended, so `a.jpeg`
    /// becomes `a.jpeg.jpg`.
    pub fn url_name(&self) -> String {
        match self.remapped_extension() {
            Some(ext) => format!("{}.{}", self.relative_path, ext),
            None => self.relative_path.clone(),
        }
    }

    /// Whether `other` describes the same file contents as far as metadata tells
    pub fn same_source(&self, other: &ImageRecord) -> bool {
        self.modified == other.modified && self.size == other.size && self.path == other.path
    }
}
