//! Error type definitions for teamster
//!
//! This module defines the error hierarchy used throughout the service. The
//! catalog errors are `Clone` because a single failed thumbnail generation is
//! handed to every caller that waited on it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Catalog engine errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Peer configuration sync errors
    #[error("Peer config error: {0}")]
    PeerConfig(#[from] PeerConfigError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Filesystem errors outside of the catalog engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the image store, thumbnail cache and catalog builder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The configured image directory is missing or unreadable
    #[error("Image directory unavailable: {path} - {message}")]
    DirectoryUnavailable { path: String, message: String },

    /// A source image could not be decoded
    #[error("Unsupported image: {path} - {message}")]
    UnsupportedImage { path: String, message: String },

    /// Transient I/O or encoding failure while producing a thumbnail
    #[error("Thumbnail generation failed for {identity}: {message}")]
    ThumbnailGenerationFailed { identity: String, message: String },

    /// No image with this identity exists in the current snapshot
    #[error("Image not found: {identity}")]
    ImageNotFound { identity: String },
}

/// Errors raised while synchronizing the peer application's configuration
#[derive(Error, Debug)]
pub enum PeerConfigError {
    /// The peer configuration file or its directory cannot be written
    #[error("Peer config unwritable: {path} - {message}")]
    Unwritable { path: String, message: String },

    /// The peer configuration exists but is not a JSON object
    #[error("Peer config malformed: {path} - {message}")]
    Malformed { path: String, message: String },
}

impl AppError {
    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Catalog(CatalogError::ImageNotFound { .. }) | Self::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Catalog(CatalogError::UnsupportedImage { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Catalog(CatalogError::DirectoryUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl CatalogError {
    /// Create a directory unavailable error
    pub fn directory_unavailable<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported image error
    pub fn unsupported_image<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::UnsupportedImage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a thumbnail generation failure
    pub fn generation_failed<I: Into<String>, M: Into<String>>(identity: I, message: M) -> Self {
        Self::ThumbnailGenerationFailed {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Create an image not found error
    pub fn image_not_found<I: Into<String>>(identity: I) -> Self {
        Self::ImageNotFound {
            identity: identity.into(),
        }
    }
}

impl PeerConfigError {
    /// Create an unwritable error
    pub fn unwritable<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Unwritable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed document error
    pub fn malformed<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "timestamp": chrono::Utc::now(),
        });

        (status, Json(body)).into_response()
    }
}
