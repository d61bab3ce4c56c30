//! Catalog documents served to Teams
//!
//! A catalog is rebuilt for every request from the current image snapshot and
//! whatever thumbnails the cache can provide. It never carries timestamps, so
//! two builds over the same directory serialize to identical bytes.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::{TeamsVersion, ThumbnailFailurePolicy};
use crate::images::ImageRecord;
use crate::thumbnails::ThumbnailCache;

/// One background image as the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub filetype: String,
    pub id: String,
    pub name: String,
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumb_src: Option<String>,
}

/// Top-level catalog shape, which depends on the Teams client generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogDocument {
    /// Classic Teams expects a bare array
    Legacy(Vec<CatalogEntry>),
    /// New Teams wraps the entries in an object
    Evergreen {
        #[serde(rename = "videoBackgroundImages")]
        video_background_images: Vec<CatalogEntry>,
    },
}

impl CatalogDocument {
    pub fn new(version: TeamsVersion, entries: Vec<CatalogEntry>) -> Self {
        match version {
            TeamsVersion::V1 => Self::Legacy(entries),
            TeamsVersion::V2 => Self::Evergreen {
                video_background_images: entries,
            },
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        match self {
            Self::Legacy(entries) => entries,
            Self::Evergreen {
                video_background_images,
            } => video_background_images,
        }
    }
}

/// Composes image records and thumbnail availability into a catalog
#[derive(Debug, Clone, Copy)]
pub struct CatalogBuilder {
    teams_version: TeamsVersion,
    failure_policy: ThumbnailFailurePolicy,
}

impl CatalogBuilder {
    pub fn new(teams_version: TeamsVersion, failure_policy: ThumbnailFailurePolicy) -> Self {
        Self {
            teams_version,
            failure_policy,
        }
    }

    /// Build the catalog for `images`, generating missing thumbnails on the way
    ///
    /// Thumbnails are ensured concurrently; entries keep the order of
    /// `images`. A thumbnail failure only affects its own entry.
    pub async fn build(&self, images: &[ImageRecord], cache: &Arc<ThumbnailCache>) -> CatalogDocument {
        let thumbnails = join_all(images.iter().map(|image| cache.ensure(image))).await;
        let prefix = self.teams_version.url_prefix();

        let mut entries = Vec::with_capacity(images.len());
        for (image, thumbnail) in images.iter().zip(thumbnails) {
            let has_thumbnail = match thumbnail {
                Ok(_) => true,
                Err(e) => {
                    debug!("Catalog entry {} has no thumbnail: {}", image.relative_path, e);
                    false
                }
            };
            if !has_thumbnail && self.failure_policy == ThumbnailFailurePolicy::Omit {
                continue;
            }
            entries.push(entry_for(image, prefix, has_thumbnail));
        }

        CatalogDocument::new(self.teams_version, entries)
    }
}

fn entry_for(image: &ImageRecord, prefix: &str, has_thumbnail: bool) -> CatalogEntry {
    let url_name = encode_url_name(&image.url_name());
    CatalogEntry {
        filetype: image.served_filetype(),
        id: image.catalog_id().to_string(),
        name: image.stem().to_string(),
        src: format!("{}/images/{}", prefix, url_name),
        thumb_src: has_thumbnail.then(|| format!("{}/thumbnails/{}", prefix, url_name)),
    }
}

/// Percent-encode every path segment, keeping the separators
pub fn encode_url_name(url_name: &str) -> String {
    url_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
