//! Catalog service
//!
//! Ties the image store, the thumbnail cache and the catalog builder together
//! for the request handlers. Every catalog request rescans the image
//! directory, forwards the differences to the cache and builds a fresh
//! document from the resulting snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::catalog::{CatalogBuilder, CatalogDocument};
use crate::config::Config;
use crate::errors::{AppResult, CatalogError};
use crate::images::{ImageRecord, ImageSnapshot, ImageStore};
use crate::thumbnails::{ImageThumbnailGenerator, ThumbnailCache, ThumbnailRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The last scan succeeded
    Healthy,
    /// The last scan failed, the last good snapshot is being served
    Stale,
    /// No scan has succeeded since startup
    Degraded,
}

/// Health report returned by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub image_dir: String,
    pub images: usize,
    pub thumbnails: usize,
    pub thumbnails_generated: u64,
    pub last_scan: Option<DateTime<Utc>>,
    pub consecutive_scan_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub version: &'static str,
}

#[derive(Debug, Default)]
struct ScanHealth {
    ever_succeeded: bool,
    consecutive_failures: u32,
    last_error: Option<String>,
}

pub struct CatalogService {
    store: Arc<ImageStore>,
    cache: Arc<ThumbnailCache>,
    builder: CatalogBuilder,
    health: RwLock<ScanHealth>,
}

impl CatalogService {
    pub fn new(store: Arc<ImageStore>, cache: Arc<ThumbnailCache>, builder: CatalogBuilder) -> Self {
        Self {
            store,
            cache,
            builder,
            health: RwLock::new(ScanHealth::default()),
        }
    }

    /// Wire up the engine described by `config`
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(ImageStore::new(config.image_dir.clone()));
        let cache = Arc::new(ThumbnailCache::new(
            config.thumbnail_dir.clone(),
            Arc::new(ImageThumbnailGenerator::new(config.thumbnail_size)),
            config.thumbnail_failure_backoff,
        ));
        let builder = CatalogBuilder::new(config.teams_version, config.thumbnail_failure_policy);
        Self::new(store, cache, builder)
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// First scan plus cleanup of thumbnails left behind by earlier runs
    ///
    /// Reconciliation only runs against a successful scan; with an unreadable
    /// image directory every thumbnail would look orphaned.
    pub async fn initialize(&self) -> Result<(), CatalogError> {
        self.scan().await?;
        let snapshot = self.store.snapshot().await;
        match self.cache.reconcile(&snapshot).await {
            Ok(stats) => info!(
                "Catalog ready: {} images, {} thumbnails adopted, {} orphaned files removed",
                snapshot.len(),
                stats.adopted,
                stats.removed
            ),
            Err(e) => warn!(
                "Failed to reconcile thumbnail directory {}: {}",
                self.cache.thumbnail_dir().display(),
                e
            ),
        }
        Ok(())
    }

    /// Rescan the image directory, falling back to the last good snapshot
    pub async fn refresh(&self) -> Arc<ImageSnapshot> {
        if let Err(e) = self.scan().await {
            warn!("Serving last known image list: {}", e);
        }
        self.store.snapshot().await
    }

    async fn scan(&self) -> Result<(), CatalogError> {
        match self.store.scan().await {
            Ok(delta) => {
                self.cache.apply_delta(&delta).await;
                let mut health = self.health.write().await;
                health.ever_succeeded = true;
                health.consecutive_failures = 0;
                health.last_error = None;
                Ok(())
            }
            Err(e) => {
                let mut health = self.health.write().await;
                health.consecutive_failures += 1;
                health.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Build the catalog document for the current directory contents
    pub async fn catalog(&self) -> CatalogDocument {
        let snapshot = self.refresh().await;
        self.builder.build(snapshot.records(), &self.cache).await
    }

    /// Resolve a requested url-name to an image, rescanning once on a miss
    pub async fn image_for(&self, url_name: &str) -> AppResult<ImageRecord> {
        if let Some(record) = self.store.snapshot().await.find_by_url_name(url_name) {
            return Ok(record.clone());
        }
        self.refresh()
            .await
            .find_by_url_name(url_name)
            .cloned()
            .ok_or_else(|| CatalogError::image_not_found(url_name).into())
    }

    /// Thumbnail for a requested url-name, generated if needed
    pub async fn thumbnail_for(&self, url_name: &str) -> AppResult<ThumbnailRecord> {
        let image = self.image_for(url_name).await?;
        Ok(self.cache.ensure(&image).await?)
    }

    /// Images in the current snapshot, for the listing page
    pub async fn images(&self) -> Vec<ImageRecord> {
        self.refresh().await.records().to_vec()
    }

    pub async fn thumbnails(&self) -> Vec<ThumbnailRecord> {
        self.cache.records().await
    }

    pub async fn health(&self) -> HealthReport {
        let snapshot = self.store.snapshot().await;
        let health = self.health.read().await;

        let status = if !health.ever_succeeded {
            HealthStatus::Degraded
        } else if health.consecutive_failures > 0 {
            HealthStatus::Stale
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            image_dir: self.store.image_dir().display().to_string(),
            images: snapshot.len(),
            thumbnails: self.cache.records().await.len(),
            thumbnails_generated: self.cache.generated_total(),
            last_scan: snapshot.scanned_at(),
            consecutive_scan_failures: health.consecutive_failures,
            last_error: health.last_error.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
