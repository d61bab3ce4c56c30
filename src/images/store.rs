//! Image directory scanning with atomically swapped snapshots

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::record::{ImageIdentity, ImageRecord};
use crate::errors::{CatalogError, CatalogResult};

/// Immutable view of the image directory at the time of one scan
#[derive(Debug, Default)]
pub struct ImageSnapshot {
    /// Records in lexical order of their relative path
    records: Vec<ImageRecord>,
    index: HashMap<ImageIdentity, usize>,
    scanned_at: Option<DateTime<Utc>>,
}

impl ImageSnapshot {
    pub fn new(mut records: Vec<ImageRecord>, scanned_at: DateTime<Utc>) -> Self {
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.identity.clone(), i))
            .collect();

        Self {
            records,
            index,
            scanned_at: Some(scanned_at),
        }
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, identity: &ImageIdentity) -> Option<&ImageRecord> {
        self.index.get(identity).map(|&i| &self.records[i])
    }

    pub fn contains(&self, identity: &ImageIdentity) -> bool {
        self.index.contains_key(identity)
    }

    /// Resolve a name requested by the client to an image
    ///
    /// The exact relative path wins; otherwise the last extension is dropped,
    /// which undoes the `.jpg` suffix added to remapped types.
    pub fn find_by_url_name(&self, url_name: &str) -> Option<&ImageRecord> {
        let url_name = url_name.trim_start_matches('/');
        if let Some(record) = self.get(&ImageIdentity::from_relative_path(url_name)) {
            return Some(record);
        }

        let (base, _) = url_name.rsplit_once('.')?;
        if base.ends_with('/') || base.is_empty() {
            return None;
        }
        self.get(&ImageIdentity::from_relative_path(base))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the scan producing this snapshot finished, `None` before the first scan
    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.scanned_at
    }
}

/// Differences between two consecutive snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDelta {
    pub added: Vec<ImageIdentity>,
    /// Present in both snapshots with different mtime or size
    pub changed: Vec<ImageIdentity>,
    pub removed: Vec<ImageIdentity>,
}

impl ScanDelta {
    pub fn between(previous: &ImageSnapshot, next: &ImageSnapshot) -> Self {
        let mut delta = Self::default();

        for record in next.records() {
            match previous.get(&record.identity) {
                None => delta.added.push(record.identity.clone()),
                Some(old) if !old.same_source(record) => {
                    delta.changed.push(record.identity.clone())
                }
                Some(_) => {}
            }
        }

        delta.removed = previous
            .records()
            .iter()
            .filter(|record| !next.contains(&record.identity))
            .map(|record| record.identity.clone())
            .collect();

        delta
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Enumerates the configured image directory and owns the current snapshot
pub struct ImageStore {
    image_dir: PathBuf,
    snapshot: RwLock<Arc<ImageSnapshot>>,
    /// Serializes scans so snapshot swaps never interleave
    scan_lock: Mutex<()>,
}

impl ImageStore {
    pub fn new(image_dir: PathBuf) -> Self {
        Self {
            image_dir,
            snapshot: RwLock::new(Arc::new(ImageSnapshot::default())),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// The snapshot produced by the last successful scan
    pub async fn snapshot(&self) -> Arc<ImageSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Look up an image in the current snapshot
    pub async fn get(&self, identity: &ImageIdentity) -> CatalogResult<ImageRecord> {
        self.snapshot
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or_else(|| CatalogError::image_not_found(identity.as_str()))
    }

    /// Re-read the image directory and replace the snapshot
    ///
    /// On `DirectoryUnavailable` the previous snapshot stays in place.
    pub async fn scan(&self) -> CatalogResult<ScanDelta> {
        let _guard = self.scan_lock.lock().await;

        let records = self.enumerate().await?;
        let next = ImageSnapshot::new(records, Utc::now());

        let mut current = self.snapshot.write().await;
        let delta = ScanDelta::between(&current, &next);
        *current = Arc::new(next);

        if delta.is_empty() {
            debug!("Image scan found no changes ({} images)", current.len());
        } else {
            info!(
                "Image scan: {} images, added={} changed={} removed={}",
                current.len(),
                delta.added.len(),
                delta.changed.len(),
                delta.removed.len()
            );
        }

        Ok(delta)
    }

    async fn enumerate(&self) -> CatalogResult<Vec<ImageRecord>> {
        let location = self.image_dir.display().to_string();
        let unavailable = |e: std::io::Error| CatalogError::directory_unavailable(&location, e.to_string());

        let root = fs::canonicalize(&self.image_dir).await.map_err(unavailable)?;
        if !fs::metadata(&root).await.map_err(unavailable)?.is_dir() {
            return Err(CatalogError::directory_unavailable(&location, "not a directory"));
        }

        let mut images = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let listed = match fs::read_dir(&dir).await {
                Ok(mut entries) => {
                    collect_entries(&root, &mut entries, &mut pending, &mut images).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = listed {
                // Only the image directory itself is required to be readable
                if dir == root {
                    return Err(unavailable(e));
                }
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            }
        }

        Ok(images)
    }
}

async fn collect_entries(
    root: &Path,
    entries: &mut fs::ReadDir,
    pending: &mut Vec<PathBuf>,
    images: &mut Vec<ImageRecord>,
) -> std::io::Result<()> {
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                debug!("Failed to read file type of {}: {}", path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() {
            pending.push(path);
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping file with non UTF-8 name: {:?}", path);
            continue;
        };
        if !ImageRecord::is_accepted(file_name) {
            continue;
        }

        // Follows symlinks so linked images are served too
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                debug!("Failed to stat {}: {}", path.display(), e);
                continue;
            }
        };

        let Some(relative_path) = relative_path(root, &path) else {
            continue;
        };
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        images.push(ImageRecord::new(relative_path, path, modified, metadata.len()));
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.iter().map(|part| part.to_str()).collect();
    Some(parts?.join("/"))
}
