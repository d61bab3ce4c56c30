//! Lazily generated, persisted thumbnails with per-identity single-flight

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::generator::{RenderError, THUMBNAIL_EXTENSION, ThumbnailGenerator};
use super::record::{ThumbnailMetadata, ThumbnailRecord};
use crate::errors::{CatalogError, CatalogResult};
use crate::images::{ImageIdentity, ImageRecord, ImageSnapshot, ScanDelta};
use crate::utils::write_atomic;

const METADATA_EXTENSION: &str = "json";

/// Prefix `tempfile` gives its temporary files
const TEMP_FILE_PREFIX: &str = ".tmp";

/// Cache state for one identity
#[derive(Debug, Clone, Default)]
struct CacheSlot {
    record: Option<ThumbnailRecord>,
    /// Source changed since `record` was generated; artifact kept until replaced
    stale: bool,
    failure: Option<GenerationFailure>,
}

/// A remembered failed generation, replayed to callers during the backoff
#[derive(Debug, Clone)]
struct GenerationFailure {
    error: CatalogError,
    source_modified: chrono::DateTime<Utc>,
    source_size: u64,
    failed_at: Instant,
}

impl GenerationFailure {
    fn applies_to(&self, image: &ImageRecord, backoff: Duration) -> bool {
        self.source_modified == image.modified
            && self.source_size == image.size
            && self.failed_at.elapsed() < backoff
    }
}

/// Result of the startup reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Valid thumbnails from a previous run taken over without regenerating
    pub adopted: usize,
    /// Files deleted because no current image owns them
    pub removed: usize,
}

/// Owns every thumbnail record, keyed by image identity
pub struct ThumbnailCache {
    thumbnail_dir: PathBuf,
    generator: Arc<dyn ThumbnailGenerator>,
    failure_backoff: Duration,
    slots: RwLock<HashMap<ImageIdentity, CacheSlot>>,
    /// One lock per identity with a generation or eviction in progress
    flights: Mutex<HashMap<ImageIdentity, Arc<Mutex<()>>>>,
    generated_total: AtomicU64,
}

impl ThumbnailCache {
    pub fn new(
        thumbnail_dir: PathBuf,
        generator: Arc<dyn ThumbnailGenerator>,
        failure_backoff: Duration,
    ) -> Self {
        Self {
            thumbnail_dir,
            generator,
            failure_backoff,
            slots: RwLock::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            generated_total: AtomicU64::new(0),
        }
    }

    pub fn thumbnail_dir(&self) -> &Path {
        &self.thumbnail_dir
    }

    /// Artifact location for an identity
    pub fn artifact_path(&self, identity: &ImageIdentity) -> PathBuf {
        self.thumbnail_dir
            .join(format!("{}.{}", identity, THUMBNAIL_EXTENSION))
    }

    fn metadata_path(&self, identity: &ImageIdentity) -> PathBuf {
        self.thumbnail_dir
            .join(format!("{}.{}", identity, METADATA_EXTENSION))
    }

    /// Number of thumbnails generated since startup
    pub fn generated_total(&self) -> u64 {
        self.generated_total.load(Ordering::Relaxed)
    }

    /// Return a valid thumbnail for `image`, generating it if missing or stale
    ///
    /// Concurrent calls for the same identity share one generation. The
    /// generation runs on its own task: a caller that goes away does not
    /// cancel it and its result is cached either way.
    pub async fn ensure(self: &Arc<Self>, image: &ImageRecord) -> CatalogResult<ThumbnailRecord> {
        if let Some(outcome) = self.lookup(image).await {
            return outcome;
        }

        let this = Arc::clone(self);
        let owned = image.clone();
        tokio::spawn(async move { this.ensure_exclusive(&owned).await })
            .await
            .map_err(|e| {
                CatalogError::generation_failed(
                    image.identity.as_str(),
                    format!("generation task failed: {e}"),
                )
            })?
    }

    /// Answer from cached state only, `None` when generation is required
    async fn lookup(&self, image: &ImageRecord) -> Option<CatalogResult<ThumbnailRecord>> {
        let slot = self.slots.read().await.get(&image.identity).cloned()?;

        if let Some(record) = slot.record
            && !slot.stale
            && record.matches_source(image)
        {
            if fs::metadata(&record.path).await.is_ok() {
                return Some(Ok(record));
            }
            debug!(
                "Thumbnail artifact for {} disappeared, regenerating",
                image.relative_path
            );
            return None;
        }

        match slot.failure {
            Some(failure) if failure.applies_to(image, self.failure_backoff) => {
                Some(Err(failure.error))
            }
            _ => None,
        }
    }

    async fn ensure_exclusive(&self, image: &ImageRecord) -> CatalogResult<ThumbnailRecord> {
        let flight = self.flight_lock(&image.identity).await;
        let _guard = flight.lock().await;

        // Whoever held the lock before us may already have produced the result
        let outcome = match self.lookup(image).await {
            Some(outcome) => outcome,
            None => self.generate_and_record(image).await,
        };

        self.release_flight(&image.identity, &flight).await;
        outcome
    }

    async fn flight_lock(&self, identity: &ImageIdentity) -> Arc<Mutex<()>> {
        let mut flights = self.flights.lock().await;
        flights.entry(identity.clone()).or_default().clone()
    }

    /// Drop the flight entry once no other caller is queued on it
    ///
    /// Callers clone the lock while holding `flights`, so with the map locked
    /// a strong count of two means only the map and `flight` remain. Removing
    /// it earlier would let a newcomer create a second lock and run beside a
    /// queued waiter.
    async fn release_flight(&self, identity: &ImageIdentity, flight: &Arc<Mutex<()>>) {
        let mut flights = self.flights.lock().await;
        if Arc::strong_count(flight) == 2
            && flights
                .get(identity)
                .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            flights.remove(identity);
        }
    }

    async fn generate_and_record(&self, image: &ImageRecord) -> CatalogResult<ThumbnailRecord> {
        let started = Instant::now();
        let result = self.generate(image).await;

        let mut slots = self.slots.write().await;
        let slot = slots.entry(image.identity.clone()).or_default();
        match &result {
            Ok(record) => {
                slot.record = Some(record.clone());
                slot.stale = false;
                slot.failure = None;
                self.generated_total.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Generated thumbnail for {} ({} bytes) in {}ms",
                    image.relative_path,
                    record.bytes_on_disk,
                    started.elapsed().as_millis()
                );
            }
            Err(error) => {
                slot.failure = Some(GenerationFailure {
                    error: error.clone(),
                    source_modified: image.modified,
                    source_size: image.size,
                    failed_at: Instant::now(),
                });
                warn!(
                    "Thumbnail generation failed for {}, retrying after {}: {}",
                    image.relative_path,
                    humantime::format_duration(self.failure_backoff),
                    error
                );
            }
        }

        result
    }

    async fn generate(&self, image: &ImageRecord) -> CatalogResult<ThumbnailRecord> {
        let identity = image.identity.as_str();
        debug!(
            "Creating thumbnail {} from {}",
            self.artifact_path(&image.identity).display(),
            image.path.display()
        );

        let generator = Arc::clone(&self.generator);
        let source = image.path.clone();
        let bytes = tokio::task::spawn_blocking(move || generator.render(&source))
            .await
            .map_err(|e| CatalogError::generation_failed(identity, e.to_string()))?
            .map_err(|e| match e {
                RenderError::Decode(message) => {
                    CatalogError::unsupported_image(&image.relative_path, message)
                }
                other => CatalogError::generation_failed(identity, other.to_string()),
            })?;

        let artifact = self.artifact_path(&image.identity);
        let bytes_on_disk = bytes.len() as u64;
        write_atomic(&artifact, bytes)
            .await
            .map_err(|e| CatalogError::generation_failed(identity, e.to_string()))?;

        let record = ThumbnailRecord {
            identity: image.identity.clone(),
            path: artifact,
            source_modified: image.modified,
            source_size: image.size,
            generated_at: Utc::now(),
            bytes_on_disk,
        };

        // The sidecar only speeds up the next startup; losing it costs a regeneration
        let metadata = ThumbnailMetadata::for_record(image, &record);
        match serde_json::to_vec_pretty(&metadata) {
            Ok(json) => {
                if let Err(e) = write_atomic(&self.metadata_path(&image.identity), json).await {
                    warn!("Failed to write thumbnail metadata for {}: {}", identity, e);
                }
            }
            Err(e) => warn!("Failed to serialize thumbnail metadata for {}: {}", identity, e),
        }

        Ok(record)
    }

    /// Keep the artifact but force regeneration on the next `ensure`
    pub async fn mark_stale(&self, identity: &ImageIdentity) {
        if let Some(slot) = self.slots.write().await.get_mut(identity) {
            slot.stale = true;
            slot.failure = None;
            debug!("Marked thumbnail {} stale", identity);
        }
    }

    /// Drop the record and delete the persisted artifact
    pub async fn evict(&self, identity: &ImageIdentity) {
        let flight = self.flight_lock(identity).await;
        let _guard = flight.lock().await;

        self.slots.write().await.remove(identity);
        for path in [self.artifact_path(identity), self.metadata_path(identity)] {
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        self.release_flight(identity, &flight).await;
    }

    /// Forward the result of an image scan
    pub async fn apply_delta(&self, delta: &ScanDelta) {
        for identity in &delta.changed {
            self.mark_stale(identity).await;
        }
        for identity in &delta.removed {
            self.evict(identity).await;
        }
    }

    /// Current valid-or-stale records ordered by identity
    pub async fn records(&self) -> Vec<ThumbnailRecord> {
        let mut records: Vec<ThumbnailRecord> = self
            .slots
            .read()
            .await
            .values()
            .filter_map(|slot| slot.record.clone())
            .collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        records
    }

    /// Align the thumbnail directory with a freshly scanned snapshot
    ///
    /// Deletes thumbnails, sidecars and leftover temp files that belong to no
    /// current image, and adopts thumbnails whose sidecar matches the current
    /// source. Must only be given a snapshot from a successful scan.
    pub async fn reconcile(&self, snapshot: &ImageSnapshot) -> std::io::Result<ReconcileStats> {
        fs::create_dir_all(&self.thumbnail_dir).await?;

        let mut file_names = Vec::new();
        let mut entries = fs::read_dir(&self.thumbnail_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.is_ok_and(|t| t.is_file())
                && let Some(name) = entry.file_name().to_str()
            {
                file_names.push(name.to_string());
            }
        }

        let mut stats = ReconcileStats::default();
        for name in &file_names {
            let path = self.thumbnail_dir.join(name);

            if name.starts_with(TEMP_FILE_PREFIX) {
                remove_logged(&path, &mut stats).await;
                continue;
            }

            let Some((stem, extension)) = name.rsplit_once('.') else {
                continue;
            };
            if extension != THUMBNAIL_EXTENSION && extension != METADATA_EXTENSION {
                continue;
            }
            let Some(identity) = ImageIdentity::parse(stem) else {
                debug!("Leaving unrecognized file {} in thumbnail directory", name);
                continue;
            };

            match snapshot.get(&identity) {
                None => remove_logged(&path, &mut stats).await,
                Some(image) if extension == METADATA_EXTENSION => {
                    if self.adopt(image).await {
                        stats.adopted += 1;
                    }
                }
                Some(_) => {}
            }
        }

        info!(
            "Thumbnail reconciliation: adopted={} removed={}",
            stats.adopted, stats.removed
        );
        Ok(stats)
    }

    /// Take over a thumbnail from a previous run if its sidecar still matches
    async fn adopt(&self, image: &ImageRecord) -> bool {
        let Ok(json) = fs::read(self.metadata_path(&image.identity)).await else {
            return false;
        };
        let metadata: ThumbnailMetadata = match serde_json::from_slice(&json) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Ignoring unreadable thumbnail metadata for {}: {}", image.identity, e);
                return false;
            }
        };
        if !metadata.matches_source(image) {
            return false;
        }

        let artifact = self.artifact_path(&image.identity);
        let Ok(artifact_meta) = fs::metadata(&artifact).await else {
            return false;
        };

        let record = ThumbnailRecord {
            identity: image.identity.clone(),
            path: artifact,
            source_modified: metadata.source_modified,
            source_size: metadata.source_size,
            generated_at: metadata.generated_at,
            bytes_on_disk: artifact_meta.len(),
        };
        self.slots
            .write()
            .await
            .entry(image.identity.clone())
            .or_default()
            .record = Some(record);
        true
    }
}

async fn remove_logged(path: &Path, stats: &mut ReconcileStats) {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed orphaned thumbnail file {}", path.display());
            stats.removed += 1;
        }
        Err(e) => warn!("Failed to remove orphaned file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageStore;
    use std::sync::atomic::AtomicUsize;
    use std::time::SystemTime;
    use tempfile::TempDir;

    /// Counts renders and fails for files whose name contains "corrupt"
    struct CountingGenerator {
        renders: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
        delay: Duration,
    }

    impl CountingGenerator {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                renders: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                delay,
            })
        }

        fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }

        /// Most renders that ever ran at the same time
        fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    impl ThumbnailGenerator for CountingGenerator {
        fn render(&self, source: &Path) -> Result<Vec<u8>, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            if source.to_string_lossy().contains("corrupt") {
                return Err(RenderError::Decode("bad magic".to_string()));
            }
            let mut bytes = b"thumb:".to_vec();
            bytes.extend(std::fs::read(source)?);
            Ok(bytes)
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        image_dir: PathBuf,
        store: ImageStore,
        cache: Arc<ThumbnailCache>,
        generator: Arc<CountingGenerator>,
    }

    fn fixture(files: &[&str], backoff: Duration, delay: Duration) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let image_dir = temp_dir.path().join("images");
        std::fs::create_dir_all(&image_dir).unwrap();
        for file in files {
            std::fs::write(image_dir.join(file), file.as_bytes()).unwrap();
        }

        let generator = CountingGenerator::new(delay);
        let cache = Arc::new(ThumbnailCache::new(
            temp_dir.path().join("thumbs"),
            generator.clone(),
            backoff,
        ));

        Fixture {
            store: ImageStore::new(image_dir.clone()),
            image_dir,
            _temp_dir: temp_dir,
            cache,
            generator,
        }
    }

    async fn image(store: &ImageStore, relative_path: &str) -> ImageRecord {
        store
            .get(&ImageIdentity::from_relative_path(relative_path))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let a = image(&f.store, "a.png").await;

        let first = f.cache.ensure(&a).await.unwrap();
        let second = f.cache.ensure(&a).await.unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(f.generator.renders(), 1);
        assert_eq!(f.cache.generated_total(), 1);
        assert_eq!(std::fs::read(&first.path).unwrap(), b"thumb:a.png");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_generates_once() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::from_millis(50));
        f.store.scan().await.unwrap();
        let a = image(&f.store, "a.png").await;

        let calls = (0..16).map(|_| {
            let cache = f.cache.clone();
            let a = a.clone();
            tokio::spawn(async move { cache.ensure(&a).await })
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(results.len(), 16);
        let paths: Vec<PathBuf> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().path)
            .collect();
        assert!(paths.iter().all(|p| *p == paths[0]));
        assert_eq!(f.generator.renders(), 1);
    }

    #[tokio::test]
    async fn test_changed_source_regenerates_in_place() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let original = f.cache.ensure(&image(&f.store, "a.png").await).await.unwrap();

        let source = f.image_dir.join("a.png");
        std::fs::write(&source, b"a.png v2").unwrap();
        let file = std::fs::File::options().write(true).open(&source).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(120))
            .unwrap();

        let delta = f.store.scan().await.unwrap();
        assert_eq!(delta.changed.len(), 1);
        f.cache.apply_delta(&delta).await;

        let refreshed = f.cache.ensure(&image(&f.store, "a.png").await).await.unwrap();
        assert_eq!(refreshed.path, original.path);
        assert_ne!(refreshed.source_modified, original.source_modified);
        assert_eq!(f.generator.renders(), 2);
        assert_eq!(std::fs::read(&refreshed.path).unwrap(), b"thumb:a.png v2");

        let artifacts = std::fs::read_dir(f.cache.thumbnail_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == THUMBNAIL_EXTENSION)
            })
            .count();
        assert_eq!(artifacts, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dropped_requester_does_not_cancel_generation() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::from_millis(200));
        f.store.scan().await.unwrap();
        let a = image(&f.store, "a.png").await;

        let requester = {
            let cache = f.cache.clone();
            let a = a.clone();
            tokio::spawn(async move { cache.ensure(&a).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        requester.abort();
        assert!(requester.await.unwrap_err().is_cancelled());

        let artifact = f.cache.artifact_path(&a.identity);
        for _ in 0..100 {
            if artifact.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(artifact.exists());

        let record = f.cache.ensure(&a).await.unwrap();
        assert_eq!(record.path, artifact);
        assert_eq!(f.generator.renders(), 1);
    }

    #[tokio::test]
    async fn test_mark_stale_keeps_artifact_until_next_ensure() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let a = image(&f.store, "a.png").await;
        let first = f.cache.ensure(&a).await.unwrap();

        f.cache.mark_stale(&a.identity).await;
        assert!(first.path.exists());
        assert_eq!(f.cache.records().await, vec![first.clone()]);
        assert_eq!(f.generator.renders(), 1);

        let second = f.cache.ensure(&a).await.unwrap();
        assert_eq!(second.path, first.path);
        assert!(second.generated_at >= first.generated_at);
        assert_eq!(f.generator.renders(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_uncached_failures_never_render_concurrently() {
        let f = fixture(&["corrupt.png"], Duration::ZERO, Duration::from_millis(30));
        f.store.scan().await.unwrap();
        let bad = image(&f.store, "corrupt.png").await;

        let calls = (0..8).map(|_| {
            let cache = f.cache.clone();
            let bad = bad.clone();
            tokio::spawn(async move { cache.ensure(&bad).await })
        });
        for result in futures::future::join_all(calls).await {
            assert!(result.unwrap().is_err());
        }

        assert_eq!(f.generator.max_active(), 1);
        assert!(f.cache.flights.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_remembered_during_backoff() {
        let f = fixture(&["corrupt.png"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let bad = image(&f.store, "corrupt.png").await;

        let first = f.cache.ensure(&bad).await.unwrap_err();
        assert!(matches!(first, CatalogError::UnsupportedImage { .. }));
        let second = f.cache.ensure(&bad).await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(f.generator.renders(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_retried_after_backoff() {
        let f = fixture(&["corrupt.png"], Duration::ZERO, Duration::ZERO);
        f.store.scan().await.unwrap();
        let bad = image(&f.store, "corrupt.png").await;

        assert!(f.cache.ensure(&bad).await.is_err());
        assert!(f.cache.ensure(&bad).await.is_err());
        assert_eq!(f.generator.renders(), 2);
    }

    #[tokio::test]
    async fn test_removed_image_evicts_artifact() {
        let f = fixture(&["a.png", "b.jpg"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let b = f.cache.ensure(&image(&f.store, "b.jpg").await).await.unwrap();
        assert!(b.path.exists());

        std::fs::remove_file(f.image_dir.join("b.jpg")).unwrap();
        let delta = f.store.scan().await.unwrap();
        f.cache.apply_delta(&delta).await;

        assert!(!b.path.exists());
        assert!(f.cache.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_regenerated() {
        let f = fixture(&["a.png"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        let a = image(&f.store, "a.png").await;

        let record = f.cache.ensure(&a).await.unwrap();
        std::fs::remove_file(&record.path).unwrap();

        let again = f.cache.ensure(&a).await.unwrap();
        assert!(again.path.exists());
        assert_eq!(f.generator.renders(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_removes_orphans_and_adopts_valid() {
        let f = fixture(&["a.png", "b.jpg"], Duration::from_secs(30), Duration::ZERO);
        f.store.scan().await.unwrap();
        f.cache.ensure(&image(&f.store, "a.png").await).await.unwrap();
        let b = f.cache.ensure(&image(&f.store, "b.jpg").await).await.unwrap();

        // Simulate a crash: b.jpg vanished while the service was down
        std::fs::remove_file(f.image_dir.join("b.jpg")).unwrap();
        let thumbs = f.cache.thumbnail_dir().to_path_buf();
        std::fs::write(thumbs.join(".tmpXYZ123"), b"partial").unwrap();
        std::fs::write(thumbs.join("README"), b"keep me").unwrap();

        let restarted_generator = CountingGenerator::new(Duration::ZERO);
        let restarted = Arc::new(ThumbnailCache::new(
            thumbs.clone(),
            restarted_generator.clone(),
            Duration::from_secs(30),
        ));
        let store = ImageStore::new(f.image_dir.clone());
        store.scan().await.unwrap();

        let stats = restarted.reconcile(&*store.snapshot().await).await.unwrap();
        assert_eq!(stats.adopted, 1);
        assert_eq!(stats.removed, 3);
        assert!(!b.path.exists());
        assert!(!thumbs.join(".tmpXYZ123").exists());
        assert!(thumbs.join("README").exists());

        restarted.ensure(&image(&store, "a.png").await).await.unwrap();
        assert_eq!(restarted_generator.renders(), 0);
    }
}
