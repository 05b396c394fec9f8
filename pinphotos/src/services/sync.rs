//! Collection sync engine
//!
//! Keeps each pin's photo collection in step with the search API:
//! picks a random result page, reconciles it against the stored records
//! in one transaction, then downloads the images in the background.
//!
//! A pin syncs at most once at a time and a photo downloads at most once
//! at a time. Image download failures are not reported as errors; the
//! photo simply stays `NotLoaded` until the next sync or view.

use crate::client::{PhotoApi, SearchQuery};
use crate::config::STALE_TEMP_FILE_AGE;
use crate::database::{DownloadStatus, Photo, Pin, Repository};
use crate::error::Result;
use crate::events::{Event, EventBus};
use crate::services::inflight::InFlight;
use crate::services::reconcile::plan_reconciliation;
use crate::storage::BlobStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Result of a `sync` call
#[derive(Debug)]
pub enum SyncOutcome {
    Synced(SyncReport),
    /// A sync for this pin is already running. Nothing was changed.
    Busy,
}

/// Summary of a finished sync
#[derive(Debug)]
pub struct SyncReport {
    pub pin_id: String,
    /// Photos the pin holds after the sync
    pub photo_count: usize,
    /// Slots refilled from the search result
    pub reconciled: usize,
    pub total_photos: i64,
    /// Image downloads started for the reconciled slots
    pub downloads: DownloadBatch,
}

/// Result of opening a pin's album
#[derive(Debug)]
pub enum CollectionState {
    /// The pin had no photos and a sync ran
    Synced(SyncReport),
    /// Stored photos were kept; downloads started for those without an image
    Existing {
        photos: Vec<Photo>,
        downloads: DownloadBatch,
    },
    Busy,
}

/// How a single image download ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Loaded,
    /// Image was already in the blob store; no network call
    Cached,
    /// Another download of this photo is running
    InFlight,
    /// Fetch or store failed; the photo is back to `NotLoaded`
    Failed,
    /// The photo record no longer exists
    Missing,
}

/// Handles of background downloads
#[derive(Debug, Default)]
pub struct DownloadBatch {
    handles: Vec<JoinHandle<DownloadOutcome>>,
}

impl DownloadBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every download. Dropping the batch leaves them running only
    /// while the runtime stays up.
    pub async fn wait(self) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Download task failed: {}", e);
                    outcomes.push(DownloadOutcome::Failed);
                }
            }
        }
        outcomes
    }
}

/// Orchestrates search, reconciliation and image downloads
#[derive(Clone)]
pub struct SyncEngine {
    repo: Repository,
    blob_store: BlobStore,
    api: Arc<dyn PhotoApi>,
    events: EventBus,
    syncing_pins: InFlight,
    downloading_photos: InFlight,
    rng: Arc<Mutex<StdRng>>,
}

impl SyncEngine {
    pub fn new(
        repo: Repository,
        blob_store: BlobStore,
        api: Arc<dyn PhotoApi>,
        events: EventBus,
    ) -> Self {
        Self {
            repo,
            blob_store,
            api,
            events,
            syncing_pins: InFlight::new(),
            downloading_photos: InFlight::new(),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Use a fixed seed for page and photo selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether a sync is running for a pin
    pub fn is_syncing(&self, pin_id: &str) -> bool {
        self.syncing_pins.contains(pin_id)
    }

    /// Get a pin with its in-memory download flag
    pub async fn pin(&self, pin_id: &str) -> Result<Pin> {
        let mut pin = self.repo.get_pin(pin_id).await?;
        pin.is_downloading = self.is_syncing(pin_id);
        Ok(pin)
    }

    /// List all pins with their in-memory download flags
    pub async fn pins(&self) -> Result<Vec<Pin>> {
        let mut pins = self.repo.list_pins().await?;
        for pin in &mut pins {
            pin.is_downloading = self.is_syncing(&pin.id);
        }
        Ok(pins)
    }

    /// A pin's photos in slot order
    pub async fn photos(&self, pin_id: &str) -> Result<Vec<Photo>> {
        self.repo.list_photos(pin_id).await
    }

    /// Fetch a new random collection for a pin and download its images in the background.
    ///
    /// Returns `Busy` without touching any record if a sync for the pin is running.
    /// Search and commit failures are returned as errors and leave the records unchanged.
    pub async fn sync(&self, pin_id: &str) -> Result<SyncOutcome> {
        self.sync_collection(pin_id, true).await
    }

    /// Like `sync`, but no images are downloaded. The new photos stay
    /// `NotLoaded` until `ensure_collection` or `image_for_photo` fetches them.
    pub async fn sync_records(&self, pin_id: &str) -> Result<SyncOutcome> {
        self.sync_collection(pin_id, false).await
    }

    async fn sync_collection(&self, pin_id: &str, download: bool) -> Result<SyncOutcome> {
        let Some(_syncing) = self.syncing_pins.try_acquire(pin_id) else {
            tracing::info!("Sync already running for pin {}", pin_id);
            return Ok(SyncOutcome::Busy);
        };

        tracing::info!("Syncing photo collection for pin {}", pin_id);

        let pin = self.repo.get_pin(pin_id).await?;
        let query = {
            let mut rng = self.lock_rng();
            SearchQuery::for_pin(&pin, &mut *rng)
        };

        let result = self.api.search(&query).await.inspect_err(|e| {
            tracing::warn!("Photo search failed for pin {}: {}", pin_id, e);
        })?;

        tracing::debug!(
            "Search for pin {} page {}: {} photos available, {} on page",
            pin_id,
            query.page,
            result.total_photos,
            result.photos.len()
        );

        // Always plan against the stored records, never a cached copy
        let existing = self.repo.list_photos(pin_id).await?;
        let plan = {
            let mut rng = self.lock_rng();
            plan_reconciliation(&pin, existing, &result, &mut *rng)
        };

        let reconciled = self.repo.apply_plan(&plan).await.inspect_err(|e| {
            tracing::warn!("Failed to save collection for pin {}: {}", pin_id, e);
        })?;

        self.evict_unreferenced(plan.released_cache_keys()).await;

        let photo_count = plan.slots.len() + plan.retained.len();
        self.events.emit(Event::CollectionSynced {
            pin_id: pin_id.to_string(),
            photo_count,
            total_photos: plan.total_photos,
        });

        let downloads = if download {
            self.spawn_downloads(reconciled.iter().map(|p| p.id.clone()))
        } else {
            DownloadBatch::default()
        };

        tracing::info!(
            "Pin {} synced: {} photos ({} refreshed, {} removed), {} available",
            pin_id,
            photo_count,
            reconciled.len(),
            plan.deletes.len(),
            plan.total_photos
        );

        Ok(SyncOutcome::Synced(SyncReport {
            pin_id: pin_id.to_string(),
            photo_count,
            reconciled: reconciled.len(),
            total_photos: plan.total_photos,
            downloads,
        }))
    }

    /// Open a pin's album: sync if it has no photos yet, otherwise start
    /// downloads for photos whose image is missing.
    pub async fn ensure_collection(&self, pin_id: &str) -> Result<CollectionState> {
        self.repo.get_pin(pin_id).await?;
        let photos = self.repo.list_photos(pin_id).await?;

        if photos.is_empty() {
            return Ok(match self.sync(pin_id).await? {
                SyncOutcome::Synced(report) => CollectionState::Synced(report),
                SyncOutcome::Busy => CollectionState::Busy,
            });
        }

        let mut pending = Vec::new();
        for photo in &photos {
            if !self.blob_store.exists(&photo.cache_key).await? {
                pending.push(photo.id.clone());
            }
        }

        if !pending.is_empty() {
            tracing::debug!("Pin {}: {} photos need their image", pin_id, pending.len());
        }

        let downloads = self.spawn_downloads(pending);
        Ok(CollectionState::Existing { photos, downloads })
    }

    /// Image bytes for a photo cell. When the image is not cached yet a
    /// download is started and `None` is returned.
    pub async fn image_for_photo(&self, photo_id: &str) -> Result<Option<Vec<u8>>> {
        let photo = self.repo.get_photo(photo_id).await?;

        if let Some(data) = self.blob_store.read(&photo.cache_key).await? {
            return Ok(Some(data));
        }

        drop(self.spawn_downloads([photo.id]));
        Ok(None)
    }

    /// Download a photo's image into the blob store.
    pub async fn download_image(&self, photo_id: &str) -> Result<DownloadOutcome> {
        let Some(_downloading) = self.downloading_photos.try_acquire(photo_id) else {
            tracing::debug!("Download already running for photo {}", photo_id);
            return Ok(DownloadOutcome::InFlight);
        };

        // Repeats only when the slot was recycled while its image was being fetched
        loop {
            let Some(photo) = self.repo.find_photo(photo_id).await? else {
                return Ok(DownloadOutcome::Missing);
            };

            if self.blob_store.exists(&photo.cache_key).await? {
                if photo.status != DownloadStatus::Loaded
                    && self
                        .repo
                        .set_photo_status_for_key(&photo.id, &photo.cache_key, DownloadStatus::Loaded)
                        .await?
                {
                    self.emit_loaded(&photo);
                }
                return Ok(DownloadOutcome::Cached);
            }

            if !self
                .repo
                .set_photo_status_for_key(&photo.id, &photo.cache_key, DownloadStatus::Loading)
                .await?
            {
                tracing::debug!("Photo {} changed before its download started", photo.id);
                continue;
            }

            let stored = match self.api.fetch_image(&photo.url).await {
                Ok(data) => self.blob_store.write(&photo.cache_key, &data).await,
                Err(e) => Err(e),
            };

            if let Err(e) = stored {
                tracing::warn!("Image download failed for photo {}: {}", photo.id, e);
                if self
                    .repo
                    .set_photo_status_for_key(&photo.id, &photo.cache_key, DownloadStatus::NotLoaded)
                    .await?
                {
                    return Ok(DownloadOutcome::Failed);
                }
                continue;
            }

            if self
                .repo
                .set_photo_status_for_key(&photo.id, &photo.cache_key, DownloadStatus::Loaded)
                .await?
            {
                self.emit_loaded(&photo);
                return Ok(DownloadOutcome::Loaded);
            }

            tracing::debug!("Photo {} changed during download", photo.id);
            self.evict_unreferenced(vec![photo.cache_key]).await;
        }
    }

    /// Delete one photo and its cached image
    pub async fn delete_photo(&self, photo_id: &str) -> Result<Photo> {
        tracing::info!("Deleting photo: {}", photo_id);

        let photo = self.repo.delete_photo(photo_id).await?;
        self.evict_unreferenced(vec![photo.cache_key.clone()]).await;

        self.events.emit(Event::PhotoRemoved {
            pin_id: photo.pin_id.clone(),
            photo_id: photo.id.clone(),
        });

        Ok(photo)
    }

    /// Delete a pin with all its photos and cached images.
    ///
    /// Records are removed in one transaction; images are evicted after it commits.
    pub async fn delete_pin(&self, pin_id: &str) -> Result<usize> {
        tracing::info!("Deleting pin: {}", pin_id);

        let photos = self.repo.delete_pin(pin_id).await?;
        self.evict_unreferenced(photos.iter().map(|p| p.cache_key.clone()).collect())
            .await;

        self.events.emit(Event::PinRemoved {
            pin_id: pin_id.to_string(),
        });

        tracing::info!("Pin {} deleted with {} photos", pin_id, photos.len());
        Ok(photos.len())
    }

    /// Let the next sync discover the pin's page count again
    pub async fn reset_page_ceiling(&self, pin_id: &str) -> Result<Pin> {
        let mut pin = self.repo.reset_page_ceiling(pin_id).await?;
        pin.is_downloading = self.is_syncing(pin_id);
        Ok(pin)
    }

    /// Remove cached images that no photo record references, and temp
    /// files left behind by interrupted writes
    pub async fn prune_orphaned_blobs(&self) -> Result<usize> {
        let referenced: HashSet<String> = self.repo.all_cache_keys().await?.into_iter().collect();

        let mut removed = 0;
        for key in self.blob_store.list_all().await? {
            if !referenced.contains(&key) {
                self.blob_store.delete(&key).await?;
                removed += 1;
            }
        }

        removed += self
            .blob_store
            .remove_stale_temp_files(STALE_TEMP_FILE_AGE)
            .await?;

        tracing::info!("Pruned {} orphaned blobs", removed);
        Ok(removed)
    }

    fn spawn_downloads(&self, photo_ids: impl IntoIterator<Item = String>) -> DownloadBatch {
        let handles = photo_ids
            .into_iter()
            .map(|photo_id| {
                let engine = self.clone();
                tokio::spawn(async move {
                    engine.download_image(&photo_id).await.unwrap_or_else(|e| {
                        tracing::warn!("Download of photo {} aborted: {}", photo_id, e);
                        DownloadOutcome::Failed
                    })
                })
            })
            .collect();

        DownloadBatch { handles }
    }

    /// Delete blobs whose keys are no longer referenced. Failures are logged;
    /// `prune_orphaned_blobs` picks up anything left behind.
    async fn evict_unreferenced(&self, keys: Vec<String>) {
        for key in keys {
            match self.repo.cache_key_in_use(&key).await {
                Ok(true) => {}
                Ok(false) => {
                    if let Err(e) = self.blob_store.delete(&key).await {
                        tracing::warn!("Failed to evict blob {}: {}", key, e);
                    }
                }
                Err(e) => tracing::warn!("Failed to check references of blob {}: {}", key, e),
            }
        }
    }

    fn emit_loaded(&self, photo: &Photo) {
        self.events.emit(Event::PhotoLoaded {
            pin_id: photo.pin_id.clone(),
            photo_id: photo.id.clone(),
        });
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
