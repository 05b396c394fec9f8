//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::client::FlickrClient;
use crate::config::{BLOBS_DIR, DATABASE_FILE};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::events::EventBus;
use crate::services::{PinsService, SettingsService, SyncEngine};
use crate::storage::BlobStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub settings_service: SettingsService,
    pub pins_service: PinsService,
    pub sync_engine: SyncEngine,
}

/// Application setup - called once on startup
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    // Create necessary directories
    std::fs::create_dir_all(&app_data_dir)?;

    let pool = create_pool(&app_data_dir.join(DATABASE_FILE)).await?;
    let repo = Repository::new(pool);

    let blob_store = BlobStore::new(app_data_dir.join(BLOBS_DIR));
    blob_store.initialize().await?;

    let settings_service = SettingsService::new(app_data_dir.clone());
    let settings = settings_service.load_effective().await?;

    let api = Arc::new(FlickrClient::new(&settings.api)?);
    let events = EventBus::default();

    let pins_service = PinsService::new(repo.clone(), events.clone());
    let sync_engine = SyncEngine::new(repo.clone(), blob_store, api, events);

    // Downloads do not survive a restart
    repo.reset_interrupted_downloads().await?;

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        settings_service,
        pins_service,
        sync_engine,
    })
}
