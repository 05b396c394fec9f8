//! Photo collection commands
//!
//! Sync, listing and image access for a pin's collection.

use crate::app::AppState;
use crate::database::Photo;
use crate::error::Result;
use crate::services::{CollectionState, DownloadBatch, DownloadOutcome, SyncOutcome};
use std::path::Path;

/// Replace a pin's collection with a new random one.
///
/// Image downloads finish before the command returns.
pub async fn sync(state: &AppState, pin_id: &str, skip_images: bool) -> Result<()> {
    let outcome = if skip_images {
        state.sync_engine.sync_records(pin_id).await?
    } else {
        state.sync_engine.sync(pin_id).await?
    };

    match outcome {
        SyncOutcome::Busy => println!("Pin {} is already syncing", pin_id),
        SyncOutcome::Synced(report) => {
            println!(
                "Pin {}: {} photos ({} available)",
                report.pin_id, report.photo_count, report.total_photos
            );
            report_downloads(report.downloads).await;
        }
    }
    Ok(())
}

/// Show a pin's collection, syncing first if it has none
pub async fn open(state: &AppState, pin_id: &str) -> Result<()> {
    match state.sync_engine.ensure_collection(pin_id).await? {
        CollectionState::Busy => println!("Pin {} is already syncing", pin_id),
        CollectionState::Synced(report) => {
            report_downloads(report.downloads).await;
            list_photos(state, pin_id).await?;
        }
        CollectionState::Existing { photos, downloads } => {
            report_downloads(downloads).await;
            if photos.is_empty() {
                println!("No photos");
            }
            list_photos(state, pin_id).await?;
        }
    }
    Ok(())
}

/// List a pin's photos in slot order
pub async fn list_photos(state: &AppState, pin_id: &str) -> Result<()> {
    for photo in state.sync_engine.photos(pin_id).await? {
        println!("{}", describe(&photo));
    }
    Ok(())
}

/// Write a photo's image to a file, downloading it first if needed
pub async fn save_image(state: &AppState, photo_id: &str, output: &Path) -> Result<()> {
    state.sync_engine.download_image(photo_id).await?;
    let data = state.sync_engine.image_for_photo(photo_id).await?;

    match data {
        Some(data) => {
            tokio::fs::write(output, &data).await?;
            println!("Wrote {} bytes to {}", data.len(), output.display());
        }
        None => println!("Image for photo {} is not available yet", photo_id),
    }
    Ok(())
}

pub async fn delete_photo(state: &AppState, photo_id: &str) -> Result<()> {
    let photo = state.sync_engine.delete_photo(photo_id).await?;
    println!("Deleted photo {} from pin {}", photo.id, photo.pin_id);
    Ok(())
}

/// Remove cached images no photo refers to
pub async fn prune(state: &AppState) -> Result<()> {
    let removed = state.sync_engine.prune_orphaned_blobs().await?;
    println!("Removed {} unused images", removed);
    Ok(())
}

async fn report_downloads(downloads: DownloadBatch) {
    if downloads.is_empty() {
        return;
    }

    let outcomes = downloads.wait().await;
    let failed = outcomes
        .iter()
        .filter(|o| **o == DownloadOutcome::Failed)
        .count();

    println!(
        "Downloaded {} images, {} failed",
        outcomes.len() - failed,
        failed
    );
}

fn describe(photo: &Photo) -> String {
    format!(
        "{:>2}  {}  {:?}  {}  {}",
        photo.position, photo.id, photo.status, photo.title, photo.url
    )
}
