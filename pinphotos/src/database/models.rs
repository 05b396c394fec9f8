//! Database models
//!
//! Rust structs representing pins and their photo slots.
//! All models use serde for serialization to a frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A saved map location with a bounded photo collection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pin {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Coordinate string until a place name has been resolved
    pub name: String,
    /// Photos the search API reports for this location, once known
    pub total_photos: Option<i64>,
    /// Result pages available, capped at the API page ceiling
    pub total_pages: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// A collection sync is running. Never persisted.
    #[sqlx(skip)]
    #[serde(default)]
    pub is_downloading: bool,
}

impl Pin {
    /// Display name used before reverse geocoding finishes
    pub fn coordinate_name(latitude: f64, longitude: f64) -> String {
        format!("[{},{}]", latitude, longitude)
    }

    /// Page count to draw a random page from, if it is known
    pub fn page_hint(&self) -> Option<u32> {
        self.total_pages
            .and_then(|pages| u32::try_from(pages).ok())
            .filter(|pages| *pages > 0)
    }
}

/// Create pin request
#[derive(Debug, Deserialize)]
pub struct CreatePinRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Download state of a photo's image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    NotLoaded,
    Loading,
    Loaded,
}

/// One slot of a pin's photo collection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: String,
    pub pin_id: String,
    /// Slot index within the pin's collection, starting at 0
    pub position: i64,
    pub url: String,
    pub title: String,
    /// Blob store key derived from the remote id and secret
    pub cache_key: String,
    pub status: DownloadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Deterministic cache key for a remote photo
    pub fn cache_key_for(remote_id: &str, secret: &str) -> String {
        let clean = |s: &str| {
            s.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        };
        format!("{}_{}", clean(remote_id), clean(secret))
    }
}

/// Field values written into a photo slot
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoDraft {
    pub position: i64,
    pub url: String,
    pub title: String,
    pub cache_key: String,
}

/// What happens to one reconciled slot
#[derive(Debug, Clone)]
pub enum SlotChange {
    /// Reuse an existing record in place
    Recycle { photo: Photo, draft: PhotoDraft },
    /// No record at this slot yet
    Create(PhotoDraft),
}

impl SlotChange {
    pub fn draft(&self) -> &PhotoDraft {
        match self {
            SlotChange::Recycle { draft, .. } => draft,
            SlotChange::Create(draft) => draft,
        }
    }
}

/// All record changes of one collection sync, applied in a single transaction
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub pin_id: String,
    pub total_photos: i64,
    /// Set only when the pin had no page count yet
    pub discovered_pages: Option<i64>,
    /// Surplus records to delete
    pub deletes: Vec<Photo>,
    /// Slots filled from the search result, in position order
    pub slots: Vec<SlotChange>,
    /// Existing records past the reconciled slots, kept as they are
    pub retained: Vec<Photo>,
}

impl ReconcilePlan {
    /// Cache keys that lose a reference when the plan is applied
    pub fn released_cache_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.deletes.iter().map(|p| p.cache_key.clone()).collect();

        for slot in &self.slots {
            if let SlotChange::Recycle { photo, draft } = slot {
                if photo.cache_key != draft.cache_key {
                    keys.push(photo.cache_key.clone());
                }
            }
        }

        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(Photo::cache_key_for("53120", "9ab1f"), "53120_9ab1f");
        assert_eq!(
            Photo::cache_key_for("53120", "9ab1f"),
            Photo::cache_key_for("53120", "9ab1f")
        );
    }

    #[test]
    fn test_cache_key_strips_unsafe_characters() {
        assert_eq!(Photo::cache_key_for("12/../3", "a b"), "123_ab");
    }

    #[test]
    fn test_page_hint_ignores_unknown_and_zero() {
        let mut pin = Pin {
            id: "p".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            name: Pin::coordinate_name(0.0, 0.0),
            total_photos: None,
            total_pages: None,
            created_at: Utc::now(),
            is_downloading: false,
        };
        assert_eq!(pin.page_hint(), None);

        pin.total_pages = Some(0);
        assert_eq!(pin.page_hint(), None);

        pin.total_pages = Some(17);
        assert_eq!(pin.page_hint(), Some(17));
    }

    fn photo(id: &str, cache_key: &str) -> Photo {
        Photo {
            id: id.to_string(),
            pin_id: "pin".to_string(),
            position: 0,
            url: format!("https://img.example/{}.jpg", cache_key),
            title: id.to_string(),
            cache_key: cache_key.to_string(),
            status: DownloadStatus::Loaded,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn draft(cache_key: &str) -> PhotoDraft {
        PhotoDraft {
            position: 0,
            url: format!("https://img.example/{}.jpg", cache_key),
            title: cache_key.to_string(),
            cache_key: cache_key.to_string(),
        }
    }

    #[test]
    fn test_released_cache_keys() {
        let plan = ReconcilePlan {
            pin_id: "pin".to_string(),
            total_photos: 3,
            discovered_pages: None,
            deletes: vec![photo("a", "1_a"), photo("b", "2_b")],
            slots: vec![
                SlotChange::Recycle {
                    photo: photo("c", "3_c"),
                    draft: draft("9_z"),
                },
                SlotChange::Recycle {
                    photo: photo("d", "4_d"),
                    draft: draft("4_d"),
                },
                SlotChange::Create(draft("1_a")),
            ],
            retained: vec![],
        };

        // Unchanged keys stay referenced; new keys are not released
        assert_eq!(plan.released_cache_keys(), vec!["1_a", "2_b", "3_c"]);
    }

    #[test]
    fn test_coordinate_name() {
        assert_eq!(Pin::coordinate_name(37.5, -122.25), "[37.5,-122.25]");
    }
}
