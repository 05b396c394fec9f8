//! Repository layer for database operations
//!
//! This module provides the record operations for pins and photos.
//! Multi-row changes (reconciliation, pin deletion) run in one transaction.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new pin
    pub async fn create_pin(&self, req: CreatePinRequest) -> Result<Pin> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let name = Pin::coordinate_name(req.latitude, req.longitude);

        let pin = sqlx::query_as::<_, Pin>(
            r#"
            INSERT INTO pins (id, latitude, longitude, name, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(&name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created pin: {} at {}", id, name);
        Ok(pin)
    }

    /// Get a pin by ID
    pub async fn get_pin(&self, id: &str) -> Result<Pin> {
        sqlx::query_as::<_, Pin>("SELECT * FROM pins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::PinNotFound(id.to_string()))
    }

    /// List all pins, oldest first
    pub async fn list_pins(&self) -> Result<Vec<Pin>> {
        let pins = sqlx::query_as::<_, Pin>("SELECT * FROM pins ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(pins)
    }

    /// Replace a pin's display name
    pub async fn rename_pin(&self, id: &str, name: &str) -> Result<Pin> {
        let pin = sqlx::query_as::<_, Pin>("UPDATE pins SET name = ? WHERE id = ? RETURNING *")
            .bind(name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::PinNotFound(id.to_string()))?;

        tracing::debug!("Renamed pin {} to {}", id, name);
        Ok(pin)
    }

    /// Forget the discovered page count so the next sync derives it again
    pub async fn reset_page_ceiling(&self, id: &str) -> Result<Pin> {
        let pin =
            sqlx::query_as::<_, Pin>("UPDATE pins SET total_pages = NULL WHERE id = ? RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::PinNotFound(id.to_string()))?;

        tracing::debug!("Reset page ceiling of pin: {}", id);
        Ok(pin)
    }

    /// Delete a pin together with all its photos. Returns the removed photos.
    pub async fn delete_pin(&self, id: &str) -> Result<Vec<Photo>> {
        let mut tx = self.pool.begin().await?;

        let photos = sqlx::query_as::<_, Photo>(
            "SELECT * FROM photos WHERE pin_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM photos WHERE pin_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM pins WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            // Dropping the transaction rolls it back
            return Err(AppError::PinNotFound(id.to_string()));
        }

        tx.commit().await?;

        tracing::debug!("Deleted pin: {} with {} photos", id, photos.len());
        Ok(photos)
    }

    /// List a pin's photos in slot order
    pub async fn list_photos(&self, pin_id: &str) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT * FROM photos WHERE pin_id = ? ORDER BY position ASC
            "#,
        )
        .bind(pin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    /// Find a photo by ID
    pub async fn find_photo(&self, id: &str) -> Result<Option<Photo>> {
        let photo = sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    /// Get a photo by ID
    pub async fn get_photo(&self, id: &str) -> Result<Photo> {
        self.find_photo(id)
            .await?
            .ok_or_else(|| AppError::PhotoNotFound(id.to_string()))
    }

    /// Set a photo's download status only if the record still points at `cache_key`.
    ///
    /// Returns false when the slot was recycled or deleted in the meantime.
    pub async fn set_photo_status_for_key(
        &self,
        id: &str,
        cache_key: &str,
        status: DownloadStatus,
    ) -> Result<bool> {
        let rows = sqlx::query(
            "UPDATE photos SET status = ?, updated_at = ? WHERE id = ? AND cache_key = ?",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(cache_key)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    /// Delete a single photo, returning the removed record
    pub async fn delete_photo(&self, id: &str) -> Result<Photo> {
        let mut tx = self.pool.begin().await?;

        let photo = sqlx::query_as::<_, Photo>("DELETE FROM photos WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::PhotoNotFound(id.to_string()))?;

        tx.commit().await?;

        tracing::debug!("Deleted photo: {} from pin: {}", id, photo.pin_id);
        Ok(photo)
    }

    /// Apply a reconciliation plan atomically.
    ///
    /// Returns the records of the reconciled slots (recycled and created) as stored.
    pub async fn apply_plan(&self, plan: &ReconcilePlan) -> Result<Vec<Photo>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            UPDATE pins
            SET total_photos = ?, total_pages = COALESCE(total_pages, ?)
            WHERE id = ?
            "#,
        )
        .bind(plan.total_photos)
        .bind(plan.discovered_pages)
        .bind(&plan.pin_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::PinNotFound(plan.pin_id.clone()));
        }

        for photo in &plan.deletes {
            sqlx::query("DELETE FROM photos WHERE id = ? AND pin_id = ?")
                .bind(&photo.id)
                .bind(&plan.pin_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut reconciled = Vec::with_capacity(plan.slots.len());

        for slot in &plan.slots {
            let photo = match slot {
                SlotChange::Recycle { photo, draft } => {
                    sqlx::query_as::<_, Photo>(
                        r#"
                        UPDATE photos
                        SET position = ?, url = ?, title = ?, cache_key = ?,
                            status = ?, updated_at = ?
                        WHERE id = ? AND pin_id = ?
                        RETURNING *
                        "#,
                    )
                    .bind(draft.position)
                    .bind(&draft.url)
                    .bind(&draft.title)
                    .bind(&draft.cache_key)
                    .bind(DownloadStatus::NotLoaded)
                    .bind(now)
                    .bind(&photo.id)
                    .bind(&plan.pin_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| AppError::PhotoNotFound(photo.id.clone()))?
                }
                SlotChange::Create(draft) => {
                    sqlx::query_as::<_, Photo>(
                        r#"
                        INSERT INTO photos
                            (id, pin_id, position, url, title, cache_key, status, created_at, updated_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                        RETURNING *
                        "#,
                    )
                    .bind(Uuid::new_v4().to_string())
                    .bind(&plan.pin_id)
                    .bind(draft.position)
                    .bind(&draft.url)
                    .bind(&draft.title)
                    .bind(&draft.cache_key)
                    .bind(DownloadStatus::NotLoaded)
                    .bind(now)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            reconciled.push(photo);
        }

        // Keep positions dense after surplus deletion
        for (offset, photo) in plan.retained.iter().enumerate() {
            let position = (plan.slots.len() + offset) as i64;
            if photo.position != position {
                sqlx::query("UPDATE photos SET position = ? WHERE id = ?")
                    .bind(position)
                    .bind(&photo.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::debug!(
            "Applied plan for pin {}: {} deleted, {} reconciled, {} retained",
            plan.pin_id,
            plan.deletes.len(),
            reconciled.len(),
            plan.retained.len()
        );

        Ok(reconciled)
    }

    /// Whether any photo record still references a cache key
    pub async fn cache_key_in_use(&self, cache_key: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE cache_key = ?")
            .bind(cache_key)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Every cache key referenced by a photo record
    pub async fn all_cache_keys(&self) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT DISTINCT cache_key FROM photos")
            .fetch_all(&self.pool)
            .await?;

        Ok(keys)
    }

    /// Return photos left in `Loading` by an interrupted process to `NotLoaded`
    pub async fn reset_interrupted_downloads(&self) -> Result<u64> {
        let rows = sqlx::query("UPDATE photos SET status = ?, updated_at = ? WHERE status = ?")
            .bind(DownloadStatus::NotLoaded)
            .bind(Utc::now())
            .bind(DownloadStatus::Loading)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows > 0 {
            tracing::info!("Reset {} interrupted photo downloads", rows);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    async fn create_test_pin(repo: &Repository) -> Pin {
        repo.create_pin(CreatePinRequest {
            latitude: 37.7,
            longitude: -122.4,
        })
        .await
        .unwrap()
    }

    fn draft(position: i64, key: &str) -> PhotoDraft {
        PhotoDraft {
            position,
            url: format!("https://live.example/{}.jpg", key),
            title: format!("Photo {}", key),
            cache_key: key.to_string(),
        }
    }

    fn create_plan(pin: &Pin, keys: &[&str]) -> ReconcilePlan {
        ReconcilePlan {
            pin_id: pin.id.clone(),
            total_photos: 100,
            discovered_pages: Some(10),
            slots: keys
                .iter()
                .enumerate()
                .map(|(i, key)| SlotChange::Create(draft(i as i64, key)))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_pin() {
        let repo = create_test_repo().await;

        let pin = create_test_pin(&repo).await;
        assert_eq!(pin.name, "[37.7,-122.4]");
        assert_eq!(pin.total_photos, None);
        assert_eq!(pin.total_pages, None);
        assert!(!pin.is_downloading);

        let fetched = repo.get_pin(&pin.id).await.unwrap();
        assert_eq!(fetched.id, pin.id);
        assert_eq!(fetched.latitude, 37.7);
    }

    #[tokio::test]
    async fn test_get_missing_pin() {
        let repo = create_test_repo().await;

        let result = repo.get_pin("missing").await;
        assert!(matches!(result, Err(AppError::PinNotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_pin() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let renamed = repo.rename_pin(&pin.id, "Mission District").await.unwrap();
        assert_eq!(renamed.name, "Mission District");

        assert_eq!(repo.list_pins().await.unwrap()[0].name, "Mission District");
    }

    #[tokio::test]
    async fn test_apply_plan_creates_slots_and_sets_totals() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let reconciled = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b", "3_c"]))
            .await
            .unwrap();
        assert_eq!(reconciled.len(), 3);
        assert!(reconciled
            .iter()
            .all(|p| p.status == DownloadStatus::NotLoaded));

        let photos = repo.list_photos(&pin.id).await.unwrap();
        let keys: Vec<&str> = photos.iter().map(|p| p.cache_key.as_str()).collect();
        assert_eq!(keys, vec!["1_a", "2_b", "3_c"]);

        let pin = repo.get_pin(&pin.id).await.unwrap();
        assert_eq!(pin.total_photos, Some(100));
        assert_eq!(pin.total_pages, Some(10));
    }

    #[tokio::test]
    async fn test_apply_plan_never_overwrites_page_count() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        repo.apply_plan(&create_plan(&pin, &[])).await.unwrap();

        let mut plan = create_plan(&pin, &[]);
        plan.discovered_pages = Some(3);
        repo.apply_plan(&plan).await.unwrap();

        assert_eq!(repo.get_pin(&pin.id).await.unwrap().total_pages, Some(10));

        let reset = repo.reset_page_ceiling(&pin.id).await.unwrap();
        assert_eq!(reset.total_pages, None);
    }

    #[tokio::test]
    async fn test_apply_plan_recycles_in_place() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let first = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b"]))
            .await
            .unwrap();
        repo.set_photo_status_for_key(&first[0].id, "1_a", DownloadStatus::Loaded)
            .await
            .unwrap();
        let loaded = repo.get_photo(&first[0].id).await.unwrap();

        let plan = ReconcilePlan {
            pin_id: pin.id.clone(),
            total_photos: 100,
            slots: vec![SlotChange::Recycle {
                photo: loaded,
                draft: draft(0, "9_z"),
            }],
            retained: vec![first[1].clone()],
            ..Default::default()
        };
        let reconciled = repo.apply_plan(&plan).await.unwrap();

        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].id, first[0].id);
        assert_eq!(reconciled[0].cache_key, "9_z");
        assert_eq!(reconciled[0].status, DownloadStatus::NotLoaded);

        let photos = repo.list_photos(&pin.id).await.unwrap();
        assert_eq!(photos.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_plan_deletes_surplus_and_renumbers() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let first = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b", "3_c"]))
            .await
            .unwrap();

        let plan = ReconcilePlan {
            pin_id: pin.id.clone(),
            total_photos: 2,
            deletes: vec![first[0].clone()],
            retained: vec![first[1].clone(), first[2].clone()],
            ..Default::default()
        };
        repo.apply_plan(&plan).await.unwrap();

        let photos = repo.list_photos(&pin.id).await.unwrap();
        let positions: Vec<i64> = photos.iter().map(|p| p.position).collect();
        assert_eq!(photos.len(), 2);
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(photos[0].cache_key, "2_b");
    }

    #[tokio::test]
    async fn test_apply_plan_for_missing_pin_changes_nothing() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let mut plan = create_plan(&pin, &["1_a"]);
        plan.pin_id = "gone".to_string();

        let result = repo.apply_plan(&plan).await;
        assert!(matches!(result, Err(AppError::PinNotFound(_))));
        assert!(repo.all_cache_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_apply_plan_rolls_back_earlier_changes() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let held = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b"]))
            .await
            .unwrap();

        // Totals and the delete succeed before the recycle hits a missing record
        let mut ghost = held[1].clone();
        ghost.id = "ghost".to_string();
        let plan = ReconcilePlan {
            pin_id: pin.id.clone(),
            total_photos: 5,
            deletes: vec![held[0].clone()],
            slots: vec![SlotChange::Recycle {
                photo: ghost,
                draft: draft(0, "9_z"),
            }],
            ..Default::default()
        };

        let result = repo.apply_plan(&plan).await;
        assert!(matches!(result, Err(AppError::PhotoNotFound(_))));

        let photos = repo.list_photos(&pin.id).await.unwrap();
        let keys: Vec<&str> = photos.iter().map(|p| p.cache_key.as_str()).collect();
        assert_eq!(keys, vec!["1_a", "2_b"]);
        assert_eq!(repo.get_pin(&pin.id).await.unwrap().total_photos, Some(100));
        assert!(!repo.cache_key_in_use("9_z").await.unwrap());
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let photos = repo.apply_plan(&create_plan(&pin, &["1_a"])).await.unwrap();
        let id = &photos[0].id;

        assert!(!repo
            .set_photo_status_for_key(id, "other_key", DownloadStatus::Loaded)
            .await
            .unwrap());
        assert!(repo
            .set_photo_status_for_key(id, "1_a", DownloadStatus::Loaded)
            .await
            .unwrap());
        assert_eq!(
            repo.get_photo(id).await.unwrap().status,
            DownloadStatus::Loaded
        );
    }

    #[tokio::test]
    async fn test_delete_photo() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let photos = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b"]))
            .await
            .unwrap();

        let removed = repo.delete_photo(&photos[0].id).await.unwrap();
        assert_eq!(removed.cache_key, "1_a");
        assert!(!repo.cache_key_in_use("1_a").await.unwrap());
        assert!(repo.cache_key_in_use("2_b").await.unwrap());

        let again = repo.delete_photo(&photos[0].id).await;
        assert!(matches!(again, Err(AppError::PhotoNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_pin_removes_photos() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        repo.apply_plan(&create_plan(&pin, &["1_a", "2_b"]))
            .await
            .unwrap();

        let removed = repo.delete_pin(&pin.id).await.unwrap();
        assert_eq!(removed.len(), 2);

        assert!(repo.list_photos(&pin.id).await.unwrap().is_empty());
        assert!(repo.list_pins().await.unwrap().is_empty());
        assert!(repo.all_cache_keys().await.unwrap().is_empty());

        assert!(matches!(
            repo.delete_pin(&pin.id).await,
            Err(AppError::PinNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_interrupted_downloads() {
        let repo = create_test_repo().await;
        let pin = create_test_pin(&repo).await;

        let photos = repo
            .apply_plan(&create_plan(&pin, &["1_a", "2_b"]))
            .await
            .unwrap();
        repo.set_photo_status_for_key(&photos[0].id, "1_a", DownloadStatus::Loading)
            .await
            .unwrap();
        repo.set_photo_status_for_key(&photos[1].id, "2_b", DownloadStatus::Loaded)
            .await
            .unwrap();

        assert_eq!(repo.reset_interrupted_downloads().await.unwrap(), 1);

        let statuses: Vec<DownloadStatus> = repo
            .list_photos(&pin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(
            statuses,
            vec![DownloadStatus::NotLoaded, DownloadStatus::Loaded]
        );
    }
}
