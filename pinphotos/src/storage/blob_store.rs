//! Key-addressed blob storage
//!
//! Stores downloaded image bytes under the photo's cache key.
//! Files are spread over a two-level directory structure derived from the
//! SHA-256 digest of the key so no single directory grows large.
//!
//! Example: key "5349_ab12" with digest "9f3c..." is stored at "blobs/9f/3c/5349_ab12"

use crate::config::MAX_CACHE_KEY_LENGTH;
use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

const TEMP_SUFFIX: &str = ".tmp";

/// Blob cache keyed by photo cache key
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store data under a key, replacing any previous value
    pub async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.get_path(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Two photos may share a key, so each writer gets its own temp file
        let temp_name = format!("{}.{}{}", key, Uuid::new_v4().simple(), TEMP_SUFFIX);
        let temp_path = path.with_file_name(temp_name);

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove temp file {:?}: {}", temp_path, cleanup);
                }
            }
            return Err(e.into());
        }

        tracing::debug!("Wrote blob: {} ({} bytes)", key, data.len());

        Ok(())
    }

    /// Read data stored under a key, `None` if absent
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.get_path(key)?;

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;

        tracing::debug!("Read blob: {} ({} bytes)", key, data.len());

        Ok(Some(data))
    }

    /// Check if a blob exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.get_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Delete a blob. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.get_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get file path for a key
    fn get_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(AppError::BlobStore(format!("Invalid cache key: {:?}", key)));
        }

        let digest = shard_digest(key);
        Ok(self.root.join(&digest[0..2]).join(&digest[2..4]).join(key))
    }

    /// List all stored keys
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        self.scan_directory(&self.root, &mut files).await?;

        // Leftover temp files contain dots and fail validation
        Ok(files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .filter(|name| is_valid_key(name))
            .map(str::to_string)
            .collect())
    }

    /// Delete temp files of interrupted writes that are at least `max_age` old.
    /// Returns how many were removed.
    pub async fn remove_stale_temp_files(&self, max_age: Duration) -> Result<usize> {
        let mut files = Vec::new();
        self.scan_directory(&self.root, &mut files).await?;

        let mut removed = 0;
        for path in files {
            let is_temp = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(TEMP_SUFFIX));
            if !is_temp {
                continue;
            }

            let age = fs::metadata(&path)
                .await?
                .modified()?
                .elapsed()
                .unwrap_or_default();
            if age < max_age {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} stale temp files", removed);
        }
        Ok(removed)
    }

    fn scan_directory<'a>(
        &'a self,
        dir: &'a Path,
        files: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if !fs::try_exists(dir).await? {
                return Ok(());
            }

            let mut entries = fs::read_dir(dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    self.scan_directory(&entry.path(), files).await?;
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }

            Ok(())
        })
    }
}

/// Keys become file names, so only a conservative character set is allowed
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_CACHE_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn shard_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("blobs"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;

        store.write("1234_abcd", b"jpeg bytes").await.unwrap();

        let data = store.read("1234_abcd").await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"jpeg bytes"[..]));
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let (store, _temp) = create_test_store().await;

        assert_eq!(store.read("nothing_here").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_data() {
        let (store, _temp) = create_test_store().await;

        store.write("key_1", b"first").await.unwrap();
        store.write("key_1", b"second").await.unwrap();

        assert_eq!(store.read("key_1").await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (store, _temp) = create_test_store().await;

        store.write("5_ff", b"data").await.unwrap();
        assert!(store.exists("5_ff").await.unwrap());
        assert!(!store.exists("6_ff").await.unwrap());

        store.delete("5_ff").await.unwrap();
        assert!(!store.exists("5_ff").await.unwrap());

        // Deleting again is a no-op
        store.delete("5_ff").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let (store, _temp) = create_test_store().await;

        assert!(store.write("../escape", b"x").await.is_err());
        assert!(store.read("a/b").await.is_err());
        assert!(store.exists("").await.is_err());
    }

    #[tokio::test]
    async fn test_directory_structure() {
        let (store, _temp) = create_test_store().await;

        store.write("42_beef", b"x").await.unwrap();

        let path = store.get_path("42_beef").unwrap();
        assert!(path.exists());

        let digest = shard_digest("42_beef");
        let parent = path.parent().unwrap();
        let grandparent = parent.parent().unwrap();

        assert_eq!(parent.file_name().unwrap(), &digest[2..4]);
        assert_eq!(grandparent.file_name().unwrap(), &digest[0..2]);
    }

    #[tokio::test]
    async fn test_list_all() {
        let (store, _temp) = create_test_store().await;

        store.write("1_a", b"Data 1").await.unwrap();
        store.write("2_b", b"Data 2").await.unwrap();
        store.write("3_c", b"Data 3").await.unwrap();

        let mut keys = store.list_all().await.unwrap();
        keys.sort();

        assert_eq!(keys, vec!["1_a", "2_b", "3_c"]);
    }

    fn temp_files_under(dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                found.extend(temp_files_under(&path));
            } else if path.to_string_lossy().ends_with(TEMP_SUFFIX) {
                found.push(path);
            }
        }
        found
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let (store, temp) = create_test_store().await;

        // A non-empty directory where the blob belongs makes the rename fail
        let path = store.get_path("7_dead").unwrap();
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(store.write("7_dead", b"image").await.is_err());
        assert!(temp_files_under(&temp.path().join("blobs")).is_empty());
    }

    #[tokio::test]
    async fn test_remove_stale_temp_files() {
        let (store, temp) = create_test_store().await;

        store.write("8_cafe", b"kept").await.unwrap();
        let shard = store.get_path("8_cafe").unwrap();
        let leftover = shard.with_file_name("8_cafe.0123abcd.tmp");
        std::fs::write(&leftover, b"partial").unwrap();

        // Fresh temp files may belong to a running write
        assert_eq!(
            store
                .remove_stale_temp_files(Duration::from_secs(3600))
                .await
                .unwrap(),
            0
        );
        assert!(leftover.exists());

        assert_eq!(
            store.remove_stale_temp_files(Duration::ZERO).await.unwrap(),
            1
        );
        assert!(temp_files_under(&temp.path().join("blobs")).is_empty());
        assert_eq!(store.list_all().await.unwrap(), vec!["8_cafe"]);
    }
}
