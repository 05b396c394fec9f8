//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{API_KEY_ENV, DEFAULT_API_BASE_URL, DEFAULT_USER_AGENT, SETTINGS_FILE};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Photo search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds; unset leaves timeouts to the transport
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub api: ApiSettings,
}

impl AppSettings {
    /// Replace the stored API key with a non-empty override
    pub fn with_api_key_override(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            self.api.api_key = key;
        }
        self
    }
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !fs::try_exists(&self.settings_path).await? {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Load settings with environment overrides applied. Overrides are never saved.
    pub async fn load_effective(&self) -> Result<AppSettings> {
        let settings = self.load().await?;
        let settings = settings.with_api_key_override(std::env::var(API_KEY_ENV).ok());

        if settings.api.api_key.is_empty() {
            tracing::warn!(
                "No API key configured; set it in {:?} or {}",
                self.settings_path,
                API_KEY_ENV
            );
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Store a new API key
    pub async fn update_api_key(&self, api_key: &str) -> Result<()> {
        let mut settings = self.load().await?;
        settings.api.api_key = api_key.trim().to_string();
        self.save(&settings).await
    }
}
