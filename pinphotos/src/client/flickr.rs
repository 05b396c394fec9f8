//! HTTP implementation of the photo API

use super::query::SearchQuery;
use super::response::{decode_search_response, SearchResult};
use super::PhotoApi;
use crate::error::{AppError, Result};
use crate::services::settings::ApiSettings;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Photo search and image download over HTTP
#[derive(Debug, Clone)]
pub struct FlickrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FlickrClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());

        // Without a configured timeout a stalled request stalls the pin until the transport gives up
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl PhotoApi for FlickrClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        tracing::debug!("Searching photos in bbox {} page {}", query.bbox, query.page);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query.params(&self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Photo search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Photo search returned status: {}", status);
            return Err(AppError::Network(format!(
                "Photo search returned status {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read search response: {}", e)))?;

        decode_search_response(&body)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Image request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Image host returned status {} for {}",
                status, url
            )));
        }

        let bytes = response.bytes().await?;

        tracing::debug!("Fetched image {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
