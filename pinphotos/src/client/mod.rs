//! Remote photo search client
//!
//! Builds search queries for a pin, talks to the search API and decodes
//! its responses. The `PhotoApi` trait is the transport seam the sync
//! engine depends on.

pub mod flickr;
pub mod query;
pub mod response;

pub use flickr::FlickrClient;
pub use query::{random_page, BoundingBox, SearchQuery};
pub use response::{decode_search_response, PhotoSummary, SearchResult};

use crate::error::Result;
use async_trait::async_trait;

/// Access to the remote photo service. Stateless and shareable across tasks.
#[async_trait]
pub trait PhotoApi: Send + Sync {
    /// Run one photo search. Fails with `Network` or `Decode`.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult>;

    /// Download image bytes. Fails with `Network`.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}
