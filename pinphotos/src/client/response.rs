//! Search API response decoding

use crate::error::{AppError, Result};
use serde::Deserialize;

/// One photo of a search result page
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSummary {
    pub id: String,
    pub secret: String,
    pub title: String,
    /// Medium size display URL
    pub url: String,
}

/// Decoded search result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    /// Photos available for the whole area
    pub total_photos: i64,
    /// Result pages available for the whole area
    pub total_pages: i64,
    /// Downloadable photos of the requested page, in API order
    pub photos: Vec<PhotoSummary>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    stat: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<PhotosPage>,
}

#[derive(Debug, Deserialize)]
struct PhotosPage {
    total: Count,
    #[serde(default)]
    pages: i64,
    #[serde(default)]
    photo: Vec<RawPhoto>,
}

/// `total` arrives as a string but some endpoints send a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    fn value(&self) -> Result<i64> {
        match self {
            Count::Number(n) => Ok(*n),
            Count::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AppError::Decode(format!("Invalid photo total: {:?}", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    id: String,
    secret: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url_m: Option<String>,
}

/// Decode a search response body
pub fn decode_search_response(body: &[u8]) -> Result<SearchResult> {
    let envelope: SearchEnvelope = serde_json::from_slice(body)
        .map_err(|e| AppError::Decode(format!("Invalid search response: {}", e)))?;

    if envelope.stat.as_deref() == Some("fail") {
        return Err(AppError::Decode(format!(
            "Search API error {}: {}",
            envelope.code.unwrap_or_default(),
            envelope.message.unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    let page = envelope
        .photos
        .ok_or_else(|| AppError::Decode("Search response has no 'photos' field".to_string()))?;

    let total_photos = page.total.value()?.max(0);

    let photos = page
        .photo
        .into_iter()
        .filter_map(|raw| {
            let url = raw.url_m.filter(|u| !u.is_empty())?;
            Some(PhotoSummary {
                id: raw.id,
                secret: raw.secret,
                title: raw.title,
                url,
            })
        })
        .collect();

    Ok(SearchResult {
        total_photos,
        total_pages: page.pages.max(0),
        photos,
    })
}
