//! Search query construction
//!
//! Bounding box around a pin and the random result page to request.

use crate::config::{
    BOUNDING_BOX_HALF_HEIGHT, BOUNDING_BOX_HALF_WIDTH, LAT_MAX, LAT_MIN, LON_MAX, LON_MIN,
    NO_JSON_CALLBACK, PAGE_CEILING, RESPONSE_FORMAT, SEARCH_EXTRAS, SEARCH_METHOD,
};
use crate::database::Pin;
use rand::Rng;
use std::fmt;

/// Search area clamped to valid coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Box of fixed half extents centered on a coordinate
    pub fn around(latitude: f64, longitude: f64) -> Self {
        Self {
            lon_min: (longitude - BOUNDING_BOX_HALF_WIDTH).max(LON_MIN),
            lat_min: (latitude - BOUNDING_BOX_HALF_HEIGHT).max(LAT_MIN),
            lon_max: (longitude + BOUNDING_BOX_HALF_WIDTH).min(LON_MAX),
            lat_max: (latitude + BOUNDING_BOX_HALF_HEIGHT).min(LAT_MAX),
        }
    }
}

/// Formatted the way the API's `bbox` parameter expects
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

/// Uniform page in `[0, page_hint)`, falling back to the API page ceiling
pub fn random_page<R: Rng + ?Sized>(page_hint: Option<u32>, rng: &mut R) -> u32 {
    let pages = page_hint.filter(|p| *p > 0).unwrap_or(PAGE_CEILING);
    rng.gen_range(0..pages)
}

/// One photo search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub bbox: BoundingBox,
    pub page: u32,
}

impl SearchQuery {
    /// Query for a pin's area on a randomly chosen page
    pub fn for_pin<R: Rng + ?Sized>(pin: &Pin, rng: &mut R) -> Self {
        Self {
            bbox: BoundingBox::around(pin.latitude, pin.longitude),
            page: random_page(pin.page_hint(), rng),
        }
    }

    /// Query string parameters, API key included
    pub fn params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("method", SEARCH_METHOD.to_string()),
            ("api_key", api_key.to_string()),
            ("bbox", self.bbox.to_string()),
            ("extras", SEARCH_EXTRAS.to_string()),
            ("format", RESPONSE_FORMAT.to_string()),
            ("nojsoncallback", NO_JSON_CALLBACK.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}
