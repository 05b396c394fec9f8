//! Application configuration constants
//!
//! Central location for collection limits, search API parameters and
//! geographic bounds used throughout the application.

use std::time::Duration;

// ===== Collection Limits =====

/// Maximum number of photos kept per pin
pub const MAX_PHOTOS: usize = 12;

/// Highest page count the search API will serve (4000 results at 100 per page).
/// Also the page range used when a pin's page count is not yet known.
pub const PAGE_CEILING: u32 = 40;

// ===== Geographic Bounds =====

pub const LAT_MIN: f64 = -90.0;
pub const LAT_MAX: f64 = 90.0;
pub const LON_MIN: f64 = -180.0;
pub const LON_MAX: f64 = 180.0;

/// Half width of the search bounding box in degrees of longitude
pub const BOUNDING_BOX_HALF_WIDTH: f64 = 1.0;
/// Half height of the search bounding box in degrees of latitude
pub const BOUNDING_BOX_HALF_HEIGHT: f64 = 1.0;

// ===== Search API =====

/// Default REST endpoint of the photo search API
pub const DEFAULT_API_BASE_URL: &str = "https://api.flickr.com/services/rest/";

pub const SEARCH_METHOD: &str = "flickr.photos.search";

/// Extra fields requested per photo; `url_m` is the medium display URL
pub const SEARCH_EXTRAS: &str = "url_m";

pub const RESPONSE_FORMAT: &str = "json";

/// Asks for a bare JSON body instead of a JSONP wrapper
pub const NO_JSON_CALLBACK: &str = "1";

pub const DEFAULT_USER_AGENT: &str = concat!("pinphotos/", env!("CARGO_PKG_VERSION"));

/// Environment variable that overrides the stored API key
pub const API_KEY_ENV: &str = "PINPHOTOS_API_KEY";

// ===== Storage Layout =====

pub const DATABASE_FILE: &str = "pinphotos.db";
pub const BLOBS_DIR: &str = "blobs";
pub const SETTINGS_FILE: &str = "settings.json";

/// Downloads and syncs of several pins share the pool
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits for another writer before failing
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest cache key accepted by the blob store
pub const MAX_CACHE_KEY_LENGTH: usize = 128;

/// Temp files older than this are leftovers of interrupted blob writes
pub const STALE_TEMP_FILE_AGE: Duration = Duration::from_secs(10 * 60);

// ===== Events =====

/// Buffered events per subscriber before slow receivers start lagging
pub const EVENT_BUS_CAPACITY: usize = 256;
