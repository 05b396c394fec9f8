//! Error types for pinphotos
//!
//! All errors use thiserror for structured error handling.
//! Errors serialize to their display string so a frontend can show them as-is.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Record store failure. A failed commit never leaves partial changes.
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Transport failure reaching the search API or an image host
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or failed search API response
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Pin not found: {0}")]
    PinNotFound(String),

    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("{0}")]
    Generic(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_display_string() {
        let err = AppError::PinNotFound("abc".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Pin not found: abc\"");

        let result: Result<()> = Err(AppError::Decode("stat fail".to_string()));
        assert!(matches!(result, Err(AppError::Decode(_))));
    }
}
