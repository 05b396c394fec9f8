//! Storage module
//!
//! Provides the blob cache for downloaded image data.

pub mod blob_store;

pub use blob_store::BlobStore;
