//! pinphotos library
//!
//! Map pins with a bounded, randomly refreshed photo collection each,
//! cached locally. Exposed as a library for the CLI and for testing.

pub mod app;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod services;
pub mod storage;
