//! Database module
//!
//! This module provides all database functionality including:
//! - Schema and migrations
//! - Pin and photo models
//! - Repository layer for record operations

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::config::{DB_BUSY_TIMEOUT, DB_MAX_CONNECTIONS};
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;

/// Open the database file, creating it if needed, and bring its schema up to date.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets image downloads update statuses while a sync commits
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(DB_BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    initialize_database(&pool).await?;

    tracing::info!(
        "Opened database {:?} with up to {} connections",
        db_path,
        DB_MAX_CONNECTIONS
    );

    Ok(pool)
}
