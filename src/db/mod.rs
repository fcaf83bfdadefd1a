//! Database layer
//!
//! This module handles database operations for local storage of:
//! - Alert definitions
//! - Provider integrations
//! - Notification event history

pub mod alert_repository;
pub mod integration_repository;
pub mod notification_repository;

pub use alert_repository::AlertRepository;
pub use integration_repository::IntegrationRepository;
pub use notification_repository::NotificationHistoryRepository;

use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
///
/// Creates the database file on first run.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
