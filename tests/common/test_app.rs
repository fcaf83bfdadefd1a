//! Test database and seeding helpers

use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use buildboard::db::DbPool;

/// Fresh in-memory database with migrations applied
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// Insert a provider integration row, returning its ID
pub async fn seed_integration(pool: &DbPool, name: &str, kind: &str, endpoint: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO provider_integrations (id, name, kind, endpoint, is_active)
        VALUES (?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(kind)
    .bind(endpoint)
    .execute(pool)
    .await
    .expect("failed to seed integration");
    id
}

/// Insert an alert definition row, returning its ID
pub async fn seed_alert(
    pool: &DbPool,
    name: &str,
    conditions: Value,
    channels: Value,
    is_active: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO alerts (id, name, alert_type, conditions, channels, is_active)
        VALUES (?, ?, 'build_failure', ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(conditions.to_string())
    .bind(channels.to_string())
    .bind(is_active)
    .execute(pool)
    .await
    .expect("failed to seed alert");
    id
}
