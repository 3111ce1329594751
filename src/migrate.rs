//! Idempotent schema migrations.
//!
//! | Table | Key | Notes |
//! |-------|-----|-------|
//! | `shopping_list_entries` | `id` | `UNIQUE(user_id, normalized_key)`, `version` for conditional writes |
//! | `recipes` | `(user_id, id)` | ingredients stored as a JSON array |
//! | `meal_plans` | `user_id` | whole plan stored as JSON |

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shopping_list_entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            item TEXT NOT NULL,
            normalized_key TEXT NOT NULL,
            quantity TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL,
            sources_json TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(user_id, normalized_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            user_id TEXT NOT NULL,
            id TEXT NOT NULL,
            title TEXT NOT NULL,
            ingredients_json TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (user_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meal_plans (
            user_id TEXT PRIMARY KEY,
            plan_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entries_user_created ON shopping_list_entries(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
