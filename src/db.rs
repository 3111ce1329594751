//! SQLite pool for the shopping list, recipes and meal plans.
//!
//! Every aggregator write is a conditional `UPDATE`/`INSERT`/`DELETE`, and
//! `cart serve` issues them from concurrent requests. WAL keeps list reads
//! from blocking those writes, and the busy timeout makes a writer wait for
//! the lock instead of failing with `SQLITE_BUSY`. A lost version check is
//! then retried by the aggregator, not by SQLite.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

/// Open the pool at `[db].path`, creating the file and its directory on
/// first use.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
