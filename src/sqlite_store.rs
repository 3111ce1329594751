//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the tables created by
//! [`crate::migrate`]. Conditional entry writes are single statements, so
//! SQLite's own write lock makes them atomic:
//!
//! - insert: `ON CONFLICT DO NOTHING` against `UNIQUE(user_id, normalized_key)`
//! - update / versioned delete: `WHERE ... AND version = ?`
//!
//! `rows_affected()` tells the aggregator whether it won.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use mealcart_core::meal_plan::MealPlan;
use mealcart_core::models::{Recipe, ShoppingListEntry};
use mealcart_core::store::Store;

const ENTRY_COLUMNS: &str = "id, item, normalized_key, quantity, completed, source, sources_json, version, created_at, updated_at";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_micros(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| anyhow!("timestamp out of range: {}", micros))
}

fn entry_from_row(row: &SqliteRow) -> Result<ShoppingListEntry> {
    let source: String = row.try_get("source")?;
    let sources_json: String = row.try_get("sources_json")?;
    let version: i64 = row.try_get("version")?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(ShoppingListEntry {
        id: row.try_get("id")?,
        item: row.try_get("item")?,
        normalized_key: row.try_get("normalized_key")?,
        quantity: row.try_get("quantity")?,
        completed: row.try_get("completed")?,
        source: source.parse().map_err(|e: String| anyhow!(e))?,
        sources: serde_json::from_str(&sources_json)?,
        version: version as u64,
        created_at: from_micros(created_at)?,
        updated_at: from_micros(updated_at)?,
    })
}

fn recipe_from_row(row: &SqliteRow) -> Result<Recipe> {
    let ingredients_json: String = row.try_get("ingredients_json")?;
    Ok(Recipe {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        ingredients: serde_json::from_str(&ingredients_json)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_entries(&self, user_id: &str) -> Result<Vec<ShoppingListEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM shopping_list_entries WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn get_entry(&self, user_id: &str, id: &str) -> Result<Option<ShoppingListEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_list_entries WHERE user_id = ? AND id = ?",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_entry_by_key(
        &self,
        user_id: &str,
        normalized_key: &str,
    ) -> Result<Option<ShoppingListEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_list_entries WHERE user_id = ? AND normalized_key = ?",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(normalized_key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn insert_entry(&self, user_id: &str, entry: &ShoppingListEntry) -> Result<bool> {
        let sources_json = serde_json::to_string(&entry.sources)?;
        let result = sqlx::query(
            r#"
            INSERT INTO shopping_list_entries (id, user_id, item, normalized_key, quantity,
                                               completed, source, sources_json, version,
                                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(user_id)
        .bind(&entry.item)
        .bind(&entry.normalized_key)
        .bind(&entry.quantity)
        .bind(entry.completed)
        .bind(entry.source.as_str())
        .bind(&sources_json)
        .bind(entry.version as i64)
        .bind(to_micros(&entry.created_at))
        .bind(to_micros(&entry.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_entry(
        &self,
        user_id: &str,
        entry: &ShoppingListEntry,
        expected_version: u64,
    ) -> Result<bool> {
        let sources_json = serde_json::to_string(&entry.sources)?;
        let result = sqlx::query(
            r#"
            UPDATE shopping_list_entries
            SET item = ?, quantity = ?, completed = ?, source = ?, sources_json = ?,
                version = ?, updated_at = ?
            WHERE user_id = ? AND id = ? AND version = ?
            "#,
        )
        .bind(&entry.item)
        .bind(&entry.quantity)
        .bind(entry.completed)
        .bind(entry.source.as_str())
        .bind(&sources_json)
        .bind(entry.version as i64)
        .bind(to_micros(&entry.updated_at))
        .bind(user_id)
        .bind(&entry.id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_entry(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shopping_list_entries WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_entry_if_version(
        &self,
        user_id: &str,
        id: &str,
        expected_version: u64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM shopping_list_entries WHERE user_id = ? AND id = ? AND version = ?",
        )
        .bind(user_id)
        .bind(id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn put_recipe(&self, user_id: &str, recipe: &Recipe) -> Result<()> {
        let ingredients_json = serde_json::to_string(&recipe.ingredients)?;
        sqlx::query(
            r#"
            INSERT INTO recipes (user_id, id, title, ingredients_json)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, id) DO UPDATE SET
                title = excluded.title,
                ingredients_json = excluded.ingredients_json
            "#,
        )
        .bind(user_id)
        .bind(&recipe.id)
        .bind(&recipe.title)
        .bind(&ingredients_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_recipe(&self, user_id: &str, id: &str) -> Result<Option<Recipe>> {
        let row = sqlx::query(
            "SELECT id, title, ingredients_json FROM recipes WHERE user_id = ? AND id = ?",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(recipe_from_row).transpose()
    }

    async fn list_recipes(&self, user_id: &str) -> Result<Vec<Recipe>> {
        let rows = sqlx::query(
            "SELECT id, title, ingredients_json FROM recipes WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(recipe_from_row).collect()
    }

    async fn delete_recipe(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_meal_plan(&self, user_id: &str) -> Result<Option<MealPlan>> {
        let plan_json: Option<String> =
            sqlx::query_scalar("SELECT plan_json FROM meal_plans WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match plan_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_meal_plan(&self, user_id: &str, plan: &MealPlan) -> Result<()> {
        let plan_json = serde_json::to_string(plan)?;
        sqlx::query(
            r#"
            INSERT INTO meal_plans (user_id, plan_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                plan_json = excluded.plan_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&plan_json)
        .bind(to_micros(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
