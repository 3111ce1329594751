//! Storage abstraction for Mealcart.
//!
//! The [`Store`] trait defines every storage operation the aggregator and
//! the meal planner need, enabling pluggable backends (SQLite, in-memory,
//! future WASM-compatible stores). All data is scoped by an opaque user key
//! issued by the auth provider; no operation reads across users.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Conditional writes
//!
//! Shopping-list entries are mutated read-modify-write. To keep two writers
//! from silently overwriting each other, the entry operations are
//! conditional:
//!
//! - [`insert_entry`](Store::insert_entry) refuses a second entry with the
//!   same `normalized_key` for the same user.
//! - [`update_entry`](Store::update_entry) and
//!   [`delete_entry_if_version`](Store::delete_entry_if_version) apply only
//!   while the stored `version` equals the caller's expected version.
//!
//! Each returns `Ok(false)` when the condition fails, so the caller can
//! re-read and recompute.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::meal_plan::MealPlan;
use crate::models::{Recipe, ShoppingListEntry};

/// Abstract storage backend for Mealcart.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_entries`](Store::list_entries) | All entries of a user, newest first |
/// | [`get_entry`](Store::get_entry) | Entry by id |
/// | [`find_entry_by_key`](Store::find_entry_by_key) | Entry by normalized key |
/// | [`insert_entry`](Store::insert_entry) | Create unless the key is taken |
/// | [`update_entry`](Store::update_entry) | Replace if the version matches |
/// | [`delete_entry`](Store::delete_entry) | Unconditional delete |
/// | [`delete_entry_if_version`](Store::delete_entry_if_version) | Delete if the version matches |
/// | [`put_recipe`](Store::put_recipe) / [`get_recipe`](Store::get_recipe) | Recipe collaborator |
/// | [`get_meal_plan`](Store::get_meal_plan) / [`put_meal_plan`](Store::put_meal_plan) | Weekly plan |
#[async_trait]
pub trait Store: Send + Sync {
    /// All entries for `user_id`, ordered by `created_at` descending.
    async fn list_entries(&self, user_id: &str) -> Result<Vec<ShoppingListEntry>>;

    async fn get_entry(&self, user_id: &str, id: &str) -> Result<Option<ShoppingListEntry>>;

    async fn find_entry_by_key(
        &self,
        user_id: &str,
        normalized_key: &str,
    ) -> Result<Option<ShoppingListEntry>>;

    /// Insert a new entry. Returns `false` if the user already has an
    /// entry with the same `normalized_key`.
    async fn insert_entry(&self, user_id: &str, entry: &ShoppingListEntry) -> Result<bool>;

    /// Overwrite the stored entry with `entry` if its stored version equals
    /// `expected_version`. The caller sets `entry.version` to the new value.
    async fn update_entry(
        &self,
        user_id: &str,
        entry: &ShoppingListEntry,
        expected_version: u64,
    ) -> Result<bool>;

    /// Delete regardless of version. Returns `false` if nothing was deleted.
    async fn delete_entry(&self, user_id: &str, id: &str) -> Result<bool>;

    async fn delete_entry_if_version(
        &self,
        user_id: &str,
        id: &str,
        expected_version: u64,
    ) -> Result<bool>;

    /// Insert or replace a recipe.
    async fn put_recipe(&self, user_id: &str, recipe: &Recipe) -> Result<()>;

    async fn get_recipe(&self, user_id: &str, id: &str) -> Result<Option<Recipe>>;

    /// All recipes for `user_id`, ordered by id.
    async fn list_recipes(&self, user_id: &str) -> Result<Vec<Recipe>>;

    async fn delete_recipe(&self, user_id: &str, id: &str) -> Result<bool>;

    /// The user's plan, or `None` if they never saved one.
    async fn get_meal_plan(&self, user_id: &str) -> Result<Option<MealPlan>>;

    async fn put_meal_plan(&self, user_id: &str, plan: &MealPlan) -> Result<()>;
}
