//! In-memory [`Store`] implementation for testing and WASM targets.
//!
//! Uses `HashMap`s behind a single `std::sync::RwLock`, so every trait call
//! is atomic with respect to the others. Listing order ties on
//! `created_at` are broken by insertion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::meal_plan::MealPlan;
use crate::models::{Recipe, ShoppingListEntry};

use super::Store;

struct StoredEntry {
    seq: u64,
    entry: ShoppingListEntry,
}

#[derive(Default)]
struct UserData {
    entries: HashMap<String, StoredEntry>,
    recipes: BTreeMap<String, Recipe>,
    meal_plan: Option<MealPlan>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserData>,
    next_seq: u64,
}

/// In-memory store for testing and WASM environments.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_entries(&self, user_id: &str) -> Result<Vec<ShoppingListEntry>> {
        let inner = self.read()?;
        let Some(user) = inner.users.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut stored: Vec<&StoredEntry> = user.entries.values().collect();
        stored.sort_by(|a, b| {
            b.entry
                .created_at
                .cmp(&a.entry.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(stored.into_iter().map(|s| s.entry.clone()).collect())
    }

    async fn get_entry(&self, user_id: &str, id: &str) -> Result<Option<ShoppingListEntry>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .get(user_id)
            .and_then(|u| u.entries.get(id))
            .map(|s| s.entry.clone()))
    }

    async fn find_entry_by_key(
        &self,
        user_id: &str,
        normalized_key: &str,
    ) -> Result<Option<ShoppingListEntry>> {
        let inner = self.read()?;
        Ok(inner.users.get(user_id).and_then(|u| {
            u.entries
                .values()
                .find(|s| s.entry.normalized_key == normalized_key)
                .map(|s| s.entry.clone())
        }))
    }

    async fn insert_entry(&self, user_id: &str, entry: &ShoppingListEntry) -> Result<bool> {
        let mut inner = self.write()?;
        let seq = inner.next_seq;
        let user = inner.users.entry(user_id.to_string()).or_default();
        let taken = user.entries.contains_key(&entry.id)
            || user
                .entries
                .values()
                .any(|s| s.entry.normalized_key == entry.normalized_key);
        if taken {
            return Ok(false);
        }
        user.entries.insert(
            entry.id.clone(),
            StoredEntry {
                seq,
                entry: entry.clone(),
            },
        );
        inner.next_seq += 1;
        Ok(true)
    }

    async fn update_entry(
        &self,
        user_id: &str,
        entry: &ShoppingListEntry,
        expected_version: u64,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        let stored = inner
            .users
            .get_mut(user_id)
            .and_then(|u| u.entries.get_mut(&entry.id));
        match stored {
            Some(s) if s.entry.version == expected_version => {
                s.entry = entry.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_entry(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner
            .users
            .get_mut(user_id)
            .and_then(|u| u.entries.remove(id))
            .is_some())
    }

    async fn delete_entry_if_version(
        &self,
        user_id: &str,
        id: &str,
        expected_version: u64,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(user) = inner.users.get_mut(user_id) else {
            return Ok(false);
        };
        let matches = user
            .entries
            .get(id)
            .is_some_and(|s| s.entry.version == expected_version);
        if matches {
            user.entries.remove(id);
        }
        Ok(matches)
    }

    async fn put_recipe(&self, user_id: &str, recipe: &Recipe) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .users
            .entry(user_id.to_string())
            .or_default()
            .recipes
            .insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn get_recipe(&self, user_id: &str, id: &str) -> Result<Option<Recipe>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .get(user_id)
            .and_then(|u| u.recipes.get(id))
            .cloned())
    }

    async fn list_recipes(&self, user_id: &str) -> Result<Vec<Recipe>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .get(user_id)
            .map(|u| u.recipes.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_recipe(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner
            .users
            .get_mut(user_id)
            .and_then(|u| u.recipes.remove(id))
            .is_some())
    }

    async fn get_meal_plan(&self, user_id: &str) -> Result<Option<MealPlan>> {
        let inner = self.read()?;
        Ok(inner.users.get(user_id).and_then(|u| u.meal_plan.clone()))
    }

    async fn put_meal_plan(&self, user_id: &str, plan: &MealPlan) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .users
            .entry(user_id.to_string())
            .or_default()
            .meal_plan = Some(plan.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contribution;

    fn entry(item: &str) -> ShoppingListEntry {
        ShoppingListEntry::new(
            item,
            Contribution::Manual {
                quantity: "1".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let store = InMemoryStore::new();
        assert!(store.insert_entry("u1", &entry("Flour")).await.unwrap());
        assert!(!store.insert_entry("u1", &entry("flour")).await.unwrap());
        // Other users are unaffected.
        assert!(store.insert_entry("u2", &entry("flour")).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_requires_matching_version() {
        let store = InMemoryStore::new();
        let mut e = entry("Milk");
        store.insert_entry("u1", &e).await.unwrap();

        e.quantity = "2".to_string();
        e.version = 2;
        assert!(store.update_entry("u1", &e, 1).await.unwrap());

        e.quantity = "3".to_string();
        e.version = 3;
        assert!(!store.update_entry("u1", &e, 1).await.unwrap());

        let stored = store.get_entry("u1", &e.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, "2");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_delete_if_version() {
        let store = InMemoryStore::new();
        let e = entry("Milk");
        store.insert_entry("u1", &e).await.unwrap();
        assert!(!store.delete_entry_if_version("u1", &e.id, 7).await.unwrap());
        assert!(store.delete_entry_if_version("u1", &e.id, 1).await.unwrap());
        assert!(!store.delete_entry("u1", &e.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryStore::new();
        let first = entry("Apples");
        let mut second = entry("Bread");
        second.created_at = first.created_at;
        store.insert_entry("u1", &first).await.unwrap();
        store.insert_entry("u1", &second).await.unwrap();

        let listed = store.list_entries("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].item, "Bread");
        assert_eq!(listed[1].item, "Apples");
        assert!(store.list_entries("nobody").await.unwrap().is_empty());
    }
}
