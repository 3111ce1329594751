//! Shopping-list aggregation.
//!
//! [`ShoppingList`] owns the mapping from normalized ingredient name to one
//! [`ShoppingListEntry`] per user, and tracks which contributions (a manual
//! add, or a recipe in the meal plan) keep each entry alive.
//!
//! # Contribution set
//!
//! Each entry's `sources` is a keyed set:
//!
//! | Record | Key | On repeat |
//! |--------|-----|-----------|
//! | `manual` | one per entry | quantities [`combine`] into the record |
//! | `meal_plan` | `recipe_id` | record quantity is replaced |
//!
//! The displayed `quantity` is recomputed from the set on every add
//! ([`combine_all`]) and on every removal ([`recalculate_quantity`]), so
//! re-sending the same recipe contribution never double-counts.
//!
//! # Writes
//!
//! Every mutation is read-modify-write against the [`Store`]'s conditional
//! operations. A lost race re-reads and recomputes, up to
//! [`AggregatorOptions::max_write_retries`] attempts, then fails with
//! [`ShoppingListError::Conflict`]. Batch operations (resync, recipe
//! removal) are atomic per entry, not as a whole.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Result, ShoppingListError};
use crate::meal_plan::MealPlan;
use crate::models::{Contribution, ListSummary, ShoppingListEntry, SourceKind, SyncReport};
use crate::normalize::normalize;
use crate::quantity::{
    combine, combine_all, recalculate_quantity, scale_by_count, split_ingredient,
};
use crate::store::Store;

/// Tunables for [`ShoppingList`].
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Attempts per conditional write before giving up with `Conflict`.
    pub max_write_retries: u32,
    /// Quantity used for manual adds without one and for ingredient lines
    /// that carry no number.
    pub default_quantity: String,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            max_write_retries: 3,
            default_quantity: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Key(&'a str),
    Id(&'a str),
}

impl Lookup<'_> {
    fn describe(&self) -> String {
        match self {
            Lookup::Key(key) => key.to_string(),
            Lookup::Id(id) => format!("id:{}", id),
        }
    }
}

enum Mutation {
    Create(ShoppingListEntry),
    Update(ShoppingListEntry),
    Delete,
    Keep,
}

enum Applied {
    Created(ShoppingListEntry),
    Updated(ShoppingListEntry),
    Deleted,
    Unchanged(Option<ShoppingListEntry>),
}

impl Applied {
    fn into_entry(self) -> Option<ShoppingListEntry> {
        match self {
            Applied::Created(e) | Applied::Updated(e) => Some(e),
            Applied::Unchanged(e) => e,
            Applied::Deleted => None,
        }
    }

    fn tally(&self, report: &mut SyncReport) {
        match self {
            Applied::Created(_) => report.created += 1,
            Applied::Updated(_) => report.updated += 1,
            Applied::Deleted => report.removed += 1,
            Applied::Unchanged(_) => {}
        }
    }
}

/// One recipe's ingredient lines folded per normalized key.
#[derive(Debug, Clone)]
struct GroupedLine {
    key: String,
    item: String,
    quantity: String,
}

/// Split recipe lines and combine those that normalize equal, keeping the
/// first line's display name. Lines with nothing to match on are dropped.
fn group_lines(ingredients: &[String], default_quantity: &str) -> Vec<GroupedLine> {
    let mut grouped: Vec<GroupedLine> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for line in ingredients {
        let (item, quantity) = split_ingredient(line, default_quantity);
        let key = normalize(&item);
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => grouped[i].quantity = combine(&grouped[i].quantity, &quantity),
            None => {
                index.insert(key.clone(), grouped.len());
                grouped.push(GroupedLine {
                    key,
                    item,
                    quantity,
                });
            }
        }
    }
    grouped
}

/// One recipe's contribution to one ingredient, derived from the plan.
#[derive(Debug, Clone)]
struct PlannedIngredient {
    key: String,
    item: String,
    quantity: String,
    recipe_id: String,
}

impl PlannedIngredient {
    fn contribution(&self) -> Contribution {
        Contribution::MealPlan {
            recipe_id: self.recipe_id.clone(),
            quantity: self.quantity.clone(),
        }
    }
}

/// Fold `incoming` into an entry's contribution set.
fn merge_contribution(sources: &mut Vec<Contribution>, incoming: Contribution) {
    match incoming {
        Contribution::Manual { quantity } => {
            match sources.iter().position(|c| c.kind() == SourceKind::Manual) {
                Some(i) => {
                    let merged = combine(sources[i].quantity(), &quantity);
                    sources[i] = Contribution::Manual { quantity: merged };
                }
                None => sources.push(Contribution::Manual { quantity }),
            }
        }
        Contribution::MealPlan {
            recipe_id,
            quantity,
        } => {
            let record = Contribution::MealPlan {
                recipe_id: recipe_id.clone(),
                quantity,
            };
            match sources.iter().position(|c| c.is_from_recipe(&recipe_id)) {
                Some(i) => sources[i] = record,
                None => sources.push(record),
            }
        }
    }
}

/// Rebuild an entry's sources against the plan.
///
/// Records of plan-owned recipes are replaced by the matching target or
/// dropped. Manual records and records of recipes the plan does not own
/// are kept. Positions stay stable; new targets are appended.
fn reconcile_sources(
    current: &[Contribution],
    targets: &[Contribution],
    owned: &HashSet<String>,
) -> Vec<Contribution> {
    let mut pending: Vec<Option<&Contribution>> = targets.iter().map(Some).collect();
    let mut out = Vec::with_capacity(current.len() + targets.len());
    for c in current {
        let Some(recipe_id) = c.recipe_id() else {
            out.push(c.clone());
            continue;
        };
        let matching = pending
            .iter_mut()
            .find(|t| t.and_then(Contribution::recipe_id) == Some(recipe_id));
        match matching {
            Some(slot) => out.extend(slot.take().cloned()),
            None if owned.contains(recipe_id) => {}
            None => out.push(c.clone()),
        }
    }
    out.extend(pending.into_iter().flatten().cloned());
    out
}

/// Decide how an entry changes when resynced against the plan.
fn resync_entry(
    current: &ShoppingListEntry,
    targets: &[Contribution],
    owned: &HashSet<String>,
) -> Mutation {
    let sources = reconcile_sources(&current.sources, targets, owned);
    if sources == current.sources {
        Mutation::Keep
    } else if sources.is_empty() {
        Mutation::Delete
    } else {
        let mut next = current.clone();
        next.quantity = combine_all(&sources);
        next.sources = sources;
        Mutation::Update(next)
    }
}

/// Per-user shopping-list aggregator over a [`Store`].
#[derive(Clone)]
pub struct ShoppingList {
    store: Arc<dyn Store>,
    options: AggregatorOptions,
}

impl ShoppingList {
    pub fn new(store: Arc<dyn Store>, options: AggregatorOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    /// Run one read-decide-write cycle with bounded retries.
    async fn apply<F>(&self, user_id: &str, lookup: Lookup<'_>, mut decide: F) -> Result<Applied>
    where
        F: FnMut(Option<&ShoppingListEntry>) -> Mutation + Send,
    {
        let attempts = self.options.max_write_retries.max(1);
        for attempt in 1..=attempts {
            let current = match lookup {
                Lookup::Key(key) => self.store.find_entry_by_key(user_id, key).await?,
                Lookup::Id(id) => self.store.get_entry(user_id, id).await?,
            };

            match decide(current.as_ref()) {
                Mutation::Keep => return Ok(Applied::Unchanged(current)),
                Mutation::Create(entry) => {
                    if self.store.insert_entry(user_id, &entry).await? {
                        debug!(user_id, key = %entry.normalized_key, "created entry");
                        return Ok(Applied::Created(entry));
                    }
                }
                Mutation::Update(mut entry) => {
                    if let Some(expected) = current.as_ref().map(|c| c.version) {
                        entry.version = expected + 1;
                        entry.updated_at = Utc::now();
                        if self.store.update_entry(user_id, &entry, expected).await? {
                            debug!(user_id, key = %entry.normalized_key, version = entry.version, "updated entry");
                            return Ok(Applied::Updated(entry));
                        }
                    }
                }
                Mutation::Delete => {
                    if let Some(cur) = current.as_ref() {
                        if self
                            .store
                            .delete_entry_if_version(user_id, &cur.id, cur.version)
                            .await?
                        {
                            debug!(user_id, key = %cur.normalized_key, "deleted entry");
                            return Ok(Applied::Deleted);
                        }
                    }
                }
            }

            debug!(user_id, entry = %lookup.describe(), attempt, "conditional write lost a race");
        }

        warn!(user_id, entry = %lookup.describe(), attempts, "giving up after repeated write conflicts");
        Err(ShoppingListError::Conflict {
            key: lookup.describe(),
            attempts,
        })
    }

    /// Merge one contribution into the entry for `item_name`'s key.
    async fn contribute(
        &self,
        user_id: &str,
        item_name: &str,
        contribution: Contribution,
    ) -> Result<Applied> {
        let item = item_name.trim();
        let key = normalize(item);
        if key.is_empty() {
            return Err(ShoppingListError::Validation(format!(
                "item name '{}' has nothing to match on",
                item_name
            )));
        }

        self.apply(user_id, Lookup::Key(&key), |current| match current {
            None => Mutation::Create(ShoppingListEntry::new(item, contribution.clone())),
            Some(existing) => {
                let mut next = existing.clone();
                merge_contribution(&mut next.sources, contribution.clone());
                next.quantity = combine_all(&next.sources);
                if next.sources == existing.sources && next.quantity == existing.quantity {
                    Mutation::Keep
                } else {
                    Mutation::Update(next)
                }
            }
        })
        .await
    }

    /// Add a contribution, creating the entry or merging into the existing
    /// one with the same normalized name.
    ///
    /// `recipe_id` is required when `source` is [`SourceKind::MealPlan`].
    /// Repeating a meal-plan contribution for the same recipe replaces it;
    /// repeating a manual add accumulates.
    pub async fn add_or_update(
        &self,
        user_id: &str,
        item_name: &str,
        quantity: &str,
        source: SourceKind,
        recipe_id: Option<&str>,
    ) -> Result<ShoppingListEntry> {
        let contribution = match (source, recipe_id.map(str::trim)) {
            (SourceKind::Manual, _) => Contribution::Manual {
                quantity: quantity.to_string(),
            },
            (SourceKind::MealPlan, Some(id)) if !id.is_empty() => Contribution::MealPlan {
                recipe_id: id.to_string(),
                quantity: quantity.to_string(),
            },
            (SourceKind::MealPlan, _) => {
                return Err(ShoppingListError::Validation(
                    "meal_plan contributions require a recipe id".to_string(),
                ))
            }
        };

        self.contribute(user_id, item_name, contribution)
            .await?
            .into_entry()
            .ok_or_else(|| ShoppingListError::NotFound(format!("entry for '{}'", item_name)))
    }

    /// Manual add from the UI. Empty names are rejected; an empty quantity
    /// becomes the configured default.
    pub async fn add_item(
        &self,
        user_id: &str,
        item: &str,
        quantity: Option<&str>,
    ) -> Result<ShoppingListEntry> {
        let item = item.trim();
        if item.is_empty() {
            return Err(ShoppingListError::Validation(
                "item must not be empty".to_string(),
            ));
        }
        let quantity = quantity
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(self.options.default_quantity.as_str());
        self.add_or_update(user_id, item, quantity, SourceKind::Manual, None)
            .await
    }

    /// Incremental attach: contribute one recipe's ingredient lines.
    ///
    /// Lines of the same recipe that normalize equal are combined first, so
    /// each entry gets a single record for this recipe.
    pub async fn add_meal_plan_ingredients(
        &self,
        user_id: &str,
        recipe_id: &str,
        ingredients: &[String],
    ) -> Result<Vec<ShoppingListEntry>> {
        if recipe_id.trim().is_empty() {
            return Err(ShoppingListError::Validation(
                "recipe id must not be empty".to_string(),
            ));
        }

        let grouped = group_lines(ingredients, &self.options.default_quantity);
        let mut entries = Vec::with_capacity(grouped.len());
        for line in grouped {
            let entry = self
                .add_or_update(
                    user_id,
                    &line.item,
                    &line.quantity,
                    SourceKind::MealPlan,
                    Some(recipe_id),
                )
                .await?;
            entries.push(entry);
        }
        info!(user_id, recipe_id, entries = entries.len(), "added meal plan ingredients");
        Ok(entries)
    }

    /// Detach a recipe: drop its `meal_plan` records everywhere, delete
    /// entries left with no source, and recalculate the rest.
    pub async fn remove_meal_ingredients(&self, user_id: &str, recipe_id: &str) -> Result<SyncReport> {
        let entries = self.store.list_entries(user_id).await?;
        let mut report = SyncReport::default();

        for entry in entries.iter().filter(|e| e.has_recipe_source(recipe_id)) {
            let applied = self
                .apply(user_id, Lookup::Id(&entry.id), |current| {
                    let Some(current) = current else {
                        return Mutation::Keep;
                    };
                    let remaining: Vec<Contribution> = current
                        .sources
                        .iter()
                        .filter(|c| !c.is_from_recipe(recipe_id))
                        .cloned()
                        .collect();
                    if remaining.len() == current.sources.len() {
                        Mutation::Keep
                    } else if remaining.is_empty() {
                        Mutation::Delete
                    } else {
                        let mut next = current.clone();
                        next.quantity = recalculate_quantity(&remaining);
                        next.sources = remaining;
                        Mutation::Update(next)
                    }
                })
                .await?;
            applied.tally(&mut report);
        }

        info!(
            user_id,
            recipe_id,
            updated = report.updated,
            removed = report.removed,
            "removed meal plan ingredients"
        );
        Ok(report)
    }

    /// Explicit user delete. Ignores provenance.
    pub async fn remove_item(&self, user_id: &str, entry_id: &str) -> Result<()> {
        if self.store.delete_entry(user_id, entry_id).await? {
            Ok(())
        } else {
            Err(ShoppingListError::NotFound(format!(
                "shopping list entry {}",
                entry_id
            )))
        }
    }

    /// Set the completed flag. Leaves `sources` and `quantity` alone.
    pub async fn toggle_completion(
        &self,
        user_id: &str,
        entry_id: &str,
        completed: bool,
    ) -> Result<ShoppingListEntry> {
        let applied = self
            .apply(user_id, Lookup::Id(entry_id), |current| match current {
                None => Mutation::Keep,
                Some(existing) => {
                    let mut next = existing.clone();
                    next.completed = completed;
                    Mutation::Update(next)
                }
            })
            .await?;

        match applied {
            Applied::Updated(entry) => Ok(entry),
            _ => Err(ShoppingListError::NotFound(format!(
                "shopping list entry {}",
                entry_id
            ))),
        }
    }

    /// All entries for the user, most recently created first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<ShoppingListEntry>> {
        let mut entries = self.store.list_entries(user_id).await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn get(&self, user_id: &str, entry_id: &str) -> Result<ShoppingListEntry> {
        self.store
            .get_entry(user_id, entry_id)
            .await?
            .ok_or_else(|| ShoppingListError::NotFound(format!("shopping list entry {}", entry_id)))
    }

    /// Remove every completed entry. Returns how many were removed.
    pub async fn clear_completed(&self, user_id: &str) -> Result<usize> {
        let entries = self.store.list_entries(user_id).await?;
        let mut removed = 0;
        for entry in entries.iter().filter(|e| e.completed) {
            if self.store.delete_entry(user_id, &entry.id).await? {
                removed += 1;
            }
        }
        info!(user_id, removed, "cleared completed entries");
        Ok(removed)
    }

    pub async fn summary(&self, user_id: &str) -> Result<ListSummary> {
        let entries = self.store.list_entries(user_id).await?;
        Ok(ListSummary {
            total: entries.len(),
            completed: entries.iter().filter(|e| e.completed).count(),
        })
    }

    /// Derive the plan's contributions: one per (recipe, ingredient).
    ///
    /// A recipe's lines are grouped per ingredient and scaled by the number
    /// of slots the recipe occupies. Recipes are visited in slot order.
    async fn plan_contributions(&self, user_id: &str, plan: &MealPlan) -> Result<Vec<PlannedIngredient>> {
        let mut occurrences: Vec<(String, u32)> = Vec::new();
        for slot in plan.occupied_slots() {
            match occurrences.iter().position(|(id, _)| *id == slot.recipe_id) {
                Some(i) => occurrences[i].1 += 1,
                None => occurrences.push((slot.recipe_id, 1)),
            }
        }

        let mut planned = Vec::new();
        for (recipe_id, count) in occurrences {
            let Some(recipe) = self.store.get_recipe(user_id, &recipe_id).await? else {
                warn!(user_id, recipe_id = %recipe_id, "meal plan references a missing recipe, skipping");
                continue;
            };
            for line in group_lines(&recipe.ingredients, &self.options.default_quantity) {
                planned.push(PlannedIngredient {
                    quantity: scale_by_count(&line.quantity, count),
                    key: line.key,
                    item: line.item,
                    recipe_id: recipe_id.clone(),
                });
            }
        }
        Ok(planned)
    }

    /// Full-plan resynchronization.
    ///
    /// Meal-plan contributions are a derived view of `plan`. Every entry
    /// gets exactly one `meal_plan` record per planned recipe that uses the
    /// ingredient. Records of recipes that left the plan are dropped if
    /// an earlier sync derived them (`plan.synced_recipes`); records added
    /// incrementally for recipes the plan never held are left alone, as are
    /// manual records. Entries left without sources are deleted.
    ///
    /// On success `plan.synced_recipes` is set to the plan's recipes; the
    /// caller persists the plan. Running it twice on the same plan changes
    /// nothing the second time.
    pub async fn sync_meal_plan_ingredients(
        &self,
        user_id: &str,
        plan: &mut MealPlan,
    ) -> Result<SyncReport> {
        let planned = self.plan_contributions(user_id, plan).await?;
        let in_plan = plan.recipe_ids();
        let owned: HashSet<String> = in_plan
            .iter()
            .chain(plan.synced_recipes.iter())
            .cloned()
            .collect();

        let mut keys: Vec<&str> = Vec::new();
        let mut by_key: HashMap<&str, Vec<&PlannedIngredient>> = HashMap::new();
        for p in &planned {
            let group = by_key.entry(p.key.as_str()).or_default();
            if group.is_empty() {
                keys.push(p.key.as_str());
            }
            group.push(p);
        }
        let targets_for = |key: &str| -> Vec<Contribution> {
            by_key
                .get(key)
                .map(|group| group.iter().map(|p| p.contribution()).collect())
                .unwrap_or_default()
        };

        let existing = self.store.list_entries(user_id).await?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut report = SyncReport::default();

        for entry in &existing {
            seen.insert(entry.normalized_key.as_str());
            let targets = targets_for(&entry.normalized_key);
            let touches_plan = entry
                .sources
                .iter()
                .filter_map(Contribution::recipe_id)
                .any(|id| owned.contains(id));
            if targets.is_empty() && !touches_plan {
                continue;
            }

            let applied = self
                .apply(user_id, Lookup::Id(&entry.id), |current| match current {
                    None => Mutation::Keep,
                    Some(current) => resync_entry(current, &targets, &owned),
                })
                .await?;
            applied.tally(&mut report);
        }

        for key in keys.iter().copied().filter(|k| !seen.contains(k)) {
            let targets = targets_for(key);
            let Some(item) = by_key.get(key).and_then(|g| g.first()).map(|p| p.item.as_str()) else {
                continue;
            };
            let applied = self
                .apply(user_id, Lookup::Key(key), |current| match current {
                    Some(current) => resync_entry(current, &targets, &owned),
                    None => match targets.first() {
                        Some(first) => {
                            let mut entry = ShoppingListEntry::new(item, first.clone());
                            entry.quantity = combine_all(&targets);
                            entry.sources = targets.clone();
                            Mutation::Create(entry)
                        }
                        None => Mutation::Keep,
                    },
                })
                .await?;
            applied.tally(&mut report);
        }

        plan.synced_recipes = in_plan;
        info!(
            user_id,
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            "synchronized meal plan ingredients"
        );
        Ok(report)
    }
}
