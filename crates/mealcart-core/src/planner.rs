//! Meal-plan edits that keep the shopping list in step.
//!
//! Every mutation persists the new plan and then runs a full
//! [`ShoppingList::sync_meal_plan_ingredients`], so the list's meal-plan
//! contributions always reflect the saved plan. The plan is written before
//! the sync and again afterwards when the set of synced recipes changed, so
//! an interrupted sync is finished by the next one. The plan itself is
//! stored last-writer-wins; the per-entry list writes are version-checked.

use std::sync::Arc;

use tracing::info;

use crate::aggregator::ShoppingList;
use crate::error::{Result, ShoppingListError};
use crate::meal_plan::MealPlan;
use crate::models::{MealType, Recipe, SyncReport};
use crate::store::Store;

/// Meal-plan operations bound to a [`ShoppingList`].
#[derive(Clone)]
pub struct MealPlanner {
    list: ShoppingList,
}

impl MealPlanner {
    pub fn new(list: ShoppingList) -> Self {
        Self { list }
    }

    pub fn shopping_list(&self) -> &ShoppingList {
        &self.list
    }

    fn store(&self) -> &Arc<dyn Store> {
        self.list.store()
    }

    /// The user's saved plan, or an empty week.
    pub async fn plan(&self, user_id: &str) -> Result<MealPlan> {
        Ok(self
            .store()
            .get_meal_plan(user_id)
            .await?
            .unwrap_or_default())
    }

    async fn save_and_sync(&self, user_id: &str, plan: &mut MealPlan) -> Result<SyncReport> {
        self.store().put_meal_plan(user_id, plan).await?;
        self.sync_plan(user_id, plan).await
    }

    async fn sync_plan(&self, user_id: &str, plan: &mut MealPlan) -> Result<SyncReport> {
        let before = plan.synced_recipes.clone();
        let report = self.list.sync_meal_plan_ingredients(user_id, plan).await?;
        if plan.synced_recipes != before {
            self.store().put_meal_plan(user_id, plan).await?;
        }
        Ok(report)
    }

    /// Place a stored recipe into a slot, replacing whatever was there.
    pub async fn attach_recipe(
        &self,
        user_id: &str,
        day: usize,
        meal: MealType,
        recipe_id: &str,
    ) -> Result<SyncReport> {
        let recipe_id = recipe_id.trim();
        if self.store().get_recipe(user_id, recipe_id).await?.is_none() {
            return Err(ShoppingListError::NotFound(format!("recipe {}", recipe_id)));
        }

        let mut plan = self.plan(user_id).await?;
        let replaced = plan.set_slot(day, meal, recipe_id)?;
        info!(user_id, day, meal = %meal, recipe_id, replaced = ?replaced, "attached recipe");
        self.save_and_sync(user_id, &mut plan).await
    }

    /// Empty a slot. An already empty slot is a no-op.
    pub async fn detach_recipe(&self, user_id: &str, day: usize, meal: MealType) -> Result<SyncReport> {
        let mut plan = self.plan(user_id).await?;
        match plan.clear_slot(day, meal)? {
            None => Ok(SyncReport::default()),
            Some(recipe_id) => {
                info!(user_id, day, meal = %meal, recipe_id = %recipe_id, "detached recipe");
                self.save_and_sync(user_id, &mut plan).await
            }
        }
    }

    /// Move a meal between slots, swapping with an occupied target.
    pub async fn move_meal(
        &self,
        user_id: &str,
        from: (usize, MealType),
        to: (usize, MealType),
    ) -> Result<SyncReport> {
        let mut plan = self.plan(user_id).await?;
        plan.move_slot(from.0, from.1, to.0, to.1)?;
        self.save_and_sync(user_id, &mut plan).await
    }

    /// Set the free-form week label. Does not touch the shopping list.
    pub async fn set_week_label(&self, user_id: &str, label: Option<&str>) -> Result<MealPlan> {
        let mut plan = self.plan(user_id).await?;
        plan.week = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        self.store().put_meal_plan(user_id, &plan).await?;
        Ok(plan)
    }

    /// Empty the whole week.
    pub async fn clear_plan(&self, user_id: &str) -> Result<SyncReport> {
        let mut plan = self.plan(user_id).await?;
        let cleared = plan.clear_all();
        info!(user_id, cleared, "cleared meal plan");
        self.save_and_sync(user_id, &mut plan).await
    }

    /// Store a recipe. A recipe already in the plan is resynced so the list
    /// follows the edited ingredients.
    pub async fn save_recipe(&self, user_id: &str, recipe: &Recipe) -> Result<SyncReport> {
        if recipe.id.trim().is_empty() {
            return Err(ShoppingListError::Validation(
                "recipe id must not be empty".to_string(),
            ));
        }
        self.store().put_recipe(user_id, recipe).await?;
        if self.plan(user_id).await?.contains_recipe(&recipe.id) {
            return self.sync(user_id).await;
        }
        Ok(SyncReport::default())
    }

    /// Delete a recipe. If the plan still uses it, its contributions are
    /// withdrawn from the list; the slots keep the dangling id.
    pub async fn delete_recipe(&self, user_id: &str, recipe_id: &str) -> Result<SyncReport> {
        if !self.store().delete_recipe(user_id, recipe_id).await? {
            return Err(ShoppingListError::NotFound(format!("recipe {}", recipe_id)));
        }
        if self.plan(user_id).await?.contains_recipe(recipe_id) {
            return self.sync(user_id).await;
        }
        Ok(SyncReport::default())
    }

    /// Re-derive meal-plan contributions from the saved plan without
    /// changing it. Useful after recipes are edited.
    pub async fn sync(&self, user_id: &str) -> Result<SyncReport> {
        let mut plan = self.plan(user_id).await?;
        self.sync_plan(user_id, &mut plan).await
    }
}
