//! Core data models shared by the aggregator, the stores, and the HTTP API.
//!
//! Field names serialize in camelCase to match the persisted entry shape
//! (`item`, `quantity`, `completed`, `source`, `sources[]`, `createdAt`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::normalize;

/// Origin of a shopping-list contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Manual,
    MealPlan,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Manual => "manual",
            SourceKind::MealPlan => "meal_plan",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SourceKind::Manual),
            "meal_plan" => Ok(SourceKind::MealPlan),
            other => Err(format!("unknown source: '{}'", other)),
        }
    }
}

/// One record of why an entry exists.
///
/// An entry holds at most one `Manual` record and at most one `MealPlan`
/// record per distinct `recipe_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Contribution {
    Manual {
        quantity: String,
    },
    MealPlan {
        #[serde(rename = "recipeId")]
        recipe_id: String,
        quantity: String,
    },
}

impl Contribution {
    pub fn kind(&self) -> SourceKind {
        match self {
            Contribution::Manual { .. } => SourceKind::Manual,
            Contribution::MealPlan { .. } => SourceKind::MealPlan,
        }
    }

    pub fn quantity(&self) -> &str {
        match self {
            Contribution::Manual { quantity } | Contribution::MealPlan { quantity, .. } => quantity,
        }
    }

    /// The contributing recipe, for `MealPlan` records.
    pub fn recipe_id(&self) -> Option<&str> {
        match self {
            Contribution::Manual { .. } => None,
            Contribution::MealPlan { recipe_id, .. } => Some(recipe_id),
        }
    }

    pub fn is_from_recipe(&self, recipe_id: &str) -> bool {
        self.recipe_id() == Some(recipe_id)
    }
}

/// One row of a user's shopping list, keyed by [`normalized_key`](Self::normalized_key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListEntry {
    /// Stable external reference for toggle/remove calls.
    pub id: String,
    /// Display name as entered by the first contributor.
    pub item: String,
    pub normalized_key: String,
    pub quantity: String,
    pub completed: bool,
    /// Primary origin, fixed at creation.
    pub source: SourceKind,
    pub sources: Vec<Contribution>,
    /// Optimistic-concurrency token. Starts at 1; every write bumps it.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingListEntry {
    /// Build a fresh entry from its first contribution.
    pub fn new(item: &str, contribution: Contribution) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            item: item.to_string(),
            normalized_key: normalize(item),
            quantity: contribution.quantity().to_string(),
            completed: false,
            source: contribution.kind(),
            sources: vec![contribution],
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_manual_source(&self) -> bool {
        self.sources
            .iter()
            .any(|c| c.kind() == SourceKind::Manual)
    }

    pub fn has_recipe_source(&self, recipe_id: &str) -> bool {
        self.sources.iter().any(|c| c.is_from_recipe(recipe_id))
    }
}

/// A stored recipe. Only the ingredient lines matter to the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

/// The three meal slots of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            other => Err(format!(
                "unknown meal type: '{}'. Must be breakfast, lunch, or dinner.",
                other
            )),
        }
    }
}

/// An occupied cell of the meal-plan grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanSlot {
    pub day_index: usize,
    pub meal_type: MealType,
    pub recipe_id: String,
}

/// Counts behind "X of Y items completed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub total: usize,
    pub completed: usize,
}

/// What a batch operation did to the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_from_manual() {
        let entry = ShoppingListEntry::new(
            "Flour",
            Contribution::Manual {
                quantity: "2 cups".to_string(),
            },
        );
        assert_eq!(entry.item, "Flour");
        assert_eq!(entry.normalized_key, "flour");
        assert_eq!(entry.quantity, "2 cups");
        assert_eq!(entry.source, SourceKind::Manual);
        assert_eq!(entry.version, 1);
        assert!(!entry.completed);
        assert!(entry.has_manual_source());
    }

    #[test]
    fn test_contribution_json_shape() {
        let c = Contribution::MealPlan {
            recipe_id: "r1".to_string(),
            quantity: "2 eggs".to_string(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "meal_plan", "recipeId": "r1", "quantity": "2 eggs"})
        );

        let manual: Contribution =
            serde_json::from_value(serde_json::json!({"type": "manual", "quantity": "1"})).unwrap();
        assert_eq!(manual.kind(), SourceKind::Manual);
        assert_eq!(manual.recipe_id(), None);
    }

    #[test]
    fn test_entry_json_is_camel_case() {
        let entry = ShoppingListEntry::new(
            "Eggs",
            Contribution::MealPlan {
                recipe_id: "r1".to_string(),
                quantity: "2 eggs".to_string(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["normalizedKey"], "eggs");
        assert_eq!(json["source"], "meal_plan");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["sources"][0]["recipeId"], "r1");
    }

    #[test]
    fn test_meal_type_parse() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("brunch".parse::<MealType>().is_err());
    }
}
