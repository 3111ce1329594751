//! The weekly meal-plan grid: 7 days × {breakfast, lunch, dinner}.
//!
//! A slot holds a recipe id or nothing. The grid itself knows nothing about
//! ingredients; [`crate::planner::MealPlanner`] turns plan changes into
//! shopping-list updates.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShoppingListError};
use crate::models::{MealPlanSlot, MealType};

pub const DAYS_PER_WEEK: usize = 7;
pub const SLOTS_PER_WEEK: usize = DAYS_PER_WEEK * MealType::ALL.len();

/// Day labels by index. Weeks start on Monday.
pub const DAY_NAMES: [&str; DAYS_PER_WEEK] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// The three meal slots of one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMeals {
    #[serde(default)]
    pub breakfast: Option<String>,
    #[serde(default)]
    pub lunch: Option<String>,
    #[serde(default)]
    pub dinner: Option<String>,
}

impl DayMeals {
    pub fn get(&self, meal: MealType) -> Option<&str> {
        match meal {
            MealType::Breakfast => self.breakfast.as_deref(),
            MealType::Lunch => self.lunch.as_deref(),
            MealType::Dinner => self.dinner.as_deref(),
        }
    }

    fn slot_mut(&mut self, meal: MealType) -> &mut Option<String> {
        match meal {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
        }
    }
}

/// Overview numbers shown above the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub meals_planned: usize,
    pub unique_recipes: usize,
    pub open_slots: usize,
}

/// A user's weekly plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    /// Free-form label such as `"Week of Oct 19"`.
    #[serde(default)]
    pub week: Option<String>,
    #[serde(default)]
    pub days: [DayMeals; DAYS_PER_WEEK],
    /// Recipes whose shopping-list contributions the last sync derived
    /// from this plan. A recipe leaving the plan is only withdrawn from the
    /// list if it is listed here.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub synced_recipes: BTreeSet<String>,
}

fn check_day(day: usize) -> Result<()> {
    if day >= DAYS_PER_WEEK {
        return Err(ShoppingListError::Validation(format!(
            "day index must be in 0..{}, got {}",
            DAYS_PER_WEEK, day
        )));
    }
    Ok(())
}

/// Parse a day given as an index (`0` is Monday), a day name, or a
/// prefix of at least three letters (`"wed"`).
pub fn parse_day(input: &str) -> Result<usize> {
    let input = input.trim();
    if let Ok(index) = input.parse::<usize>() {
        check_day(index)?;
        return Ok(index);
    }
    let lower = input.to_lowercase();
    DAY_NAMES
        .iter()
        .position(|name| {
            let name = name.to_lowercase();
            name == lower || (lower.len() >= 3 && name.starts_with(&lower))
        })
        .ok_or_else(|| ShoppingListError::Validation(format!("unknown day: '{}'", input)))
}

impl MealPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: usize, meal: MealType) -> Result<Option<&str>> {
        check_day(day)?;
        Ok(self.days[day].get(meal))
    }

    /// Place a recipe into a slot, returning the recipe it replaced.
    pub fn set_slot(&mut self, day: usize, meal: MealType, recipe_id: &str) -> Result<Option<String>> {
        check_day(day)?;
        let recipe_id = recipe_id.trim();
        if recipe_id.is_empty() {
            return Err(ShoppingListError::Validation(
                "recipe id must not be empty".to_string(),
            ));
        }
        Ok(self.days[day].slot_mut(meal).replace(recipe_id.to_string()))
    }

    /// Empty a slot, returning the recipe that occupied it.
    pub fn clear_slot(&mut self, day: usize, meal: MealType) -> Result<Option<String>> {
        check_day(day)?;
        Ok(self.days[day].slot_mut(meal).take())
    }

    /// Move a meal to another slot. An occupied target swaps places with
    /// the moved meal.
    pub fn move_slot(
        &mut self,
        from_day: usize,
        from_meal: MealType,
        to_day: usize,
        to_meal: MealType,
    ) -> Result<()> {
        check_day(from_day)?;
        check_day(to_day)?;
        let empty_source = || {
            ShoppingListError::NotFound(format!(
                "no meal planned for day {} {}",
                from_day, from_meal
            ))
        };
        if from_day == to_day && from_meal == to_meal {
            return self.days[from_day]
                .get(from_meal)
                .map(|_| ())
                .ok_or_else(empty_source);
        }
        let moving = self.days[from_day]
            .slot_mut(from_meal)
            .take()
            .ok_or_else(empty_source)?;
        let displaced = self.days[to_day].slot_mut(to_meal).replace(moving);
        *self.days[from_day].slot_mut(from_meal) = displaced;
        Ok(())
    }

    /// Empty every slot. Returns how many were occupied.
    pub fn clear_all(&mut self) -> usize {
        let mut cleared = 0;
        for day in self.days.iter_mut() {
            for meal in MealType::ALL {
                if day.slot_mut(meal).take().is_some() {
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Occupied slots in day order, then breakfast, lunch, dinner.
    pub fn occupied_slots(&self) -> Vec<MealPlanSlot> {
        let mut slots = Vec::new();
        for (day_index, day) in self.days.iter().enumerate() {
            for meal_type in MealType::ALL {
                if let Some(recipe_id) = day.get(meal_type) {
                    slots.push(MealPlanSlot {
                        day_index,
                        meal_type,
                        recipe_id: recipe_id.to_string(),
                    });
                }
            }
        }
        slots
    }

    /// Distinct recipe ids currently in the grid.
    pub fn recipe_ids(&self) -> BTreeSet<String> {
        self.occupied_slots()
            .into_iter()
            .map(|s| s.recipe_id)
            .collect()
    }

    pub fn contains_recipe(&self, recipe_id: &str) -> bool {
        self.days
            .iter()
            .any(|d| MealType::ALL.iter().any(|m| d.get(*m) == Some(recipe_id)))
    }

    pub fn stats(&self) -> PlanStats {
        let slots = self.occupied_slots();
        let unique: HashSet<&str> = slots.iter().map(|s| s.recipe_id.as_str()).collect();
        PlanStats {
            meals_planned: slots.len(),
            unique_recipes: unique.len(),
            open_slots: SLOTS_PER_WEEK - slots.len(),
        }
    }
}
