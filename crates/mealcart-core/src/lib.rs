//! # Mealcart Core
//!
//! Shared, WASM-safe logic for Mealcart: shopping-list data models,
//! ingredient name normalization, quantity arithmetic, the store
//! abstraction, the shopping-list aggregator, and the weekly meal plan.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. It compiles to both native targets and
//! `wasm32-unknown-unknown`.
//!
//! ## Data Flow
//!
//! 1. A recipe placed into a [`meal_plan::MealPlan`] slot (or a manual add)
//!    yields ingredient lines.
//! 2. Lines are split into an item and a quantity ([`quantity::split_ingredient`])
//!    and keyed by [`normalize::normalize`].
//! 3. The [`aggregator::ShoppingList`] merges contributions into one
//!    [`models::ShoppingListEntry`] per key, tracking every contributing
//!    recipe in `sources`.
//! 4. The [`planner::MealPlanner`] keeps meal-plan contributions in step
//!    with the current plan by resynchronizing the whole plan on every change.

pub mod aggregator;
pub mod error;
pub mod meal_plan;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod quantity;
pub mod store;

pub use aggregator::{AggregatorOptions, ShoppingList};
pub use error::{Result, ShoppingListError};
pub use planner::MealPlanner;
