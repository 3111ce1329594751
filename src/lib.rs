//! # Mealcart
//!
//! **A shopping list that keeps itself in step with a weekly meal plan.**
//!
//! Mealcart merges grocery items from manual adds and from the recipes in
//! a 7-day meal plan into one entry per ingredient, remembers which recipes
//! asked for each entry, and removes or shrinks entries when meals leave
//! the plan. Data lives in SQLite; the list is reachable through the
//! `cart` CLI and an HTTP JSON API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │   CLI    │   │   HTTP   │
//! │  (cart)  │   │  (axum)  │
//! └────┬─────┘   └────┬─────┘
//!      └──────┬───────┘
//!             ▼
//!     ┌───────────────┐    ┌──────────────┐
//!     │ MealPlanner / │───▶│ SqliteStore  │
//!     │ ShoppingList  │    │ (Store impl) │
//!     └───────────────┘    └──────────────┘
//! ```
//!
//! The aggregation logic lives in [`mealcart_core`]; this crate provides
//! persistence, configuration, and the two front ends.
//!
//! ## Quick Start
//!
//! ```bash
//! cart init
//! cart recipe add pancakes --title Pancakes -i "2 cups flour" -i "2 eggs"
//! cart plan set monday breakfast pancakes
//! cart add "Coffee" --quantity "1 bag"
//! cart list
//! cart serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema migrations (idempotent) |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`app`] | Builds a `MealPlanner` from configuration |
//! | [`list_cmd`] | Shopping-list CLI commands |
//! | [`recipe_cmd`] | Recipe CLI commands |
//! | [`plan_cmd`] | Meal-plan CLI commands |
//! | [`server`] | HTTP JSON API (Axum) with CORS |

pub mod app;
pub mod config;
pub mod db;
pub mod list_cmd;
pub mod logging;
pub mod migrate;
pub mod plan_cmd;
pub mod recipe_cmd;
pub mod server;
pub mod sqlite_store;

pub use mealcart_core::store;
pub use mealcart_core::{MealPlanner, ShoppingList, ShoppingListError};
