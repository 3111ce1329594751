//! Wiring from configuration to a ready [`MealPlanner`].

use anyhow::Result;
use std::sync::Arc;

use mealcart_core::store::Store;
use mealcart_core::{MealPlanner, ShoppingList};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Connect to the configured database, ensure the schema exists, and
/// build the planner on top of a [`SqliteStore`].
pub async fn open_planner(config: &Config) -> Result<MealPlanner> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let list = ShoppingList::new(store, config.shopping_list.aggregator_options());
    Ok(MealPlanner::new(list))
}
