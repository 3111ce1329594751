//! `cart recipe add | list | remove`.

use anyhow::{bail, Result};
use uuid::Uuid;

use mealcart_core::models::Recipe;

use crate::app::open_planner;
use crate::config::Config;
use crate::plan_cmd::print_report;

/// Store a recipe, generating an id when none is given. Returns the id.
///
/// Editing a recipe that is in the meal plan updates the shopping list.
pub async fn run_add(
    config: &Config,
    user_id: &str,
    id: Option<String>,
    title: &str,
    ingredients: Vec<String>,
) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        bail!("recipe title must not be empty");
    }
    let id = id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let ingredients: Vec<String> = ingredients
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let planner = open_planner(config).await?;
    let recipe = Recipe {
        id: id.clone(),
        title: title.to_string(),
        ingredients,
    };
    let report = planner.save_recipe(user_id, &recipe).await?;

    println!("Saved recipe {} ({} ingredients)", recipe.id, recipe.ingredients.len());
    if !report.is_noop() {
        print_report(&report);
    }
    Ok(id)
}

pub async fn run_list(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let recipes = planner.shopping_list().store().list_recipes(user_id).await?;

    if recipes.is_empty() {
        println!("No recipes.");
        return Ok(());
    }

    println!("{:<24} {:<32} INGREDIENTS", "ID", "TITLE");
    for recipe in &recipes {
        println!(
            "{:<24} {:<32} {}",
            recipe.id,
            recipe.title,
            recipe.ingredients.join("; ")
        );
    }
    Ok(())
}

/// Delete a recipe. A planned recipe's ingredients leave the shopping list;
/// its slots stay until cleared.
pub async fn run_remove(config: &Config, user_id: &str, id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.delete_recipe(user_id, id).await?;
    println!("Removed recipe {}", id);
    if !report.is_noop() {
        print_report(&report);
    }
    Ok(())
}
