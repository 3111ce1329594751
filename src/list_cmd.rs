//! `cart list | add | toggle | remove | clear-completed`.

use anyhow::Result;

use mealcart_core::models::{Contribution, ShoppingListEntry};

use crate::app::open_planner;
use crate::config::Config;

fn describe_sources(entry: &ShoppingListEntry) -> String {
    entry
        .sources
        .iter()
        .map(|c| match c {
            Contribution::Manual { quantity } => format!("manual {}", quantity),
            Contribution::MealPlan {
                recipe_id,
                quantity,
            } => format!("recipe:{} {}", recipe_id, quantity),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_entry(entry: &ShoppingListEntry) {
    println!("id:        {}", entry.id);
    println!("item:      {}", entry.item);
    println!("quantity:  {}", entry.quantity);
    println!("completed: {}", entry.completed);
    println!("sources:   {}", describe_sources(entry));
}

pub async fn run_list(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let list = planner.shopping_list();
    let entries = list.list(user_id).await?;
    let summary = list.summary(user_id).await?;

    if entries.is_empty() {
        println!("Shopping list is empty.");
        return Ok(());
    }

    for entry in &entries {
        let mark = if entry.completed { "[x]" } else { "[ ]" };
        println!(
            "{} {:<12} {:<24} {}  ({})",
            mark,
            entry.quantity,
            entry.item,
            entry.id,
            describe_sources(entry)
        );
    }
    println!();
    println!("{} of {} completed", summary.completed, summary.total);
    Ok(())
}

pub async fn run_add(
    config: &Config,
    user_id: &str,
    item: &str,
    quantity: Option<&str>,
) -> Result<()> {
    let planner = open_planner(config).await?;
    let entry = planner
        .shopping_list()
        .add_item(user_id, item, quantity)
        .await?;
    print_entry(&entry);
    Ok(())
}

pub async fn run_toggle(config: &Config, user_id: &str, id: &str, completed: bool) -> Result<()> {
    let planner = open_planner(config).await?;
    let entry = planner
        .shopping_list()
        .toggle_completion(user_id, id, completed)
        .await?;
    print_entry(&entry);
    Ok(())
}

pub async fn run_remove(config: &Config, user_id: &str, id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    planner.shopping_list().remove_item(user_id, id).await?;
    println!("Removed {}", id);
    Ok(())
}

pub async fn run_clear_completed(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let removed = planner.shopping_list().clear_completed(user_id).await?;
    println!("Cleared {} completed item(s).", removed);
    Ok(())
}
