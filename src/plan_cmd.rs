//! `cart plan show | set | clear | move | reset | sync`.

use anyhow::Result;

use mealcart_core::meal_plan::DAY_NAMES;
use mealcart_core::models::{MealType, SyncReport};

use crate::app::open_planner;
use crate::config::Config;

pub(crate) fn print_report(report: &SyncReport) {
    println!(
        "shopping list: {} created, {} updated, {} removed",
        report.created, report.updated, report.removed
    );
}

pub async fn run_show(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let plan = planner.plan(user_id).await?;

    if let Some(week) = &plan.week {
        println!("{}", week);
    }
    println!("{:<10} {:<20} {:<20} {:<20}", "DAY", "BREAKFAST", "LUNCH", "DINNER");
    for (name, day) in DAY_NAMES.iter().zip(plan.days.iter()) {
        let cell = |meal| day.get(meal).unwrap_or("-");
        println!(
            "{:<10} {:<20} {:<20} {:<20}",
            name,
            cell(MealType::Breakfast),
            cell(MealType::Lunch),
            cell(MealType::Dinner)
        );
    }

    let stats = plan.stats();
    println!();
    println!(
        "{} meals planned, {} unique recipes, {} open slots",
        stats.meals_planned, stats.unique_recipes, stats.open_slots
    );
    Ok(())
}

pub async fn run_set(
    config: &Config,
    user_id: &str,
    day: usize,
    meal: MealType,
    recipe_id: &str,
) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.attach_recipe(user_id, day, meal, recipe_id).await?;
    println!("{} {}: {}", DAY_NAMES[day], meal, recipe_id);
    print_report(&report);
    Ok(())
}

pub async fn run_clear(config: &Config, user_id: &str, day: usize, meal: MealType) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.detach_recipe(user_id, day, meal).await?;
    println!("{} {}: cleared", DAY_NAMES[day], meal);
    print_report(&report);
    Ok(())
}

pub async fn run_move(
    config: &Config,
    user_id: &str,
    from: (usize, MealType),
    to: (usize, MealType),
) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.move_meal(user_id, from, to).await?;
    println!(
        "Moved {} {} to {} {}",
        DAY_NAMES[from.0], from.1, DAY_NAMES[to.0], to.1
    );
    print_report(&report);
    Ok(())
}

pub async fn run_reset(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.clear_plan(user_id).await?;
    println!("Meal plan cleared.");
    print_report(&report);
    Ok(())
}

pub async fn run_sync(config: &Config, user_id: &str) -> Result<()> {
    let planner = open_planner(config).await?;
    let report = planner.sync(user_id).await?;
    print_report(&report);
    Ok(())
}

pub async fn run_week(config: &Config, user_id: &str, label: Option<&str>) -> Result<()> {
    let planner = open_planner(config).await?;
    let plan = planner.set_week_label(user_id, label).await?;
    match plan.week {
        Some(week) => println!("Week label set: {}", week),
        None => println!("Week label cleared."),
    }
    Ok(())
}
