//! # Mealcart CLI (`cart`)
//!
//! ## Usage
//!
//! ```bash
//! cart --config ./config/cart.toml [--user <id>] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cart init` | Create the SQLite database and run schema migrations |
//! | `cart list` | Show the shopping list |
//! | `cart add <item>` | Add an item by hand |
//! | `cart toggle <id>` | Mark an item bought (`--undo` to reopen) |
//! | `cart remove <id>` | Delete an item |
//! | `cart clear-completed` | Delete every bought item |
//! | `cart recipe add\|list\|remove` | Manage recipes |
//! | `cart plan show\|set\|clear\|move\|week\|reset\|sync` | Edit the weekly meal plan |
//! | `cart serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mealcart::{config, list_cmd, logging, migrate, plan_cmd, recipe_cmd, server};
use mealcart_core::meal_plan::parse_day;
use mealcart_core::models::MealType;

/// Mealcart: a shopping list kept in step with your weekly meal plan.
#[derive(Parser)]
#[command(
    name = "cart",
    about = "Mealcart: a shopping list kept in step with your weekly meal plan",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cart.toml")]
    config: PathBuf,

    /// Act as this user instead of `[user].default_id`.
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Show the shopping list, newest first.
    List,

    /// Add an item by hand. Repeated adds of the same item accumulate.
    Add {
        /// Item name, e.g. "Flour".
        item: String,

        /// Quantity such as "2 cups". Defaults to `[shopping_list].default_quantity`.
        #[arg(long, short)]
        quantity: Option<String>,
    },

    /// Mark an item as bought.
    Toggle {
        /// Entry id.
        id: String,

        /// Mark the item as not bought instead.
        #[arg(long)]
        undo: bool,
    },

    /// Remove an item regardless of which recipes asked for it.
    Remove {
        /// Entry id.
        id: String,
    },

    /// Remove every bought item.
    ClearCompleted,

    /// Manage recipes.
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },

    /// Edit the weekly meal plan. Every change updates the shopping list.
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum RecipeAction {
    /// Save a recipe (replaces one with the same id).
    Add {
        /// Recipe id. Generated when omitted.
        id: Option<String>,

        #[arg(long)]
        title: String,

        /// Ingredient line such as "2 cups flour". Repeatable.
        #[arg(long = "ingredient", short = 'i')]
        ingredients: Vec<String>,
    },
    /// List saved recipes.
    List,
    /// Delete a recipe.
    Remove { id: String },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Print the week grid and plan stats.
    Show,
    /// Put a recipe into a slot.
    Set {
        /// Day index (0 = Monday) or name.
        #[arg(value_parser = parse_day_arg)]
        day: usize,
        meal: MealType,
        recipe: String,
    },
    /// Empty a slot.
    Clear {
        #[arg(value_parser = parse_day_arg)]
        day: usize,
        meal: MealType,
    },
    /// Move a meal to another slot, swapping with an occupied target.
    Move {
        #[arg(value_parser = parse_day_arg)]
        day: usize,
        meal: MealType,
        #[arg(value_parser = parse_day_arg)]
        to_day: usize,
        to_meal: MealType,
    },
    /// Set or clear the week label.
    Week { label: Option<String> },
    /// Empty the whole week.
    Reset,
    /// Rebuild meal-plan items on the shopping list from the saved plan.
    Sync,
}

fn parse_day_arg(s: &str) -> Result<usize, String> {
    parse_day(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        // `init` may run before any config file exists.
        Err(_) if matches!(cli.command, Commands::Init) && !cli.config.exists() => {
            config::Config::minimal()
        }
        Err(e) => return Err(e),
    };
    logging::init(&cfg.logging);
    let user = cli.user.unwrap_or_else(|| cfg.user.default_id.clone());

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!(
                "Database initialized successfully at {}.",
                cfg.db.path.display()
            );
        }
        Commands::List => {
            list_cmd::run_list(&cfg, &user).await?;
        }
        Commands::Add { item, quantity } => {
            list_cmd::run_add(&cfg, &user, &item, quantity.as_deref()).await?;
        }
        Commands::Toggle { id, undo } => {
            list_cmd::run_toggle(&cfg, &user, &id, !undo).await?;
        }
        Commands::Remove { id } => {
            list_cmd::run_remove(&cfg, &user, &id).await?;
        }
        Commands::ClearCompleted => {
            list_cmd::run_clear_completed(&cfg, &user).await?;
        }
        Commands::Recipe { action } => match action {
            RecipeAction::Add {
                id,
                title,
                ingredients,
            } => {
                recipe_cmd::run_add(&cfg, &user, id, &title, ingredients).await?;
            }
            RecipeAction::List => {
                recipe_cmd::run_list(&cfg, &user).await?;
            }
            RecipeAction::Remove { id } => {
                recipe_cmd::run_remove(&cfg, &user, &id).await?;
            }
        },
        Commands::Plan { action } => match action {
            PlanAction::Show => plan_cmd::run_show(&cfg, &user).await?,
            PlanAction::Set { day, meal, recipe } => {
                plan_cmd::run_set(&cfg, &user, day, meal, &recipe).await?;
            }
            PlanAction::Clear { day, meal } => {
                plan_cmd::run_clear(&cfg, &user, day, meal).await?;
            }
            PlanAction::Move {
                day,
                meal,
                to_day,
                to_meal,
            } => {
                plan_cmd::run_move(&cfg, &user, (day, meal), (to_day, to_meal)).await?;
            }
            PlanAction::Week { label } => {
                plan_cmd::run_week(&cfg, &user, label.as_deref()).await?;
            }
            PlanAction::Reset => plan_cmd::run_reset(&cfg, &user).await?,
            PlanAction::Sync => plan_cmd::run_sync(&cfg, &user).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
