//! SQLite store and HTTP API integration tests.
//!
//! These run the aggregator against a real SQLite file to prove the
//! conditional writes hold up outside the in-memory store, and drive the
//! Axum server over HTTP.

use std::sync::Arc;

use mealcart::config::Config;
use mealcart::server::{router, USER_HEADER};
use mealcart::sqlite_store::SqliteStore;
use mealcart::{db, migrate};
use mealcart_core::meal_plan::MealPlan;
use mealcart_core::models::{Contribution, MealType, Recipe, ShoppingListEntry, SourceKind};
use mealcart_core::store::Store;
use mealcart_core::{AggregatorOptions, MealPlanner, ShoppingList};
use serde_json::{json, Value};
use tempfile::TempDir;

const USER: &str = "user-1";

fn test_config(tmp: &TempDir) -> Config {
    let config_content = format!(
        r#"
[db]
path = "{}"

[server]
bind = "127.0.0.1:0"
"#,
        tmp.path().join("cart.sqlite").display()
    );
    toml::from_str(&config_content).unwrap()
}

async fn sqlite_store(tmp: &TempDir) -> Arc<SqliteStore> {
    let cfg = test_config(tmp);
    migrate::run_migrations(&cfg).await.unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    Arc::new(SqliteStore::new(pool))
}

fn manual(item: &str, quantity: &str) -> ShoppingListEntry {
    ShoppingListEntry::new(
        item,
        Contribution::Manual {
            quantity: quantity.to_string(),
        },
    )
}

// ─── SqliteStore ────────────────────────────────────────────────────

#[tokio::test]
async fn test_entry_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let mut entry = manual("Flour (all-purpose)", "2 cups");
    entry.sources.push(Contribution::MealPlan {
        recipe_id: "r1".to_string(),
        quantity: "1 cup".to_string(),
    });
    assert!(store.insert_entry(USER, &entry).await.unwrap());

    let loaded = store.get_entry(USER, &entry.id).await.unwrap().unwrap();
    assert_eq!(loaded.item, "Flour (all-purpose)");
    assert_eq!(loaded.normalized_key, "flour");
    assert_eq!(loaded.sources, entry.sources);
    assert_eq!(loaded.source, SourceKind::Manual);
    assert_eq!(loaded.version, 1);
    assert_eq!(
        loaded.created_at.timestamp_micros(),
        entry.created_at.timestamp_micros()
    );

    let by_key = store.find_entry_by_key(USER, "flour").await.unwrap().unwrap();
    assert_eq!(by_key.id, entry.id);
    assert!(store.get_entry("other-user", &entry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_conditional_writes() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let entry = manual("Milk", "1");
    assert!(store.insert_entry(USER, &entry).await.unwrap());
    assert!(!store.insert_entry(USER, &manual("milk", "2")).await.unwrap());
    assert!(store.insert_entry("user-2", &manual("milk", "2")).await.unwrap());

    let mut next = entry.clone();
    next.quantity = "2".to_string();
    next.version = 2;
    assert!(store.update_entry(USER, &next, 1).await.unwrap());
    assert!(!store.update_entry(USER, &next, 1).await.unwrap());

    assert!(!store.delete_entry_if_version(USER, &entry.id, 1).await.unwrap());
    assert!(store.delete_entry_if_version(USER, &entry.id, 2).await.unwrap());
    assert!(!store.delete_entry(USER, &entry.id).await.unwrap());
}

#[tokio::test]
async fn test_list_newest_first() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let first = manual("Apples", "1");
    let mut second = manual("Bread", "1");
    second.created_at = first.created_at;
    let mut third = manual("Cheese", "1");
    third.created_at = first.created_at + chrono::Duration::seconds(5);
    for e in [&first, &second, &third] {
        store.insert_entry(USER, e).await.unwrap();
    }

    let items: Vec<String> = store
        .list_entries(USER)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.item)
        .collect();
    assert_eq!(items, vec!["Cheese", "Bread", "Apples"]);
}

#[tokio::test]
async fn test_recipes_and_plan_persist() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let recipe = Recipe {
        id: "soup".to_string(),
        title: "Soup".to_string(),
        ingredients: vec!["2 carrots".to_string(), "1 onion".to_string()],
    };
    store.put_recipe(USER, &recipe).await.unwrap();
    assert_eq!(store.get_recipe(USER, "soup").await.unwrap(), Some(recipe.clone()));
    assert!(store.get_recipe("user-2", "soup").await.unwrap().is_none());
    assert_eq!(store.list_recipes(USER).await.unwrap(), vec![recipe]);

    assert!(store.get_meal_plan(USER).await.unwrap().is_none());
    let mut plan = MealPlan::new();
    plan.set_slot(2, MealType::Dinner, "soup").unwrap();
    store.put_meal_plan(USER, &plan).await.unwrap();
    plan.set_slot(3, MealType::Lunch, "soup").unwrap();
    store.put_meal_plan(USER, &plan).await.unwrap();
    assert_eq!(store.get_meal_plan(USER).await.unwrap(), Some(plan));

    assert!(store.delete_recipe(USER, "soup").await.unwrap());
    assert!(!store.delete_recipe(USER, "soup").await.unwrap());
}

#[tokio::test]
async fn test_aggregator_on_sqlite() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let list = ShoppingList::new(store, AggregatorOptions::default());

    list.add_meal_plan_ingredients(USER, "r1", &["2 eggs".to_string(), "1 cup milk".to_string()])
        .await
        .unwrap();
    list.add_meal_plan_ingredients(USER, "r2", &["2 eggs".to_string()])
        .await
        .unwrap();
    list.add_item(USER, "Eggs", Some("6")).await.unwrap();

    let entries = list.list(USER).await.unwrap();
    assert_eq!(entries.len(), 2);
    let eggs = entries.iter().find(|e| e.normalized_key == "eggs").unwrap();
    assert_eq!(eggs.quantity, "10 eggs");
    assert_eq!(eggs.sources.len(), 3);
    assert_eq!(eggs.version, 3);

    let report = list.remove_meal_ingredients(USER, "r1").await.unwrap();
    assert_eq!((report.updated, report.removed), (1, 1));
    let eggs = list.get(USER, &eggs.id).await.unwrap();
    assert_eq!(eggs.quantity, "8 eggs");
}

#[tokio::test]
async fn test_planner_on_sqlite_tracks_each_recipe() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let planner = MealPlanner::new(ShoppingList::new(store.clone(), AggregatorOptions::default()));
    for (id, lines) in [("r1", vec!["2 eggs", "1 cup milk"]), ("r2", vec!["2 eggs"])] {
        let recipe = Recipe {
            id: id.to_string(),
            title: id.to_string(),
            ingredients: lines.into_iter().map(String::from).collect(),
        };
        planner.save_recipe(USER, &recipe).await.unwrap();
    }

    planner.attach_recipe(USER, 0, MealType::Dinner, "r1").await.unwrap();
    planner.attach_recipe(USER, 1, MealType::Dinner, "r2").await.unwrap();
    let entries = planner.shopping_list().list(USER).await.unwrap();
    let eggs = entries.iter().find(|e| e.normalized_key == "eggs").unwrap();
    assert_eq!(eggs.quantity, "4 eggs");
    assert_eq!(eggs.sources.len(), 2);
    assert!(eggs.has_recipe_source("r1") && eggs.has_recipe_source("r2"));

    let saved = store.get_meal_plan(USER).await.unwrap().unwrap();
    let synced: Vec<&str> = saved.synced_recipes.iter().map(String::as_str).collect();
    assert_eq!(synced, vec!["r1", "r2"]);

    planner.detach_recipe(USER, 0, MealType::Dinner).await.unwrap();
    let entries = planner.shopping_list().list(USER).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quantity, "2 eggs");
    assert!(entries[0].has_recipe_source("r2"));
}

#[tokio::test]
async fn test_concurrent_manual_adds_do_not_lose_updates() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let list = ShoppingList::new(
        store,
        AggregatorOptions {
            max_write_retries: 50,
            ..AggregatorOptions::default()
        },
    );
    list.add_item(USER, "Rice", Some("1")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let list = list.clone();
        handles.push(tokio::spawn(async move {
            list.add_item(USER, "rice", Some("1")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = list.list(USER).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quantity, "5");
    assert_eq!(entries[0].version, 5);
}

// ─── HTTP API ───────────────────────────────────────────────────────

async fn spawn_server(tmp: &TempDir) -> (String, tokio::task::JoinHandle<()>) {
    let store = sqlite_store(tmp).await;
    let planner = MealPlanner::new(ShoppingList::new(store, AggregatorOptions::default()));
    let app = router(planner);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn test_http_health_and_user_header() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = spawn_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client
        .get(format!("{}/shopping-list", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    server.abort();
}

#[tokio::test]
async fn test_http_shopping_list_flow() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = spawn_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/shopping-list", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "item": "Flour", "quantity": "2 cups" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let flour: Value = resp.json().await.unwrap();
    assert_eq!(flour["normalizedKey"], "flour");
    assert_eq!(flour["sources"][0]["type"], "manual");

    let resp = client
        .post(format!("{}/shopping-list", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "item": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/shopping-list/add-from-meal-plan", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "recipeId": "bread", "ingredients": ["1 cup flour", "1 tsp yeast"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let entries: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["quantity"], "3 cups");
    assert_eq!(entries[0]["sources"][1]["recipeId"], "bread");

    let id = flour["id"].as_str().unwrap();
    let resp = client
        .put(format!("{}/shopping-list/{}", base, id))
        .header(USER_HEADER, USER)
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let toggled: Value = resp.json().await.unwrap();
    assert_eq!(toggled["completed"], true);

    let summary: Value = client
        .get(format!("{}/shopping-list/summary", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary, json!({ "total": 2, "completed": 1 }));

    let report: Value = client
        .post(format!("{}/shopping-list/remove-from-meal-plan/bread", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report, json!({ "created": 0, "updated": 1, "removed": 1 }));

    let cleared: Value = client
        .delete(format!("{}/shopping-list/completed", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["removed"], 1);

    let resp = client
        .delete(format!("{}/shopping-list/{}", base, id))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    server.abort();
}

#[tokio::test]
async fn test_http_meal_plan_flow() {
    let tmp = TempDir::new().unwrap();
    let (base, server) = spawn_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/recipes/chili", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "title": "Chili", "ingredients": ["1 lb beef", "2 cans beans"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let report: Value = client
        .put(format!("{}/meal-plan/monday/dinner", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "recipeId": "chili" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["created"], 2);

    let resp = client
        .put(format!("{}/meal-plan/2/brunch", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "recipeId": "chili" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .put(format!("{}/meal-plan/2/lunch", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "recipeId": "missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Editing a planned recipe updates the list.
    client
        .put(format!("{}/recipes/chili", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "title": "Chili", "ingredients": ["2 lb beef"] }))
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = client
        .get(format!("{}/shopping-list", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["item"], "beef");
    assert_eq!(list[0]["quantity"], "2 lb");

    let report: Value = client
        .post(format!("{}/meal-plan/move", base))
        .header(USER_HEADER, USER)
        .json(&json!({ "from": { "day": "monday", "meal": "dinner" }, "to": { "day": "6", "meal": "lunch" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report, json!({ "created": 0, "updated": 0, "removed": 0 }));

    let plan: Value = client
        .get(format!("{}/meal-plan", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(plan["plan"]["days"][6]["lunch"], "chili");
    assert_eq!(plan["stats"]["mealsPlanned"], 1);
    assert_eq!(plan["stats"]["openSlots"], 20);

    let report: Value = client
        .delete(format!("{}/meal-plan/sunday/lunch", base))
        .header(USER_HEADER, USER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["removed"], 1);

    server.abort();
}
