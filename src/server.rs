//! HTTP JSON API.
//!
//! Every route except `/health` acts on behalf of the user named in the
//! `x-user-id` header, an opaque key issued by the auth provider. A request
//! without it is rejected with `400`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (returns version) |
//! | `GET` | `/shopping-list` | All entries, newest first |
//! | `POST` | `/shopping-list` | Manual add `{ item, quantity? }` |
//! | `GET` | `/shopping-list/summary` | `{ total, completed }` |
//! | `DELETE` | `/shopping-list/completed` | Remove completed entries |
//! | `PUT` | `/shopping-list/{id}` | Set completion `{ completed }` |
//! | `DELETE` | `/shopping-list/{id}` | Remove one entry |
//! | `POST` | `/shopping-list/add-from-meal-plan` | `{ recipeId, ingredients? }` |
//! | `POST` | `/shopping-list/remove-from-meal-plan/{recipeId}` | Drop a recipe's contributions |
//! | `GET` | `/recipes` | All recipes |
//! | `GET` `PUT` `DELETE` | `/recipes/{id}` | Read, upsert `{ title, ingredients }`, delete |
//! | `GET` | `/meal-plan` | `{ plan, stats }` |
//! | `DELETE` | `/meal-plan` | Clear the whole week |
//! | `PUT` | `/meal-plan/week` | Set the week label `{ week }` |
//! | `POST` | `/meal-plan/move` | `{ from: {day, meal}, to: {day, meal} }` |
//! | `POST` | `/meal-plan/sync` | Full resync of meal-plan contributions |
//! | `PUT` | `/meal-plan/{day}/{meal}` | Attach `{ recipeId }` |
//! | `DELETE` | `/meal-plan/{day}/{meal}` | Detach |
//!
//! `{day}` is an index (`0` is Monday) or a day name; `{meal}` is
//! `breakfast`, `lunch` or `dinner`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid input: item must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! on another origin can call the API.

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use mealcart_core::meal_plan::{parse_day, MealPlan, PlanStats};
use mealcart_core::models::{ListSummary, MealType, Recipe, ShoppingListEntry, SyncReport};
use mealcart_core::{MealPlanner, ShoppingListError};

use crate::app::open_planner;
use crate::config::Config;

/// Header carrying the caller's user key.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
struct AppState {
    planner: MealPlanner,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let planner = open_planner(config).await?;
    let app = router(planner);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server listening");
    println!("Mealcart server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router over an existing planner.
pub fn router(planner: MealPlanner) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/shopping-list", get(handle_list).post(handle_add))
        .route("/shopping-list/summary", get(handle_summary))
        .route("/shopping-list/completed", delete(handle_clear_completed))
        .route(
            "/shopping-list/add-from-meal-plan",
            post(handle_add_from_meal_plan),
        )
        .route(
            "/shopping-list/remove-from-meal-plan/{recipe_id}",
            post(handle_remove_from_meal_plan),
        )
        .route(
            "/shopping-list/{id}",
            put(handle_toggle).delete(handle_remove),
        )
        .route("/recipes", get(handle_list_recipes))
        .route(
            "/recipes/{id}",
            get(handle_get_recipe)
                .put(handle_put_recipe)
                .delete(handle_delete_recipe),
        )
        .route("/meal-plan", get(handle_get_plan).delete(handle_clear_plan))
        .route("/meal-plan/week", put(handle_set_week))
        .route("/meal-plan/move", post(handle_move))
        .route("/meal-plan/sync", post(handle_sync))
        .route(
            "/meal-plan/{day}/{meal}",
            put(handle_attach).delete(handle_detach),
        )
        .layer(cors)
        .with_state(AppState { planner })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

impl From<ShoppingListError> for AppError {
    fn from(err: ShoppingListError) -> Self {
        let status = match &err {
            ShoppingListError::Validation(_) => StatusCode::BAD_REQUEST,
            ShoppingListError::NotFound(_) => StatusCode::NOT_FOUND,
            ShoppingListError::Conflict { .. } => StatusCode::CONFLICT,
            ShoppingListError::Storage(e) => {
                error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        ShoppingListError::Storage(err).into()
    }
}

type ApiResult<T> = Result<T, AppError>;

// ============ User extraction ============

/// The caller's user key from the `x-user-id` header.
struct UserId(String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| bad_request(format!("missing {} header", USER_HEADER)))?;
        Ok(UserId(value.to_string()))
    }
}

fn parse_slot(day: &str, meal: &str) -> ApiResult<(usize, MealType)> {
    let day = parse_day(day)?;
    let meal = meal.parse::<MealType>().map_err(bad_request)?;
    Ok((day, meal))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Shopping list ============

async fn handle_list(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<Vec<ShoppingListEntry>>> {
    Ok(Json(state.planner.shopping_list().list(&user).await?))
}

async fn handle_summary(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<ListSummary>> {
    Ok(Json(state.planner.shopping_list().summary(&user).await?))
}

#[derive(Deserialize)]
struct AddItemBody {
    item: String,
    #[serde(default)]
    quantity: Option<String>,
}

async fn handle_add(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(body): Json<AddItemBody>,
) -> ApiResult<(StatusCode, Json<ShoppingListEntry>)> {
    let entry = state
        .planner
        .shopping_list()
        .add_item(&user, &body.item, body.quantity.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
struct ToggleBody {
    completed: bool,
}

async fn handle_toggle(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> ApiResult<Json<ShoppingListEntry>> {
    let entry = state
        .planner
        .shopping_list()
        .toggle_completion(&user, &id, body.completed)
        .await?;
    Ok(Json(entry))
}

async fn handle_remove(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.planner.shopping_list().remove_item(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: usize,
}

async fn handle_clear_completed(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<RemovedResponse>> {
    let removed = state.planner.shopping_list().clear_completed(&user).await?;
    Ok(Json(RemovedResponse { removed }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MealPlanIngredientsBody {
    recipe_id: String,
    /// Falls back to the stored recipe's ingredients when absent.
    #[serde(default)]
    ingredients: Option<Vec<String>>,
}

async fn handle_add_from_meal_plan(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(body): Json<MealPlanIngredientsBody>,
) -> ApiResult<Json<Vec<ShoppingListEntry>>> {
    let list = state.planner.shopping_list();
    let ingredients = match body.ingredients {
        Some(lines) => lines,
        None => {
            list.store()
                .get_recipe(&user, &body.recipe_id)
                .await?
                .ok_or_else(|| not_found(format!("recipe {}", body.recipe_id)))?
                .ingredients
        }
    };
    let entries = list
        .add_meal_plan_ingredients(&user, &body.recipe_id, &ingredients)
        .await?;
    Ok(Json(entries))
}

async fn handle_remove_from_meal_plan(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<SyncReport>> {
    let report = state
        .planner
        .shopping_list()
        .remove_meal_ingredients(&user, &recipe_id)
        .await?;
    Ok(Json(report))
}

// ============ Recipes ============

async fn handle_list_recipes(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<Vec<Recipe>>> {
    let recipes = state.planner.shopping_list().store().list_recipes(&user).await?;
    Ok(Json(recipes))
}

async fn handle_get_recipe(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Recipe>> {
    state
        .planner
        .shopping_list()
        .store()
        .get_recipe(&user, &id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("recipe {}", id)))
}

#[derive(Deserialize)]
struct RecipeBody {
    title: String,
    #[serde(default)]
    ingredients: Vec<String>,
}

/// Upsert a recipe. If the saved plan uses it, the shopping list is
/// resynchronized so it reflects the new ingredients.
async fn handle_put_recipe(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<RecipeBody>,
) -> ApiResult<Json<Recipe>> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(bad_request("recipe title must not be empty"));
    }
    let recipe = Recipe {
        id: id.trim().to_string(),
        title: title.to_string(),
        ingredients: body.ingredients,
    };
    state.planner.save_recipe(&user, &recipe).await?;
    Ok(Json(recipe))
}

async fn handle_delete_recipe(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.planner.delete_recipe(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Meal plan ============

#[derive(Serialize)]
struct PlanResponse {
    plan: MealPlan,
    stats: PlanStats,
}

async fn handle_get_plan(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<PlanResponse>> {
    let plan = state.planner.plan(&user).await?;
    let stats = plan.stats();
    Ok(Json(PlanResponse { plan, stats }))
}

async fn handle_clear_plan(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.planner.clear_plan(&user).await?))
}

#[derive(Deserialize)]
struct WeekBody {
    #[serde(default)]
    week: Option<String>,
}

async fn handle_set_week(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(body): Json<WeekBody>,
) -> ApiResult<Json<MealPlan>> {
    let plan = state
        .planner
        .set_week_label(&user, body.week.as_deref())
        .await?;
    Ok(Json(plan))
}

#[derive(Deserialize)]
struct SlotRef {
    day: String,
    meal: String,
}

#[derive(Deserialize)]
struct MoveBody {
    from: SlotRef,
    to: SlotRef,
}

async fn handle_move(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(body): Json<MoveBody>,
) -> ApiResult<Json<SyncReport>> {
    let from = parse_slot(&body.from.day, &body.from.meal)?;
    let to = parse_slot(&body.to.day, &body.to.meal)?;
    Ok(Json(state.planner.move_meal(&user, from, to).await?))
}

async fn handle_sync(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.planner.sync(&user).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachBody {
    recipe_id: String,
}

async fn handle_attach(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path((day, meal)): Path<(String, String)>,
    Json(body): Json<AttachBody>,
) -> ApiResult<Json<SyncReport>> {
    let (day, meal) = parse_slot(&day, &meal)?;
    let report = state
        .planner
        .attach_recipe(&user, day, meal, &body.recipe_id)
        .await?;
    Ok(Json(report))
}

async fn handle_detach(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path((day, meal)): Path<(String, String)>,
) -> ApiResult<Json<SyncReport>> {
    let (day, meal) = parse_slot(&day, &meal)?;
    Ok(Json(state.planner.detach_recipe(&user, day, meal).await?))
}
