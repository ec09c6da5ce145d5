use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::unsplash::UnsplashClient;
use crate::usda::UsdaClient;
use fullsnack_core::calendar::{parse_iso_date, parse_timestamp};
use fullsnack_core::db::{DEFAULT_RECENT_LIMIT, Database};
use fullsnack_core::models::{
    Day, DeletedFoodLog, FoodLogEntry, ImagePreview, LoggedFood, NewFoodLog, NutritionFacts,
    UpdateFoodLog, User, Week, validate_food_name,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

/// How requests are attributed to a user.
#[derive(Clone, Copy)]
pub enum AuthMode {
    /// `Authorization: Bearer <key>` must match a user's API key.
    ApiKey,
    /// Every request acts as this user.
    LocalUser(i64),
}

pub struct Clients {
    pub nutrition: UsdaClient,
    pub images: Option<UnsplashClient>,
}

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    nutrition: Arc<UsdaClient>,
    images: Option<Arc<UnsplashClient>>,
    auth: AuthMode,
}

impl AppState {
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Copy)]
struct CurrentUser(i64);

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateLogRequest {
    food_name: String,
    calories: u32,
    #[serde(default)]
    protein: u32,
    #[serde(default)]
    carbs: u32,
    #[serde(default)]
    fat: u32,
    /// Local timestamp; defaults to now.
    logged_at: Option<String>,
    /// Search term for an Unsplash photo to attach after logging.
    image_query: Option<String>,
}

#[derive(Deserialize)]
struct UpdateLogRequest {
    food_name: Option<String>,
    calories: Option<u32>,
    protein: Option<u32>,
    carbs: Option<u32>,
    fat: Option<u32>,
}

#[derive(Deserialize)]
struct SetImageRequest {
    q: String,
}

#[derive(Deserialize)]
struct LogsQuery {
    day: Option<String>,
}

#[derive(Deserialize)]
struct WeeksQuery {
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct DaysQuery {
    week_start: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct NutritionQuery {
    query: Option<String>,
}

#[derive(Deserialize)]
struct PreviewQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct NutritionResponse {
    item: Option<NutritionFacts>,
}

#[derive(Serialize)]
struct PreviewResponse {
    images: Vec<ImagePreview>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    BadGateway(anyhow::Error),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::BadGateway(err) => {
                let error = format!("{err:#}");
                tracing::warn!(%error, "upstream request failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            Self::Internal(err) => {
                let error = format!("{err:#}");
                tracing::error!(%error, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

fn log_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Food log {id} not found"))
}

fn parse_date_param(s: &str) -> Result<NaiveDate, ApiError> {
    parse_iso_date(s).map_err(|e| bad_request(&e))
}

// --- Middleware ---

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match state.auth {
        AuthMode::LocalUser(id) => Some(id),
        AuthMode::ApiKey => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string);
            match token {
                Some(token) => {
                    let found = state.db().get_user_by_api_key(&token);
                    match found {
                        Ok(user) => user.map(|u| u.id),
                        Err(e) => return ApiError::Internal(e).into_response(),
                    }
                }
                None => None,
            }
        }
    };

    let Some(user_id) = user_id else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or missing API key".to_string(),
            }),
        )
            .into_response();
    };
    request.extensions_mut().insert(CurrentUser(user_id));
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Food log handlers ---

/// Look up the first photo for `query` and store it on the entry.
async fn attach_first_image(
    state: &AppState,
    user_id: i64,
    id: i64,
    query: &str,
) -> anyhow::Result<Option<LoggedFood>> {
    let client = state
        .images
        .as_ref()
        .context("Image search is not configured")?;
    let Some(image) = client.first_image(query).await? else {
        return Ok(None);
    };
    state.db().set_food_log_image(user_id, id, Some(image))
}

async fn create_log(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateLogRequest>,
) -> Result<(StatusCode, Json<LoggedFood>), ApiError> {
    validate_food_name(&req.food_name).map_err(|e| bad_request(&e))?;
    let logged_at = match req.logged_at.as_deref() {
        Some(s) => parse_timestamp(s).map_err(|e| bad_request(&e))?,
        None => Local::now().naive_local(),
    };

    let draft = NewFoodLog {
        food_name: req.food_name,
        calories: req.calories,
        protein: req.protein,
        carbs: req.carbs,
        fat: req.fat,
        image: None,
    };
    let mut logged = state
        .db()
        .create_food_log(user_id, &draft, logged_at)
        .context("failed to create food log")?;

    let image_query = req
        .image_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    if let Some(query) = image_query {
        match attach_first_image(&state, user_id, logged.entry.id, query).await {
            Ok(Some(updated)) => logged = updated,
            Ok(None) => tracing::warn!(%query, "no image found for new food log"),
            Err(e) => {
                let error = format!("{e:#}");
                tracing::warn!(%query, %error, "image lookup failed, logging without image");
            }
        }
    }

    Ok((StatusCode::CREATED, Json(logged)))
}

async fn list_logs(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<Vec<FoodLogEntry>>, ApiError> {
    let day = match params.day.as_deref() {
        Some(s) => parse_date_param(s)?,
        None => Local::now().date_naive(),
    };
    let logs = state
        .db()
        .list_food_logs_for_date(user_id, day)
        .context("database error")?;
    Ok(Json(logs))
}

async fn get_log(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<FoodLogEntry>, ApiError> {
    let entry = state
        .db()
        .get_food_log(user_id, id)
        .context("database error")?;
    entry.map(Json).ok_or_else(|| log_not_found(id))
}

async fn update_log(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLogRequest>,
) -> Result<Json<LoggedFood>, ApiError> {
    let update = UpdateFoodLog {
        food_name: req.food_name,
        calories: req.calories,
        protein: req.protein,
        carbs: req.carbs,
        fat: req.fat,
        image: None,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    if let Some(ref name) = update.food_name {
        validate_food_name(name).map_err(|e| bad_request(&e))?;
    }

    let logged = state
        .db()
        .update_food_log(user_id, id, &update)
        .context("failed to update food log")?;
    logged.map(Json).ok_or_else(|| log_not_found(id))
}

async fn delete_log(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedFoodLog>, ApiError> {
    let deleted = state
        .db()
        .delete_food_log(user_id, id)
        .context("failed to delete food log")?;
    deleted.map(Json).ok_or_else(|| log_not_found(id))
}

async fn set_log_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SetImageRequest>,
) -> Result<Json<LoggedFood>, ApiError> {
    let query = req.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing query 'q'".to_string()));
    }
    let exists = state
        .db()
        .get_food_log(user_id, id)
        .context("database error")?
        .is_some();
    if !exists {
        return Err(log_not_found(id));
    }

    let logged = attach_first_image(&state, user_id, id, query)
        .await
        .map_err(ApiError::BadGateway)?;
    logged
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No images found for '{query}'")))
}

// --- Bucket handlers ---

async fn list_weeks(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<WeeksQuery>,
) -> Result<Json<Vec<Week>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let weeks = state
        .db()
        .list_recent_weeks(user_id, limit)
        .context("database error")?;
    Ok(Json(weeks))
}

async fn get_week(
    State(state): State<AppState>,
    Path(start_date): Path<String>,
) -> Result<Json<Week>, ApiError> {
    let start = parse_date_param(&start_date)?;
    let week = state.db().get_week(start).context("database error")?;
    week.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No week starting {start}")))
}

async fn list_days(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<Vec<Day>>, ApiError> {
    let week_start = params
        .week_start
        .as_deref()
        .map(parse_date_param)
        .transpose()?;
    let db = state.db();
    let days = match week_start {
        Some(start) => db.list_days_in_week(user_id, start),
        None => db.list_recent_days(user_id, params.limit.unwrap_or(DEFAULT_RECENT_LIMIT)),
    }
    .context("database error")?;
    Ok(Json(days))
}

async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Day>, ApiError> {
    let date = parse_date_param(&date)?;
    let day = state.db().get_day(date).context("database error")?;
    day.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No day {date}")))
}

// --- User handler ---

async fn current_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.db().get_user_by_id(user_id).context("database error")?;
    user.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No user {user_id}")))
}

// --- Lookup handlers ---

async fn lookup_nutrition(
    State(state): State<AppState>,
    Query(params): Query<NutritionQuery>,
) -> Result<Json<NutritionResponse>, ApiError> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest(
            "Query parameter 'query' is required".to_string(),
        ));
    }
    let item = state
        .nutrition
        .lookup(query)
        .await
        .map_err(ApiError::BadGateway)?;
    Ok(Json(NutritionResponse { item }))
}

async fn preview_images(
    State(state): State<AppState>,
    Query(params): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing query param 'q'".to_string()));
    }
    let client = state
        .images
        .as_ref()
        .context("Image search is not configured")
        .map_err(ApiError::BadGateway)?;
    let images = client.preview(query).await.map_err(ApiError::BadGateway)?;
    Ok(Json(PreviewResponse { images }))
}

async fn health() -> &'static str {
    "ok"
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs", post(create_log).get(list_logs))
        .route(
            "/api/logs/{id}",
            get(get_log).put(update_log).delete(delete_log),
        )
        .route("/api/logs/{id}/image", patch(set_log_image))
        .route("/api/weeks", get(list_weeks))
        .route("/api/weeks/{start_date}", get(get_week))
        .route("/api/days", get(list_days))
        .route("/api/days/{date}", get(get_day))
        .route("/api/nutrition", get(lookup_nutrition))
        .route("/api/images/preview", get(preview_images))
        .route("/api/user", get(current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/api/health", get(health))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    db: Database,
    clients: Clients,
    port: u16,
    bind: &str,
    auth: AuthMode,
) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        nutrition: Arc::new(clients.nutrition),
        images: clients.images.map(Arc::new),
        auth,
    };

    let app = build_router(state);

    match auth {
        AuthMode::ApiKey => {
            tracing::info!("API key authentication enabled (run `fullsnack user` to see your key)");
        }
        AuthMode::LocalUser(user_id) => {
            tracing::warn!(user_id, "authentication disabled (--no-auth), serving as local user");
            if bind != "127.0.0.1" && bind != "localhost" {
                tracing::warn!(
                    %bind,
                    "listening with no authentication; any device on your network can access this API"
                );
            }
        }
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    tracing::info!("listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
