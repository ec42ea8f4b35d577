use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use checkmp_core::error::ApiError;
use checkmp_core::{
    ErrorKind, MediaCandidate, MediaQuery, MediaType, ReconcileAction, ReconciliationResult,
    StatsSummary, Subscription,
};
use checkmp_upstream::PopularFilter;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::catalog::HotFilter;
use crate::error::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Hot lists
        .route("/hot/tv", get(hot_tv))
        .route("/hot/movie", get(hot_movie))
        // Subscriptions
        .route("/subscribe", get(list_subscriptions).post(subscribe))
        .route("/subscribe/check", get(check_subscription))
        .route("/subscribe/{id}", delete(unsubscribe))
        // Catalog
        .route("/search", get(search))
        .route("/stats", get(stats))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "checkmp",
    })
}

// ---------------------------------------------------------------------------
// Hot lists
// ---------------------------------------------------------------------------

fn default_page() -> u32 {
    1
}

fn default_hot_count() -> u32 {
    20
}

fn default_search_count() -> u32 {
    8
}

#[derive(Deserialize)]
struct HotParams {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_hot_count")]
    count: u32,
    genre_id: Option<i64>,
    min_rating: Option<f64>,
    lang: Option<String>,
}

impl From<HotParams> for HotFilter {
    fn from(p: HotParams) -> Self {
        Self {
            popular: PopularFilter {
                page: p.page.max(1),
                count: p.count,
                genre_id: p.genre_id,
                min_rating: p.min_rating,
            },
            lang: p.lang,
        }
    }
}

async fn hot_tv(
    State(state): State<AppState>,
    params: Result<Query<HotParams>, QueryRejection>,
) -> Result<Json<Vec<MediaCandidate>>, AppError> {
    let Query(params) = params?;
    let items = state.catalog.hot(MediaType::Tv, &params.into()).await?;
    Ok(Json(items))
}

async fn hot_movie(
    State(state): State<AppState>,
    params: Result<Query<HotParams>, QueryRejection>,
) -> Result<Json<Vec<MediaCandidate>>, AppError> {
    let Query(params) = params?;
    let items = state.catalog.hot(MediaType::Movie, &params.into()).await?;
    Ok(Json(items))
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let subs = state.reconciler.list().await?;
    Ok(Json(subs))
}

/// Subscribe by TMDB id or title. The body is always a `ReconciliationResult`.
async fn subscribe(
    State(state): State<AppState>,
    body: Result<Json<MediaQuery>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(query)) => query,
        Err(rejection) => {
            let result =
                ReconciliationResult::failed(ErrorKind::InvalidQuery, rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(result)).into_response();
        }
    };

    match state.reconciler.subscribe(&query).await {
        Ok(result) => {
            let status = if result.action == ReconcileAction::Created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(result)).into_response()
        }
        Err(e) => {
            let kind = e.kind();
            if !matches!(kind, ErrorKind::InvalidQuery | ErrorKind::NoMatch) {
                warn!(error = %e, kind = %kind, "subscribe failed");
            }
            let status = StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ReconciliationResult::from(&e))).into_response()
        }
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
    id: i64,
}

async fn unsubscribe(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id?;
    state.reconciler.unsubscribe(id).await?;
    Ok(Json(DeleteResponse { deleted: true, id }))
}

#[derive(Deserialize)]
struct CheckParams {
    tmdb_id: i64,
    #[serde(rename = "type")]
    media_type: Option<MediaType>,
    season: Option<i32>,
}

#[derive(Serialize)]
struct CheckResponse {
    subscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Subscription>,
}

async fn check_subscription(
    State(state): State<AppState>,
    params: Result<Query<CheckParams>, QueryRejection>,
) -> Result<Json<CheckResponse>, AppError> {
    let Query(params) = params?;
    let found = state
        .reconciler
        .check(params.tmdb_id, params.media_type, params.season)
        .await?;
    Ok(Json(CheckResponse {
        subscribed: found.is_some(),
        detail: found,
    }))
}

// ---------------------------------------------------------------------------
// Search & stats
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchParams {
    title: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_search_count")]
    count: u32,
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<MediaCandidate>>, AppError> {
    let Query(params) = params?;
    let title = params
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("title is required".into()))?;

    let results = state
        .catalog
        .search(title, params.page.max(1), params.count)
        .await?;
    Ok(Json(results))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsSummary>, AppError> {
    let summary = state.catalog.stats().await?;
    Ok(Json(summary))
}
