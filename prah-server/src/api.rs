//! REST API routes

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use prah_core::model::EventInfo;
use prah_core::reshape::{team_radio_table, TeamRadioRecord};
use prah_core::{build_bundle, LoadOptions, SessionBundle, SessionKind, TableMask};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tower_http::compression::CompressionLayer;
use tracing::{error, info};

/// Seasons offered to clients
pub const SEASONS: std::ops::RangeInclusive<i32> = 2018..=2025;

/// Body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn internal_error(e: impl Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail {
            detail: e.to_string(),
        }),
    )
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = state.allowed_origins.cors_layer();
    Router::new()
        .route("/", get(root))
        .route("/api/seasons", get(seasons))
        .route("/api/:year/races", get(races))
        .route("/api/:year/:race/race/telemetry_replay", get(telemetry_replay))
        .route("/api/:year/:race/race/team_radio", get(team_radio))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Run a blocking source call off the async runtime
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(internal_error)?
}

// === Service Endpoints ===

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Post-Race Analytics Hub API is running"
    }))
}

#[derive(Serialize)]
struct SeasonList {
    seasons: Vec<i32>,
}

async fn seasons() -> Json<SeasonList> {
    Json(SeasonList {
        seasons: SEASONS.collect(),
    })
}

async fn races(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<EventInfo>>, ApiError> {
    let source = state.source.clone();
    let events = blocking(move || source.event_schedule(year).map_err(internal_error)).await?;
    Ok(Json(events))
}

// === Session Endpoints ===

#[derive(Deserialize)]
struct ReplayQuery {
    include: Option<String>,
}

async fn telemetry_replay(
    State(state): State<AppState>,
    Path((year, race)): Path<(i32, String)>,
    Query(query): Query<ReplayQuery>,
) -> Result<Json<SessionBundle>, ApiError> {
    let mask = query
        .include
        .as_deref()
        .map(TableMask::parse)
        .unwrap_or_default();
    let source = state.source.clone();

    let bundle = blocking(move || {
        info!("Loading session for {} {}...", year, race);
        let session = source
            .load_session(year, &race, SessionKind::Race, LoadOptions::all())
            .map_err(|e| {
                error!("Endpoint Error: {}", e);
                internal_error(e)
            })?;
        Ok(build_bundle(&session, &mask))
    })
    .await?;

    Ok(Json(bundle))
}

/// Team radio transcripts; an unavailable session yields an empty list
async fn team_radio(
    State(state): State<AppState>,
    Path((year, race)): Path<(i32, String)>,
) -> Json<Vec<TeamRadioRecord>> {
    let source = state.source.clone();
    let result = blocking(move || {
        source
            .load_session(year, &race, SessionKind::Race, LoadOptions::messages_only())
            .map(|session| team_radio_table(&session))
            .map_err(internal_error)
    })
    .await;

    match result {
        Ok(radio) => {
            info!("Team radio: {} messages loaded", radio.len());
            Json(radio)
        }
        Err((_, Json(e))) => {
            error!("Error fetching radio: {}", e.detail);
            Json(Vec::new())
        }
    }
}
