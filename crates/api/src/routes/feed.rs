//! Analytics feed routes. Dashboard pages require a connection (real or
//! demo) and a completed onboarding before any data is served.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use quaiscope_common::error::AppError;
use quaiscope_common::types::{DexVolume, IngestEvent, VolumePeriod};

use crate::feed::{DEFAULT_TOP_TOKENS_LIMIT, DEFAULT_WHALE_LIMIT, DataFeed};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/feed/whales", get(whales))
        .route("/api/feed/dex-volume", get(dex_volume))
        .route("/api/feed/top-tokens", get(top_tokens))
        .route("/api/feed/ingest", post(ingest))
}

#[derive(Debug, Deserialize)]
pub struct WhalesQuery {
    pub token: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct VolumeQuery {
    #[serde(default)]
    pub period: VolumePeriod,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

fn feed(state: &AppState) -> Result<Arc<dyn DataFeed>, AppError> {
    state
        .feed
        .clone()
        .ok_or_else(|| AppError::Config("Analytics feed not configured".to_string()))
}

/// Feed for a dashboard page. The wallet must be connected or in demo mode,
/// and a user flagged as new must finish onboarding first.
fn dashboard_feed(state: &AppState) -> Result<Arc<dyn DataFeed>, AppError> {
    if !state.wallet.state().grants_dashboard_access() {
        return Err(AppError::Unauthorized(
            "Connect a wallet or enable demo mode".to_string(),
        ));
    }
    if state.profile.is_new_user() {
        return Err(AppError::Unauthorized("Complete onboarding first".to_string()));
    }
    feed(state)
}

/// GET /api/feed/whales?token=&limit=
async fn whales(
    State(state): State<AppState>,
    Query(query): Query<WhalesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let feed = dashboard_feed(&state)?;
    // "all" is the dashboard's token filter placeholder.
    let token = query.token.as_deref().filter(|t| *t != "all");
    let transfers = feed
        .whales(token, query.limit.unwrap_or(DEFAULT_WHALE_LIMIT))
        .await?;
    Ok(Json(json!({ "transfers": transfers })))
}

/// GET /api/feed/dex-volume?period=24h|7d|30d
async fn dex_volume(
    State(state): State<AppState>,
    Query(query): Query<VolumeQuery>,
) -> Result<Json<DexVolume>, AppError> {
    let feed = dashboard_feed(&state)?;
    let volume = feed.dex_volume(query.period).await?;
    Ok(Json(volume))
}

/// GET /api/feed/top-tokens?limit=
async fn top_tokens(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let feed = dashboard_feed(&state)?;
    let tokens = feed
        .top_tokens(query.limit.unwrap_or(DEFAULT_TOP_TOKENS_LIMIT))
        .await?;
    Ok(Json(json!({ "tokens": tokens })))
}

/// POST /api/feed/ingest — Relay an indexed transfer or swap.
async fn ingest(
    State(state): State<AppState>,
    Json(event): Json<IngestEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    let whale = event.is_whale();
    feed(&state)?.ingest(&event).await?;
    Ok(Json(json!({ "success": true, "whale": whale })))
}
