//! Profile routes: visit tracking and onboarding.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use quaiscope_common::error::AppError;
use quaiscope_common::types::UserProfile;
use quaiscope_engine::profile::ProfileStatus;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).delete(clear_profile))
        .route("/api/profile/visit", post(record_visit))
        .route("/api/profile/onboarding", post(complete_onboarding))
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub name: String,
}

/// GET /api/profile — Profile as of the last visit or onboarding.
async fn get_profile(State(state): State<AppState>) -> Json<ProfileStatus> {
    Json(state.profile.current())
}

/// POST /api/profile/visit — Register a dashboard load.
async fn record_visit(State(state): State<AppState>) -> Result<Json<ProfileStatus>, AppError> {
    let status = state.profile.load().await?;
    Ok(Json(status))
}

/// POST /api/profile/onboarding
async fn complete_onboarding(
    State(state): State<AppState>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.profile.complete_onboarding(&req.name).await?;
    Ok(Json(profile))
}

/// DELETE /api/profile
async fn clear_profile(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.profile.clear().await?;
    Ok(Json(serde_json::json!({ "cleared": true })))
}
