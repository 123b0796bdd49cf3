//! Session routes: status and activity heartbeat.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use quaiscope_common::types::{ActivitySignal, SessionRecord};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/activity", post(record_activity))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub active: bool,
    pub session: Option<SessionRecord>,
    pub duration_secs: i64,
    pub idle_secs: Option<i64>,
    pub idle_timeout_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub signal: ActivitySignal,
}

/// GET /api/session
async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    let tracker = &state.session;
    let session = tracker.current();
    Json(SessionView {
        active: session.is_some(),
        session,
        duration_secs: tracker.session_duration().num_seconds(),
        idle_secs: tracker.idle_duration().map(|d| d.num_seconds()),
        idle_timeout_secs: tracker.idle_timeout().num_seconds(),
    })
}

/// POST /api/session/activity — Pointer, key, scroll or touch heartbeat.
async fn record_activity(
    State(state): State<AppState>,
    Json(req): Json<ActivityRequest>,
) -> Json<serde_json::Value> {
    let recorded = state.session.record_activity(req.signal).await;
    Json(serde_json::json!({ "recorded": recorded }))
}
