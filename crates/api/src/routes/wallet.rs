//! Wallet connection routes.
//!
//! Every handler returns the resulting connection state. A failed connect is
//! not an HTTP error: it is reported through the state's `error` field, like
//! any other transition.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use quaiscope_common::error::AppError;
use quaiscope_common::types::{ConnectionState, WalletKind};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/connect/{kind}", post(connect))
        .route("/api/wallet/disconnect", post(disconnect))
        .route("/api/wallet/clear-error", post(clear_error))
        .route("/api/wallet/demo", post(enable_demo).delete(disable_demo))
        .route("/api/wallet/balance", post(refresh_balance))
        .route("/api/wallet/network", post(switch_network))
}

/// Connection state plus display helpers for the header widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    #[serde(flatten)]
    pub state: ConnectionState,
    pub short_address: Option<String>,
    pub dashboard_access: bool,
}

impl From<ConnectionState> for WalletView {
    fn from(state: ConnectionState) -> Self {
        Self {
            short_address: state.account.as_ref().map(|a| a.short_address()),
            dashboard_access: state.grants_dashboard_access(),
            state,
        }
    }
}

/// Bring the session in line with the manager before responding, so the
/// next `/api/session` read does not depend on the tracker task's timing.
async fn settle(state: &AppState, wallet: ConnectionState) -> Json<WalletView> {
    state.session.sync().await;
    Json(wallet.into())
}

/// GET /api/wallet — Current connection state.
async fn get_wallet(State(state): State<AppState>) -> Json<WalletView> {
    Json(state.wallet.state().into())
}

/// POST /api/wallet/connect/:kind — Interactive connect to `pelagus` or `metamask`.
async fn connect(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<WalletView>, AppError> {
    let kind: WalletKind = kind.parse().map_err(AppError::Validation)?;
    let wallet = state.wallet.connect(kind).await;
    Ok(settle(&state, wallet).await)
}

/// POST /api/wallet/disconnect
async fn disconnect(State(state): State<AppState>) -> Json<WalletView> {
    let wallet = state.wallet.disconnect().await;
    settle(&state, wallet).await
}

/// POST /api/wallet/clear-error
async fn clear_error(State(state): State<AppState>) -> Json<WalletView> {
    Json(state.wallet.clear_error().into())
}

/// POST /api/wallet/demo — Enter demo mode.
async fn enable_demo(State(state): State<AppState>) -> Json<WalletView> {
    let wallet = state.wallet.enable_demo_mode().await;
    settle(&state, wallet).await
}

/// DELETE /api/wallet/demo — Leave demo mode.
async fn disable_demo(State(state): State<AppState>) -> Json<WalletView> {
    let wallet = state.wallet.disable_demo_mode().await;
    settle(&state, wallet).await
}

/// POST /api/wallet/balance — Re-query the connected account's balance.
async fn refresh_balance(State(state): State<AppState>) -> Json<WalletView> {
    Json(state.wallet.refresh_balance().await.into())
}

/// POST /api/wallet/network — Ask the connected wallet to switch to Quai.
async fn switch_network(State(state): State<AppState>) -> Result<Json<WalletView>, AppError> {
    state.wallet.switch_network().await?;
    Ok(Json(state.wallet.state().into()))
}
