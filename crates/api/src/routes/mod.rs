pub mod feed;
pub mod health;
pub mod profile;
pub mod session;
pub mod wallet;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(wallet::router())
        .merge(session::router())
        .merge(profile::router())
        .merge(feed::router())
        .with_state(state)
}
