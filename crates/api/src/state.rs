//! Shared application state for the Axum API server.

use std::sync::Arc;

use quaiscope_common::config::AppConfig;
use quaiscope_engine::connection::ConnectionManager;
use quaiscope_engine::profile::ProfileGate;
use quaiscope_engine::session::SessionTracker;

use crate::feed::DataFeed;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub wallet: ConnectionManager,
    pub session: Arc<SessionTracker>,
    pub profile: Arc<ProfileGate>,
    /// `None` when no analytics API is configured.
    pub feed: Option<Arc<dyn DataFeed>>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        wallet: ConnectionManager,
        session: Arc<SessionTracker>,
        profile: Arc<ProfileGate>,
        config: AppConfig,
    ) -> Self {
        Self {
            wallet,
            session,
            profile,
            feed: None,
            config,
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn DataFeed>) -> Self {
        self.feed = Some(feed);
        self
    }
}
