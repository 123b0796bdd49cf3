//! Profile gate: first-visit detection and onboarding.
//!
//! The profile is independent of any wallet. A load with no stored profile
//! marks the user as new; the UI then collects a display name and calls
//! [`ProfileGate::complete_onboarding`].

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use quaiscope_common::clock::Clock;
use quaiscope_common::error::{AppError, StoreError};
use quaiscope_common::store::{KeyValueStore, PROFILE_KEY, load_json, save_json};
use quaiscope_common::types::UserProfile;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    pub user: Option<UserProfile>,
    pub is_new_user: bool,
}

impl ProfileStatus {
    fn new_user() -> Self {
        Self {
            user: None,
            is_new_user: true,
        }
    }
}

pub struct ProfileGate {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    current: Mutex<ProfileStatus>,
}

impl ProfileGate {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            current: Mutex::new(ProfileStatus::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProfileStatus> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a visit. A stored profile gets its visit count bumped and
    /// `last_visit` set to now; no profile (or an unreadable one) means a
    /// new user.
    pub async fn load(&self) -> Result<ProfileStatus, StoreError> {
        let stored = match load_json::<UserProfile>(self.store.as_ref(), PROFILE_KEY).await {
            Ok(profile) => profile,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(error = %e, "Stored profile is corrupt, treating as new user");
                None
            }
            Err(e) => return Err(e),
        };

        let status = match stored {
            Some(mut profile) => {
                profile.visit_count = profile.visit_count.saturating_add(1);
                profile.last_visit = self.clock.now();
                save_json(self.store.as_ref(), PROFILE_KEY, &profile).await?;

                tracing::debug!(
                    name = %profile.name,
                    visits = profile.visit_count,
                    "Returning user"
                );
                ProfileStatus {
                    user: Some(profile),
                    is_new_user: false,
                }
            }
            None => ProfileStatus::new_user(),
        };

        *self.lock() = status.clone();
        Ok(status)
    }

    /// Create the profile from the onboarding form.
    pub async fn complete_onboarding(&self, name: &str) -> Result<UserProfile, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name must not be empty".to_string()));
        }

        let now = self.clock.now();
        let profile = UserProfile {
            name: name.to_string(),
            first_visit: now,
            last_visit: now,
            visit_count: 1,
        };
        save_json(self.store.as_ref(), PROFILE_KEY, &profile).await?;

        tracing::info!(name = %profile.name, "Onboarding completed");
        *self.lock() = ProfileStatus {
            user: Some(profile.clone()),
            is_new_user: false,
        };
        Ok(profile)
    }

    /// Forget the stored profile; the next visit onboards again.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(PROFILE_KEY).await?;
        *self.lock() = ProfileStatus::new_user();
        tracing::info!("Profile cleared");
        Ok(())
    }

    pub fn current(&self) -> ProfileStatus {
        self.lock().clone()
    }

    pub fn is_new_user(&self) -> bool {
        self.lock().is_new_user
    }

    pub fn display_name(&self) -> Option<String> {
        self.lock().user.as_ref().map(|u| u.name.clone())
    }
}
