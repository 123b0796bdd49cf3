//! Session tracker. Derives a session from connection transitions.
//!
//! A session exists exactly while the connection manager reports a real
//! (non-demo) connection. User interaction keeps it alive; a periodic check
//! disconnects the wallet once the session has been idle for longer than the
//! configured timeout.
//!
//! Sessions are keyed on the manager's connection epoch, not on the account:
//! every new `Connected` transition starts a fresh record, even for the same
//! address. Snapshots older than the last one applied are ignored.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use quaiscope_common::clock::Clock;
use quaiscope_common::store::{KeyValueStore, SESSION_KEY, save_json};
use quaiscope_common::types::{ActivitySignal, SessionRecord};

use crate::connection::{ConnectionManager, Snapshot};

/// Default inactivity window before auto-disconnect (24 hours).
pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 24 * 60 * 60;

/// Default interval between idle checks.
pub const DEFAULT_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[derive(Default)]
struct Tracked {
    session: Option<SessionRecord>,
    /// Connection epoch the session belongs to.
    epoch: u64,
    /// Last manager revision applied.
    revision: u64,
}

pub struct SessionTracker {
    manager: ConnectionManager,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    check_interval: StdDuration,
    tracked: Mutex<Tracked>,
    writes: tokio::sync::Mutex<()>,
}

impl SessionTracker {
    pub fn new(
        manager: ConnectionManager,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            manager,
            store,
            clock,
            idle_timeout: Duration::seconds(DEFAULT_IDLE_TIMEOUT_SECS),
            check_interval: DEFAULT_CHECK_INTERVAL,
            tracked: Mutex::new(Tracked::default()),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_check_interval(mut self, check_interval: StdDuration) -> Self {
        self.check_interval = check_interval;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tracked> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reconcile the session with the manager's current state.
    ///
    /// A new record is created when a connection with a new epoch appears;
    /// the record and its persisted copy are discarded when the manager is
    /// in any other state.
    pub async fn sync(&self) {
        let snapshot = self.manager.snapshot();
        self.apply(snapshot).await;
    }

    async fn apply(&self, snapshot: Snapshot) {
        let now = self.clock.now();

        {
            let mut tracked = self.lock();
            if snapshot.revision < tracked.revision {
                tracing::debug!(
                    revision = snapshot.revision,
                    applied = tracked.revision,
                    "Ignoring stale connection snapshot"
                );
                return;
            }
            tracked.revision = snapshot.revision;

            match snapshot.state.connected_account() {
                Some((kind, account)) => {
                    if tracked.session.is_some() && tracked.epoch == snapshot.epoch {
                        return;
                    }
                    let record = SessionRecord {
                        address: account.address.clone(),
                        provider_kind: kind,
                        connected_at: now,
                        last_activity_at: now,
                    };
                    tracing::info!(
                        address = %record.address,
                        kind = %record.provider_kind,
                        epoch = snapshot.epoch,
                        "Session started"
                    );
                    tracked.session = Some(record);
                    tracked.epoch = snapshot.epoch;
                }
                None => {
                    if let Some(ended) = tracked.session.take() {
                        tracing::info!(
                            address = %ended.address,
                            duration_secs = (now - ended.connected_at).num_seconds(),
                            "Session ended"
                        );
                    }
                }
            }
        }

        self.flush().await;
    }

    /// Register user interaction. Returns `false` when no session is active.
    pub async fn record_activity(&self, signal: ActivitySignal) -> bool {
        let now = self.clock.now();
        {
            let mut tracked = self.lock();
            match tracked.session.as_mut() {
                Some(record) => record.last_activity_at = now,
                None => return false,
            }
        }

        tracing::trace!(signal = ?signal, "Session activity");
        self.flush().await;
        true
    }

    /// Disconnect the wallet if the session has been idle past the timeout.
    /// Returns `true` when a disconnect was triggered.
    pub async fn check_idle(&self) -> bool {
        let now = self.clock.now();
        let (idle, epoch) = {
            let tracked = self.lock();
            match tracked.session.as_ref() {
                Some(record) => (now - record.last_activity_at, tracked.epoch),
                None => return false,
            }
        };

        if idle <= self.idle_timeout {
            return false;
        }
        // The user reconnected since the session was read.
        if self.manager.snapshot().epoch != epoch {
            return false;
        }

        tracing::info!(
            idle_secs = idle.num_seconds(),
            timeout_secs = self.idle_timeout.num_seconds(),
            "Session idle timeout reached, disconnecting"
        );
        self.manager.disconnect().await;
        self.sync().await;
        true
    }

    /// Time since the session started; zero when no session is active.
    pub fn session_duration(&self) -> Duration {
        let now = self.clock.now();
        self.lock()
            .session
            .as_ref()
            .map(|s| now - s.connected_at)
            .unwrap_or_else(Duration::zero)
    }

    /// Time since the last recorded interaction.
    pub fn idle_duration(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.lock().session.as_ref().map(|s| now - s.last_activity_at)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.lock().session.as_ref().map(|s| s.last_activity_at)
    }

    pub fn current(&self) -> Option<SessionRecord> {
        self.lock().session.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Follow connection transitions and run the idle check until `shutdown`
    /// flips (or its sender is dropped).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut updates = self.manager.subscribe();
        self.sync().await;

        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        tracing::info!(
            check_interval_secs = self.check_interval.as_secs(),
            idle_timeout_secs = self.idle_timeout.num_seconds(),
            "Session tracker started"
        );

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.sync().await;
                }
                _ = ticker.tick() => {
                    self.check_idle().await;
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        tracing::info!("Session tracker stopped");
    }

    /// Write the in-memory session to the store. Writes are serialized and
    /// always carry the latest record, so a late flush cannot resurrect a
    /// session that has since ended.
    async fn flush(&self) {
        let _writes = self.writes.lock().await;
        let current = self.lock().session.clone();
        let result = match &current {
            Some(record) => save_json(self.store.as_ref(), SESSION_KEY, record).await,
            None => self.store.remove(SESSION_KEY).await,
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}
