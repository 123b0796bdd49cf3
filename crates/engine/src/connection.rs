//! Connection manager: the single owner of the wallet connection state.
//!
//! All adapter calls are mediated here and every state change goes through
//! the reducer. A generation counter guards against stale completions: any
//! user-initiated transition bumps it, and an async result (connect, silent
//! probe, balance refresh) is only applied if the generation it started under
//! is still current. Store writes are serialized and re-check the
//! generation, so a superseded operation never overwrites the markers of the
//! one that replaced it.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use quaiscope_common::error::WalletError;
use quaiscope_common::store::{DEMO_MODE_KEY, KeyValueStore, WALLET_CONNECTION_KEY, save_json};
use quaiscope_common::types::{ConnectionMarker, ConnectionState, WalletAccount, WalletKind};
use quaiscope_wallet::{AdapterRegistry, SecondaryCapability};

use crate::reducer::{WalletAction, reduce};

struct Machine {
    state: ConnectionState,
    generation: u64,
    revision: u64,
    epoch: u64,
}

/// Connection state together with its position in the transition history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: ConnectionState,
    /// Bumped on every transition.
    pub revision: u64,
    /// Revision of the transition that established the current connection.
    /// A reconnect to the same account gets a new epoch.
    pub epoch: u64,
}

struct Inner {
    adapters: AdapterRegistry,
    store: Arc<dyn KeyValueStore>,
    machine: Mutex<Machine>,
    writes: tokio::sync::Mutex<()>,
    updates: watch::Sender<ConnectionState>,
}

/// Cheaply cloneable handle to the connection state machine.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(adapters: AdapterRegistry, store: Arc<dyn KeyValueStore>) -> Self {
        let (updates, _) = watch::channel(ConnectionState::idle());
        Self {
            inner: Arc::new(Inner {
                adapters,
                store,
                machine: Mutex::new(Machine {
                    state: ConnectionState::idle(),
                    generation: 0,
                    revision: 0,
                    epoch: 0,
                }),
                writes: tokio::sync::Mutex::new(()),
                updates,
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.updates.borrow().clone()
    }

    /// State, revision and connection epoch read atomically.
    pub fn snapshot(&self) -> Snapshot {
        let machine = self.lock();
        Snapshot {
            state: machine.state.clone(),
            revision: machine.revision,
            epoch: machine.epoch,
        }
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.updates.subscribe()
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Machine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an action unconditionally. Returns the previous state and the
    /// generation after the transition.
    fn dispatch(&self, action: WalletAction) -> (ConnectionState, u64) {
        let mut machine = self.lock();
        let previous = machine.state.clone();
        self.transition(&mut machine, &action);
        (previous, machine.generation)
    }

    /// Apply an action only if no superseding transition happened since
    /// `generation` was observed.
    fn dispatch_guarded(&self, generation: u64, action: WalletAction) -> bool {
        let mut machine = self.lock();
        if machine.generation != generation {
            tracing::debug!(
                action = action.name(),
                started = generation,
                current = machine.generation,
                "Dropping stale wallet completion"
            );
            return false;
        }
        self.transition(&mut machine, &action);
        true
    }

    fn transition(&self, machine: &mut Machine, action: &WalletAction) {
        if action.supersedes_in_flight() {
            machine.generation += 1;
        }
        machine.revision += 1;
        if matches!(action, WalletAction::Connected { .. }) {
            machine.epoch = machine.revision;
        }
        machine.state = reduce(&machine.state, action);
        self.inner.updates.send_replace(machine.state.clone());

        tracing::debug!(
            action = action.name(),
            generation = machine.generation,
            connected = machine.state.is_connected,
            demo = machine.state.is_demo_mode,
            "Wallet state transition"
        );
    }

    /// Startup probe: restore a previous session without prompting the user.
    ///
    /// A persisted demo flag wins over any provider authorization. Otherwise
    /// adapters are probed in fixed order and the first one that reports an
    /// authorized account is used; the rest are not probed. Failures leave
    /// the manager idle and are never surfaced.
    pub async fn restore(&self) -> ConnectionState {
        let generation = self.generation();

        match self.inner.store.get(DEMO_MODE_KEY).await {
            Ok(Some(flag)) if flag == "true" => {
                if self.dispatch_guarded(generation, WalletAction::DemoEnabled) {
                    tracing::info!("Restored demo mode");
                }
                return self.state();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read demo flag"),
        }

        for adapter in self.inner.adapters.in_probe_order() {
            let kind = adapter.kind();
            if !adapter.is_available().await {
                tracing::debug!(kind = %kind, "Provider not injected, skipping probe");
                continue;
            }

            let Some(address) = adapter.get_accounts().await.into_iter().next() else {
                continue;
            };

            let balance = adapter.get_balance(&address).await;
            let account = WalletAccount {
                address,
                balance: Some(balance),
                chain_id: None,
            };

            if self.dispatch_guarded(
                generation,
                WalletAction::Connected {
                    kind,
                    account: account.clone(),
                },
            ) {
                tracing::info!(kind = %kind, address = %account.address, "Restored wallet session");
                self.persist_connection(generation, kind, &account).await;
            }
            return self.state();
        }

        tracing::debug!("No previously authorized wallet found");
        self.state()
    }

    /// User-initiated connect. Failures populate `error` and leave the
    /// manager idle.
    pub async fn connect(&self, kind: WalletKind) -> ConnectionState {
        let (_, generation) = self.dispatch(WalletAction::Connecting);
        // Connecting leaves demo mode; a failed attempt must not restore it.
        {
            let _writes = self.inner.writes.lock().await;
            self.remove_key(generation, DEMO_MODE_KEY).await;
        }

        let result = match self.inner.adapters.get(kind) {
            Some(adapter) => {
                if adapter.is_available().await {
                    adapter.connect().await
                } else {
                    Err(WalletError::NotAvailable(kind))
                }
            }
            None => Err(WalletError::NotAvailable(kind)),
        };

        match result {
            Ok(outcome) => {
                if let SecondaryCapability::Unavailable(reason) = &outcome.secondary {
                    tracing::warn!(kind = %kind, reason = %reason, "Connected with baseline account");
                }

                let account = outcome.account;
                if self.dispatch_guarded(
                    generation,
                    WalletAction::Connected {
                        kind,
                        account: account.clone(),
                    },
                ) {
                    tracing::info!(kind = %kind, address = %account.address, "Wallet connected");
                    self.persist_connection(generation, kind, &account).await;
                }
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Wallet connect failed");
                self.dispatch_guarded(generation, WalletAction::Failed(e.to_string()));
            }
        }

        self.state()
    }

    /// Always ends idle with no account, no error and no demo mode, even
    /// while a connect is in flight.
    pub async fn disconnect(&self) -> ConnectionState {
        let (previous, generation) = self.dispatch(WalletAction::Disconnected);

        if let Some(kind) = previous.provider_kind
            && let Some(adapter) = self.inner.adapters.get(kind)
        {
            adapter.disconnect().await;
        }

        {
            let _writes = self.inner.writes.lock().await;
            self.remove_key(generation, WALLET_CONNECTION_KEY).await;
            self.remove_key(generation, DEMO_MODE_KEY).await;
        }

        tracing::info!(
            kind = ?previous.provider_kind,
            demo = previous.is_demo_mode,
            "Wallet disconnected"
        );
        self.state()
    }

    pub fn clear_error(&self) -> ConnectionState {
        self.dispatch(WalletAction::ClearError);
        self.state()
    }

    /// Enter demo mode with the placeholder account. No adapter is called.
    pub async fn enable_demo_mode(&self) -> ConnectionState {
        let (_, generation) = self.dispatch(WalletAction::DemoEnabled);

        {
            let _writes = self.inner.writes.lock().await;
            if self.is_current(generation)
                && let Err(e) = self.inner.store.set(DEMO_MODE_KEY, "true").await
            {
                tracing::warn!(error = %e, "Failed to persist demo flag");
            }
            self.remove_key(generation, WALLET_CONNECTION_KEY).await;
        }

        tracing::info!("Demo mode enabled");
        self.state()
    }

    pub async fn disable_demo_mode(&self) -> ConnectionState {
        let (_, generation) = self.dispatch(WalletAction::DemoDisabled);
        {
            let _writes = self.inner.writes.lock().await;
            self.remove_key(generation, DEMO_MODE_KEY).await;
        }

        tracing::info!("Demo mode disabled");
        self.state()
    }

    /// Re-query the connected account's balance. Dropped if the connection
    /// changed while the query was in flight.
    pub async fn refresh_balance(&self) -> ConnectionState {
        let generation = self.generation();
        let state = self.state();
        let Some((kind, account)) = state.connected_account() else {
            return state;
        };
        let Some(adapter) = self.inner.adapters.get(kind) else {
            return state;
        };

        let balance = adapter.get_balance(&account.address).await;
        self.dispatch_guarded(generation, WalletAction::BalanceRefreshed(balance));
        self.state()
    }

    /// Ask the connected wallet to switch to the Quai network.
    pub async fn switch_network(&self) -> Result<(), WalletError> {
        let state = self.state();
        let (kind, _) = state
            .connected_account()
            .ok_or_else(|| WalletError::Unsupported("No wallet connected".to_string()))?;
        let adapter = self
            .inner
            .adapters
            .get(kind)
            .ok_or(WalletError::NotAvailable(kind))?;

        adapter.switch_chain().await?;
        tracing::info!(kind = %kind, "Switched wallet network");
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    async fn persist_connection(&self, generation: u64, kind: WalletKind, account: &WalletAccount) {
        let marker = ConnectionMarker {
            wallet_type: kind,
            address: account.address.clone(),
        };
        let _writes = self.inner.writes.lock().await;
        if !self.is_current(generation) {
            tracing::debug!(kind = %kind, "Connection superseded before persisting marker");
            return;
        }
        if let Err(e) = save_json(self.inner.store.as_ref(), WALLET_CONNECTION_KEY, &marker).await {
            tracing::warn!(error = %e, "Failed to persist connection marker");
        }
        self.remove_key(generation, DEMO_MODE_KEY).await;
    }

    /// Remove a persisted key unless a later transition has taken over the
    /// markers. Callers hold the write lock.
    async fn remove_key(&self, generation: u64, key: &str) {
        if !self.is_current(generation) {
            return;
        }
        if let Err(e) = self.inner.store.remove(key).await {
            tracing::warn!(key, error = %e, "Failed to clear persisted wallet data");
        }
    }
}
