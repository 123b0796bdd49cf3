//! Test doubles for driving the connection manager without real providers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use quaiscope_common::error::WalletError;
use quaiscope_common::types::{WalletAccount, WalletKind};
use quaiscope_wallet::{
    AdapterRegistry, Capability, ConnectOutcome, SecondaryCapability, WalletAdapter,
};

/// In-memory adapter with scripted answers and call counters.
///
/// When gated, `connect` (or the silent `get_accounts` probe) parks until the
/// gate is notified, which lets tests interleave other transitions with an
/// in-flight call.
pub struct FakeAdapter {
    kind: WalletKind,
    available: AtomicBool,
    authorized: Mutex<Vec<String>>,
    connect_result: Mutex<Result<ConnectOutcome, WalletError>>,
    balance: Mutex<String>,
    gate: Option<Arc<Notify>>,
    probe_gate: Option<Arc<Notify>>,
    pub connect_calls: AtomicUsize,
    pub accounts_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
}

impl FakeAdapter {
    /// Available adapter with no authorized accounts that fails to connect
    /// with `NoAccountsAuthorized` until told otherwise.
    pub fn new(kind: WalletKind) -> Self {
        Self {
            kind,
            available: AtomicBool::new(true),
            authorized: Mutex::new(Vec::new()),
            connect_result: Mutex::new(Err(WalletError::NoAccountsAuthorized)),
            balance: Mutex::new("0".to_string()),
            gate: None,
            probe_gate: None,
            connect_calls: AtomicUsize::new(0),
            accounts_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    /// Accounts reported by the silent `get_accounts` probe.
    pub fn with_authorized(self, accounts: &[&str]) -> Self {
        *lock(&self.authorized) = accounts.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Make `connect` succeed with this address.
    pub fn connecting_to(self, address: &str) -> Self {
        let balance = lock(&self.balance).clone();
        *lock(&self.connect_result) = Ok(ConnectOutcome {
            account: WalletAccount {
                address: address.to_string(),
                balance: Some(balance),
                chain_id: Some("0x2328".to_string()),
            },
            secondary: SecondaryCapability::NotApplicable,
        });
        self
    }

    pub fn failing_with(self, error: WalletError) -> Self {
        *lock(&self.connect_result) = Err(error);
        self
    }

    pub fn with_balance(self, balance: &str) -> Self {
        self.set_balance(balance);
        self
    }

    pub fn set_balance(&self, balance: &str) {
        *lock(&self.balance) = balance.to_string();
    }

    /// Park `connect` until the returned gate is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Park `get_accounts` until the returned gate is notified.
    pub fn gated_probe(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.probe_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.accounts_calls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl WalletAdapter for FakeAdapter {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get_accounts(&self) -> Vec<String> {
        self.accounts_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.probe_gate {
            gate.notified().await;
        }
        lock(&self.authorized).clone()
    }

    async fn connect(&self) -> Result<ConnectOutcome, WalletError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        lock(&self.connect_result).clone()
    }

    async fn get_balance(&self, _address: &str) -> String {
        lock(&self.balance).clone()
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Registry over two fakes, returning shared handles for assertions.
pub fn fake_registry(
    pelagus: FakeAdapter,
    metamask: FakeAdapter,
) -> (AdapterRegistry, Arc<FakeAdapter>, Arc<FakeAdapter>) {
    let pelagus = Arc::new(pelagus);
    let metamask = Arc::new(metamask);
    let registry = AdapterRegistry::new(vec![
        pelagus.clone() as Arc<dyn WalletAdapter>,
        metamask.clone() as Arc<dyn WalletAdapter>,
    ]);
    (registry, pelagus, metamask)
}
