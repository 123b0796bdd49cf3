//! Pure transition function for the wallet connection state machine.
//!
//! States: `Idle`, `Connecting`, `Connected(kind, account)`, `Demo`. Every
//! mutation of [`ConnectionState`] goes through [`reduce`].

use quaiscope_common::types::{ConnectionState, WalletAccount, WalletKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletAction {
    /// A user-initiated connect started. Clears any previous account.
    Connecting,
    Connected {
        kind: WalletKind,
        account: WalletAccount,
    },
    /// The user-initiated operation failed; back to `Idle` with a message.
    Failed(String),
    Disconnected,
    ClearError,
    DemoEnabled,
    DemoDisabled,
    /// New balance for the connected account.
    BalanceRefreshed(String),
}

impl WalletAction {
    /// Whether this action invalidates in-flight adapter completions.
    pub fn supersedes_in_flight(&self) -> bool {
        matches!(
            self,
            WalletAction::Connecting
                | WalletAction::Disconnected
                | WalletAction::DemoEnabled
                | WalletAction::DemoDisabled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            WalletAction::Connecting => "connecting",
            WalletAction::Connected { .. } => "connected",
            WalletAction::Failed(_) => "failed",
            WalletAction::Disconnected => "disconnected",
            WalletAction::ClearError => "clear_error",
            WalletAction::DemoEnabled => "demo_enabled",
            WalletAction::DemoDisabled => "demo_disabled",
            WalletAction::BalanceRefreshed(_) => "balance_refreshed",
        }
    }
}

pub fn reduce(state: &ConnectionState, action: &WalletAction) -> ConnectionState {
    match action {
        WalletAction::Connecting => ConnectionState {
            is_connecting: true,
            ..ConnectionState::idle()
        },
        WalletAction::Connected { kind, account } => ConnectionState {
            is_connected: true,
            is_connecting: false,
            account: Some(account.clone()),
            provider_kind: Some(*kind),
            is_demo_mode: false,
            error: None,
        },
        WalletAction::Failed(message) => ConnectionState {
            error: Some(message.clone()),
            ..ConnectionState::idle()
        },
        WalletAction::Disconnected | WalletAction::DemoDisabled => ConnectionState::idle(),
        WalletAction::ClearError => ConnectionState {
            error: None,
            ..state.clone()
        },
        WalletAction::DemoEnabled => ConnectionState::demo(),
        WalletAction::BalanceRefreshed(balance) => match state.connected_account() {
            Some((_, account)) => ConnectionState {
                account: Some(WalletAccount {
                    balance: Some(balance.clone()),
                    ..account.clone()
                }),
                ..state.clone()
            },
            None => state.clone(),
        },
    }
}
