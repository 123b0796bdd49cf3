//! MetaMask adapter with the optional Quai Snap.
//!
//! MetaMask only knows Quai through the `npm:quai-snap` extension. Connect
//! first obtains a baseline Ethereum account, then tries to install and use
//! the snap. Snap failures never fail the connect.

use std::sync::Arc;

use async_trait::async_trait;
use quaiscope_common::config::NetworkParams;
use quaiscope_common::error::WalletError;
use quaiscope_common::types::{WalletAccount, WalletKind};
use serde_json::{Value, json};

use crate::rpc::{ProviderRpc, accounts_from};
use crate::units::format_balance;
use crate::{Capability, ConnectOutcome, SecondaryCapability, WalletAdapter, ZERO_BALANCE};

const MARKER: &str = "isMetaMask";

pub const SNAP_ID: &str = "npm:quai-snap";

/// Chain reported when the baseline Ethereum account is used.
const BASELINE_CHAIN_ID: &str = "0x1";

pub struct MetaMaskAdapter {
    provider: Option<Arc<dyn ProviderRpc>>,
    network: NetworkParams,
}

impl MetaMaskAdapter {
    pub fn new(provider: Option<Arc<dyn ProviderRpc>>, network: NetworkParams) -> Self {
        Self { provider, network }
    }

    fn provider(&self) -> Option<&Arc<dyn ProviderRpc>> {
        self.provider.as_ref().filter(|p| p.has_marker(MARKER))
    }

    async fn is_snap_installed(&self, provider: &Arc<dyn ProviderRpc>) -> bool {
        match provider.request("wallet_getSnaps", Value::Null).await {
            Ok(snaps) => snaps.get(SNAP_ID).is_some(),
            Err(_) => false,
        }
    }

    async fn install_snap(&self, provider: &Arc<dyn ProviderRpc>) -> Result<(), WalletError> {
        provider
            .request("wallet_requestSnaps", json!({ SNAP_ID: {} }))
            .await
            .map_err(|e| {
                WalletError::SecondaryCapabilityUnavailable(format!(
                    "Failed to install Quai Snap: {}",
                    e.message
                ))
            })?;
        Ok(())
    }

    async fn invoke_snap(
        &self,
        provider: &Arc<dyn ProviderRpc>,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, WalletError> {
        let mut request = json!({ "method": method });
        if let Some(params) = params {
            request["params"] = params;
        }

        Ok(provider
            .request(
                "wallet_invokeSnap",
                json!({ "snapId": SNAP_ID, "request": request }),
            )
            .await?)
    }

    /// Install the snap if needed and return its first Quai account.
    async fn snap_account(&self, provider: &Arc<dyn ProviderRpc>) -> Result<String, WalletError> {
        if !self.is_snap_installed(provider).await {
            tracing::info!("Quai Snap not installed, attempting installation");
            self.install_snap(provider).await?;
        }

        if !self.is_snap_installed(provider).await {
            return Err(WalletError::SecondaryCapabilityUnavailable(
                "Quai Snap is not installed".to_string(),
            ));
        }

        let accounts = accounts_from(self.invoke_snap(provider, "getAccounts", None).await?);
        accounts.into_iter().next().ok_or_else(|| {
            WalletError::SecondaryCapabilityUnavailable(
                "Quai Snap returned no accounts".to_string(),
            )
        })
    }
}

#[async_trait]
impl WalletAdapter for MetaMaskAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::MetaMask
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::SnapExtension]
    }

    async fn is_available(&self) -> bool {
        self.provider().is_some()
    }

    async fn get_accounts(&self) -> Vec<String> {
        let Some(provider) = self.provider() else {
            return Vec::new();
        };

        match provider.request("eth_accounts", Value::Null).await {
            Ok(value) => accounts_from(value),
            Err(e) => {
                tracing::debug!(error = %e, "MetaMask eth_accounts failed");
                Vec::new()
            }
        }
    }

    async fn connect(&self) -> Result<ConnectOutcome, WalletError> {
        let provider = self
            .provider()
            .ok_or(WalletError::NotAvailable(WalletKind::MetaMask))?;

        let accounts = accounts_from(provider.request("eth_requestAccounts", Value::Null).await?);
        let baseline = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccountsAuthorized)?;

        let (address, chain_id, secondary) = match self.snap_account(provider).await {
            Ok(quai_address) => {
                tracing::info!(address = %quai_address, "Connected to MetaMask with Quai Snap");
                (
                    quai_address,
                    self.network.chain_id.clone(),
                    SecondaryCapability::Active,
                )
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Quai Snap unavailable, using standard MetaMask account"
                );
                (
                    baseline,
                    BASELINE_CHAIN_ID.to_string(),
                    SecondaryCapability::Unavailable(e.to_string()),
                )
            }
        };

        let balance = self.get_balance(&address).await;

        Ok(ConnectOutcome {
            account: WalletAccount {
                address,
                balance: Some(balance),
                chain_id: Some(chain_id),
            },
            secondary,
        })
    }

    async fn get_balance(&self, address: &str) -> String {
        let Some(provider) = self.provider() else {
            return ZERO_BALANCE.to_string();
        };

        if self.is_snap_installed(provider).await {
            return match self
                .invoke_snap(provider, "getBalance", Some(json!({ "address": address })))
                .await
            {
                Ok(Value::String(balance)) if !balance.is_empty() => balance,
                Ok(Value::Number(balance)) => balance.to_string(),
                Ok(_) => ZERO_BALANCE.to_string(),
                Err(e) => {
                    tracing::debug!(error = %e, "Quai Snap getBalance failed");
                    ZERO_BALANCE.to_string()
                }
            };
        }

        match provider
            .request("eth_getBalance", json!([address, "latest"]))
            .await
        {
            Ok(value) => format_balance(&value).unwrap_or_else(|| ZERO_BALANCE.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "MetaMask eth_getBalance failed");
                ZERO_BALANCE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    const BASELINE: &str = "0x5aeda56215b167893e80b4fe645ba6d5bab767de";
    const QUAI: &str = "0x00a3e45aa16163F2663015b6695894D918866d19";

    fn adapter(provider: &MockProvider) -> MetaMaskAdapter {
        MetaMaskAdapter::new(Some(provider.shared()), NetworkParams::default())
    }

    #[tokio::test]
    async fn test_connect_uses_installed_snap_account() {
        let provider = MockProvider::new(&["isMetaMask"])
            .reply("eth_requestAccounts", json!([BASELINE]))
            .reply("wallet_getSnaps", json!({ SNAP_ID: { "version": "1.0.0" } }))
            .reply("wallet_invokeSnap", json!([QUAI]))
            .reply("wallet_invokeSnap", json!("12.5"));

        let outcome = adapter(&provider).connect().await.unwrap();
        assert_eq!(outcome.account.address, QUAI);
        assert_eq!(outcome.account.chain_id.as_deref(), Some("0x2328"));
        assert_eq!(outcome.account.balance.as_deref(), Some("12.5"));
        assert_eq!(outcome.secondary, SecondaryCapability::Active);
        assert!(!provider.called("wallet_requestSnaps"));
    }

    #[tokio::test]
    async fn test_connect_installs_missing_snap() {
        let provider = MockProvider::new(&["isMetaMask"])
            .reply("eth_requestAccounts", json!([BASELINE]))
            .reply("wallet_getSnaps", json!({}))
            .reply("wallet_getSnaps", json!({ SNAP_ID: {} }))
            .reply("wallet_requestSnaps", json!({ SNAP_ID: {} }))
            .reply("wallet_invokeSnap", json!([QUAI]))
            .reply("wallet_invokeSnap", json!("3.25"));

        let outcome = adapter(&provider).connect().await.unwrap();
        assert_eq!(outcome.account.address, QUAI);
        assert_eq!(outcome.secondary, SecondaryCapability::Active);
        assert!(provider.called("wallet_requestSnaps"));
    }

    #[tokio::test]
    async fn test_snap_install_failure_falls_back_to_baseline() {
        let provider = MockProvider::new(&["isMetaMask"])
            .reply("eth_requestAccounts", json!([BASELINE]))
            .reply("wallet_getSnaps", json!({}))
            .fail("wallet_requestSnaps", 4001, "User rejected the request.")
            .reply("eth_getBalance", json!("0xde0b6b3a7640000"));

        let outcome = adapter(&provider).connect().await.unwrap();
        assert_eq!(outcome.account.address, BASELINE);
        assert_eq!(outcome.account.chain_id.as_deref(), Some("0x1"));
        assert_eq!(outcome.account.balance.as_deref(), Some("1.0000"));
        match outcome.secondary {
            SecondaryCapability::Unavailable(reason) => {
                assert!(reason.contains("Failed to install Quai Snap"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_without_accounts_or_provider() {
        let provider =
            MockProvider::new(&["isMetaMask"]).reply("eth_requestAccounts", json!([]));
        assert_eq!(
            adapter(&provider).connect().await.unwrap_err(),
            WalletError::NoAccountsAuthorized
        );

        let absent = MetaMaskAdapter::new(None, NetworkParams::default());
        assert!(!absent.is_available().await);
        assert_eq!(
            absent.connect().await.unwrap_err(),
            WalletError::NotAvailable(WalletKind::MetaMask)
        );
    }

    #[tokio::test]
    async fn test_best_effort_methods_swallow_errors() {
        let provider = MockProvider::new(&["isMetaMask"])
            .fail("eth_accounts", -32603, "boom")
            .fail("wallet_getSnaps", -32603, "boom")
            .fail("eth_getBalance", -32603, "boom");
        let adapter = adapter(&provider);

        assert!(adapter.is_available().await);
        assert!(adapter.get_accounts().await.is_empty());
        assert_eq!(adapter.get_balance(BASELINE).await, "0");
    }

    #[tokio::test]
    async fn test_snap_balance_failure_is_zero() {
        let provider = MockProvider::new(&["isMetaMask"])
            .reply("wallet_getSnaps", json!({ SNAP_ID: {} }))
            .fail("wallet_invokeSnap", -32603, "snap crashed");

        assert_eq!(adapter(&provider).get_balance(QUAI).await, "0");
    }
}
