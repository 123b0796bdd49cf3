//! Pelagus adapter: the native Quai wallet.
//!
//! Pelagus speaks the `eth_*` dialect directly and identifies itself with
//! `isQuai`. It can switch (and add) the Quai chain but has no revoke call.

use std::sync::Arc;

use async_trait::async_trait;
use quaiscope_common::config::NetworkParams;
use quaiscope_common::error::{RpcError, WalletError};
use quaiscope_common::types::{WalletAccount, WalletKind};
use serde_json::{Value, json};

use crate::rpc::{ProviderRpc, accounts_from};
use crate::units::format_balance;
use crate::{Capability, ConnectOutcome, SecondaryCapability, WalletAdapter, ZERO_BALANCE};

const MARKER: &str = "isQuai";

pub struct PelagusAdapter {
    provider: Option<Arc<dyn ProviderRpc>>,
    network: NetworkParams,
}

impl PelagusAdapter {
    pub fn new(provider: Option<Arc<dyn ProviderRpc>>, network: NetworkParams) -> Self {
        Self { provider, network }
    }

    fn provider(&self) -> Option<&Arc<dyn ProviderRpc>> {
        self.provider.as_ref().filter(|p| p.has_marker(MARKER))
    }

    /// Parameters for `wallet_addEthereumChain`.
    fn add_chain_params(&self) -> Value {
        let n = &self.network;
        json!([{
            "chainId": n.chain_id,
            "chainName": n.chain_name,
            "nativeCurrency": {
                "name": n.currency_name,
                "symbol": n.currency_symbol,
                "decimals": n.currency_decimals,
            },
            "rpcUrls": [n.rpc_url],
            "blockExplorerUrls": [n.explorer_url],
        }])
    }
}

#[async_trait]
impl WalletAdapter for PelagusAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::Pelagus
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ChainSwitch]
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
                tracing::debug!(error = %e, "Pelagus eth_accounts failed");
                Vec::new()
            }
        }
    }

    async fn connect(&self) -> Result<ConnectOutcome, WalletError> {
        let provider = self
            .provider()
            .ok_or(WalletError::NotAvailable(WalletKind::Pelagus))?;

        let accounts = accounts_from(provider.request("eth_requestAccounts", Value::Null).await?);
        let address = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccountsAuthorized)?;

        let balance = self.get_balance(&address).await;
        let chain_id = provider.request("eth_chainId", Value::Null).await?;

        tracing::info!(address = %address, "Connected to Pelagus");

        Ok(ConnectOutcome {
            account: WalletAccount {
                address,
                balance: Some(balance),
                chain_id: chain_id.as_str().map(str::to_string),
            },
            secondary: SecondaryCapability::NotApplicable,
        })
    }

    async fn get_balance(&self, address: &str) -> String {
        let Some(provider) = self.provider() else {
            return ZERO_BALANCE.to_string();
        };

        match provider
            .request("eth_getBalance", json!([address, "latest"]))
            .await
        {
            Ok(value) => format_balance(&value).unwrap_or_else(|| ZERO_BALANCE.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "Pelagus eth_getBalance failed");
                ZERO_BALANCE.to_string()
            }
        }
    }

    async fn switch_chain(&self) -> Result<(), WalletError> {
        let provider = self
            .provider()
            .ok_or(WalletError::NotAvailable(WalletKind::Pelagus))?;

        let switch = provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": self.network.chain_id }]),
            )
            .await;

        match switch {
            Ok(_) => Ok(()),
            Err(RpcError { code, .. }) if code == RpcError::UNRECOGNIZED_CHAIN => {
                tracing::info!(chain_id = %self.network.chain_id, "Chain unknown to Pelagus, adding it");
                provider
                    .request("wallet_addEthereumChain", self.add_chain_params())
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
