pub mod metamask;
pub mod pelagus;
pub mod rpc;
pub mod units;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use quaiscope_common::config::NetworkParams;
use quaiscope_common::error::WalletError;
use quaiscope_common::types::{WalletAccount, WalletKind};

use crate::rpc::ProviderRpc;

/// Balance reported whenever a provider cannot be queried.
pub const ZERO_BALANCE: &str = "0";

/// Optional capabilities an adapter may advertise beyond the common surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `wallet_switchEthereumChain` with `wallet_addEthereumChain` fallback.
    ChainSwitch,
    /// MetaMask Quai Snap for native Quai accounts and balances.
    SnapExtension,
}

/// Outcome of the best-effort secondary capability during connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryCapability {
    /// The adapter has no secondary capability.
    NotApplicable,
    /// The capability was used to produce the account.
    Active,
    /// The capability failed; the baseline account was returned instead.
    Unavailable(String),
}

/// Result of an interactive connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub account: WalletAccount,
    pub secondary: SecondaryCapability,
}

/// Uniform surface over one injected wallet provider.
///
/// Only `connect` (and the optional `switch_chain`) can fail. Every other
/// method degrades to a safe default.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Optional capabilities supported by this adapter.
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether the provider injection point is present and identifies itself.
    async fn is_available(&self) -> bool;

    /// Already-authorized accounts. Never prompts; empty on any failure.
    async fn get_accounts(&self) -> Vec<String>;

    /// Request authorization from the user.
    async fn connect(&self) -> Result<ConnectOutcome, WalletError>;

    /// Formatted balance, or [`ZERO_BALANCE`] on any failure.
    async fn get_balance(&self, address: &str) -> String;

    /// Neither provider can revoke authorization, so the default is a no-op.
    async fn disconnect(&self) {}

    async fn switch_chain(&self) -> Result<(), WalletError> {
        Err(WalletError::Unsupported(format!(
            "{} cannot switch networks",
            self.kind()
        )))
    }
}

/// Registry of the wallet adapters known to the dashboard.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn WalletAdapter>>,
}

impl AdapterRegistry {
    /// Build a registry from explicit adapters. Order is irrelevant; lookups
    /// and probing always follow [`WalletKind::PROBE_ORDER`].
    pub fn new(adapters: Vec<Arc<dyn WalletAdapter>>) -> Self {
        Self { adapters }
    }

    /// Build both adapters from their (optional) injected providers.
    pub fn from_providers(
        pelagus: Option<Arc<dyn ProviderRpc>>,
        metamask: Option<Arc<dyn ProviderRpc>>,
        network: NetworkParams,
    ) -> Self {
        Self::new(vec![
            Arc::new(pelagus::PelagusAdapter::new(pelagus, network.clone())),
            Arc::new(metamask::MetaMaskAdapter::new(metamask, network)),
        ])
    }

    pub fn get(&self, kind: WalletKind) -> Option<Arc<dyn WalletAdapter>> {
        self.adapters.iter().find(|a| a.kind() == kind).cloned()
    }

    /// Adapters in startup probe order.
    pub fn in_probe_order(&self) -> Vec<Arc<dyn WalletAdapter>> {
        WalletKind::PROBE_ORDER
            .iter()
            .filter_map(|kind| self.get(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[test]
    fn test_registry_probe_order_is_fixed() {
        let registry = AdapterRegistry::new(vec![
            Arc::new(metamask::MetaMaskAdapter::new(None, NetworkParams::default())),
            Arc::new(pelagus::PelagusAdapter::new(None, NetworkParams::default())),
        ]);
        let kinds: Vec<WalletKind> = registry.in_probe_order().iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![WalletKind::Pelagus, WalletKind::MetaMask]);
    }

    #[test]
    fn test_capability_flags() {
        let registry =
            AdapterRegistry::from_providers(None, None, NetworkParams::default());
        let pelagus = registry.get(WalletKind::Pelagus).unwrap();
        let metamask = registry.get(WalletKind::MetaMask).unwrap();

        assert!(pelagus.supports(Capability::ChainSwitch));
        assert!(!pelagus.supports(Capability::SnapExtension));
        assert!(metamask.supports(Capability::SnapExtension));
        assert!(!metamask.supports(Capability::ChainSwitch));
    }

    #[tokio::test]
    async fn test_metamask_switch_chain_is_unsupported() {
        let provider = MockProvider::new(&["isMetaMask"]);
        let registry =
            AdapterRegistry::from_providers(None, Some(provider.shared()), NetworkParams::default());
        let metamask = registry.get(WalletKind::MetaMask).unwrap();

        let err = metamask.switch_chain().await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported(_)));
        assert!(provider.calls().is_empty());
    }
}
