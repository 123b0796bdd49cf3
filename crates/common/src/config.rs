use std::net::SocketAddr;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the dashboard API binds to (default: 0.0.0.0:3000)
    pub bind_addr: SocketAddr,

    /// Redis connection string. When unset, an in-memory store is used and
    /// nothing survives a restart.
    pub redis_url: Option<String>,

    /// Prefix applied to every key written to the durable store
    pub store_key_prefix: String,

    /// JSON-RPC bridge exposing the Pelagus provider
    pub pelagus_bridge_url: Option<String>,

    /// JSON-RPC bridge exposing the MetaMask provider
    pub metamask_bridge_url: Option<String>,

    /// Base URL of the analytics API (whales, dex volume, top tokens)
    pub feed_api_url: Option<String>,

    /// Inactivity window after which a session is disconnected (default: 24h)
    pub session_idle_timeout_secs: u64,

    /// How often the idle check runs (default: 60s)
    pub session_check_interval_secs: u64,

    /// Network parameters used when asking a wallet to switch/add the chain.
    pub network: NetworkParams,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

/// Chain parameters for `wallet_switchEthereumChain` / `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkParams {
    pub chain_id: String,
    pub chain_name: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub rpc_url: String,
    pub explorer_url: String,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            chain_id: "0x2328".to_string(),
            chain_name: "Quai Network".to_string(),
            currency_name: "Quai".to_string(),
            currency_symbol: "QUAI".to_string(),
            currency_decimals: 18,
            rpc_url: "https://rpc.quai.network".to_string(),
            explorer_url: "https://quaiscan.io".to_string(),
        }
    }
}

/// Upper bound for the idle timeout (ten years).
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn parse_idle_timeout(raw: &str) -> anyhow::Result<u64> {
    let secs: u64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("SESSION_IDLE_TIMEOUT_SECS must be a valid u64"))?;
    if secs == 0 || secs > MAX_IDLE_TIMEOUT_SECS {
        return Err(anyhow::anyhow!(
            "SESSION_IDLE_TIMEOUT_SECS must be between 1 and {MAX_IDLE_TIMEOUT_SECS}"
        ));
    }
    Ok(secs)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = NetworkParams::default();

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BIND_ADDR must be a valid socket address"))?,
            redis_url: std::env::var("REDIS_URL").ok(),
            store_key_prefix: std::env::var("STORE_KEY_PREFIX")
                .unwrap_or_else(|_| "quaiscope:".to_string()),
            pelagus_bridge_url: std::env::var("PELAGUS_BRIDGE_URL").ok(),
            metamask_bridge_url: std::env::var("METAMASK_BRIDGE_URL").ok(),
            feed_api_url: std::env::var("FEED_API_URL").ok(),
            session_idle_timeout_secs: parse_idle_timeout(
                &std::env::var("SESSION_IDLE_TIMEOUT_SECS").unwrap_or_else(|_| "86400".to_string()),
            )?,
            session_check_interval_secs: std::env::var("SESSION_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("SESSION_CHECK_INTERVAL_SECS must be a valid u64")
                })?,
            network: NetworkParams {
                chain_id: std::env::var("QUAI_CHAIN_ID").unwrap_or(defaults.chain_id),
                rpc_url: std::env::var("QUAI_RPC_URL").unwrap_or(defaults.rpc_url),
                explorer_url: std::env::var("QUAI_EXPLORER_URL").unwrap_or(defaults.explorer_url),
                ..NetworkParams::default()
            },
            log_json: std::env::var("LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    pub fn session_idle_timeout(&self) -> chrono::Duration {
        i64::try_from(self.session_idle_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn session_check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_check_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_network_is_quai_mainnet() {
        let params = NetworkParams::default();
        assert_eq!(params.chain_id, "0x2328");
        assert_eq!(params.currency_decimals, 18);
    }

    #[test]
    fn test_idle_timeout_range_is_validated() {
        assert_eq!(parse_idle_timeout("86400").unwrap(), 86_400);
        assert!(parse_idle_timeout("0").is_err());
        assert!(parse_idle_timeout("soon").is_err());
        assert!(parse_idle_timeout("9300000000000000").is_err());
        assert!(parse_idle_timeout(&MAX_IDLE_TIMEOUT_SECS.to_string()).is_ok());
    }
}
