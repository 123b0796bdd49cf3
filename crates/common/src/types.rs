use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported wallet providers, in startup probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Pelagus,
    #[serde(rename = "metamask")]
    MetaMask,
}

impl WalletKind {
    /// Probe order used when restoring a session silently.
    pub const PROBE_ORDER: [WalletKind; 2] = [WalletKind::Pelagus, WalletKind::MetaMask];
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletKind::Pelagus => write!(f, "Pelagus"),
            WalletKind::MetaMask => write!(f, "MetaMask"),
        }
    }
}

impl std::str::FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pelagus" => Ok(WalletKind::Pelagus),
            "metamask" => Ok(WalletKind::MetaMask),
            other => Err(format!("unknown wallet kind: {other}")),
        }
    }
}

/// Snapshot of the active account returned by a connect or balance refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

impl WalletAccount {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            balance: None,
            chain_id: None,
        }
    }

    /// Display form of the address, e.g. `0x1234...abcd`.
    pub fn short_address(&self) -> String {
        let addr = &self.address;
        if addr.len() <= 10 || !addr.is_ascii() {
            return addr.clone();
        }
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    }
}

/// Placeholder address shown while in demo mode.
pub const DEMO_ADDRESS: &str = "0x1234...5678";

/// Placeholder balance shown while in demo mode.
pub const DEMO_BALANCE: &str = "1,234.56";

/// The canonical wallet connection state.
///
/// `provider_kind` is `None` both when idle and in demo mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub account: Option<WalletAccount>,
    pub provider_kind: Option<WalletKind>,
    pub is_demo_mode: bool,
    pub error: Option<String>,
}

impl ConnectionState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn demo() -> Self {
        Self {
            is_connected: true,
            is_connecting: false,
            account: Some(WalletAccount {
                address: DEMO_ADDRESS.to_string(),
                balance: Some(DEMO_BALANCE.to_string()),
                chain_id: None,
            }),
            provider_kind: None,
            is_demo_mode: true,
            error: None,
        }
    }

    /// Connected with a real provider (not demo).
    pub fn connected_account(&self) -> Option<(WalletKind, &WalletAccount)> {
        match (self.is_connected, self.provider_kind, &self.account) {
            (true, Some(kind), Some(account)) => Some((kind, account)),
            _ => None,
        }
    }

    /// Whether dashboard pages may render: any connection, real or demo.
    pub fn grants_dashboard_access(&self) -> bool {
        self.is_connected
    }
}

/// Persisted marker of the last real wallet connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMarker {
    pub wallet_type: WalletKind,
    pub address: String,
}

/// An active wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub address: String,
    pub provider_kind: WalletKind,
    pub connected_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// User interaction signals that keep a session alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySignal {
    Pointer,
    Key,
    Scroll,
    Touch,
}

/// Locally stored dashboard user, independent of any wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub visit_count: u64,
}

// ============================================================
// Analytics records (consumed from the data API)
// ============================================================

/// Transfers above this formatted amount are classified as whale moves.
pub const WHALE_THRESHOLD: f64 = 50_000.0;

/// Row identifier from the analytics store (integer or text key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

/// A large token transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhaleTransfer {
    pub id: RecordId,
    pub transaction_hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    pub token_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub is_whale: bool,
}

/// Token reference attached to a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

/// A single DEX swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexSwap {
    pub id: RecordId,
    pub transaction_hash: String,
    pub block_number: u64,
    pub dex_name: String,
    pub trader: String,
    pub token_in: TokenRef,
    pub token_out: TokenRef,
    pub amount_in: f64,
    pub amount_out: f64,
    #[serde(default)]
    pub price_impact: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate DEX volume for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexVolume {
    pub volume: f64,
    pub traders: usize,
    pub swaps: usize,
    pub transactions: Vec<DexSwap>,
}

/// Token activity ranking entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub volume_24h: f64,
    pub transactions_24h: u64,
    pub holders: u64,
    pub price_change_24h: f64,
}

/// Lookback window for DEX volume queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumePeriod {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl VolumePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumePeriod::Day => "24h",
            VolumePeriod::Week => "7d",
            VolumePeriod::Month => "30d",
        }
    }
}

impl std::fmt::Display for VolumePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload accepted by the analytics ingest endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum IngestEvent {
    Transfer {
        transaction_hash: String,
        block_number: u64,
        from: String,
        to: String,
        token_address: String,
        amount: String,
        amount_formatted: String,
    },
    Swap {
        transaction_hash: String,
        block_number: u64,
        dex_name: String,
        trader: String,
        token_in: String,
        token_out: String,
        amount_in: String,
        amount_out: String,
        amount_in_formatted: String,
        amount_out_formatted: String,
        #[serde(default)]
        price_impact: Option<f64>,
    },
}

impl IngestEvent {
    /// Whether a transfer crosses the whale threshold. Swaps never do.
    pub fn is_whale(&self) -> bool {
        match self {
            IngestEvent::Transfer {
                amount_formatted, ..
            } => amount_formatted
                .trim()
                .parse::<f64>()
                .map(|amount| amount > WHALE_THRESHOLD)
                .unwrap_or(false),
            IngestEvent::Swap { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        let account = WalletAccount::new("0x00a3e45aa16163F2663015b6695894D918866d19");
        assert_eq!(account.short_address(), "0x00a3...6d19");
        assert_eq!(WalletAccount::new("0x1234").short_address(), "0x1234");
    }

    #[test]
    fn test_demo_state_invariants() {
        let state = ConnectionState::demo();
        assert!(state.is_connected);
        assert!(state.is_demo_mode);
        assert!(state.provider_kind.is_none());
        assert!(state.connected_account().is_none());
        assert!(state.grants_dashboard_access());
        assert_eq!(state.account.unwrap().address, DEMO_ADDRESS);
    }

    #[test]
    fn test_wallet_kind_parse_and_serde() {
        assert_eq!("MetaMask".parse::<WalletKind>(), Ok(WalletKind::MetaMask));
        assert_eq!("pelagus".parse::<WalletKind>(), Ok(WalletKind::Pelagus));
        assert!("phantom".parse::<WalletKind>().is_err());
        assert_eq!(
            serde_json::to_string(&WalletKind::MetaMask).unwrap(),
            "\"metamask\""
        );
    }

    #[test]
    fn test_connection_marker_wire_format() {
        let marker = ConnectionMarker {
            wallet_type: WalletKind::Pelagus,
            address: "0xabc".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&marker).unwrap(),
            serde_json::json!({"walletType": "pelagus", "address": "0xabc"})
        );
    }

    #[test]
    fn test_ingest_whale_classification() {
        let event: IngestEvent = serde_json::from_value(serde_json::json!({
            "type": "transfer",
            "transactionHash": "0x01",
            "blockNumber": 10,
            "from": "0xa",
            "to": "0xb",
            "tokenAddress": "0xt",
            "amount": "75000000000000000000000",
            "amountFormatted": "75000"
        }))
        .unwrap();
        assert!(event.is_whale());

        let small = IngestEvent::Transfer {
            transaction_hash: "0x02".to_string(),
            block_number: 11,
            from: "0xa".to_string(),
            to: "0xb".to_string(),
            token_address: "0xt".to_string(),
            amount: "1".to_string(),
            amount_formatted: "50000".to_string(),
        };
        assert!(!small.is_whale());
    }

    #[test]
    fn test_volume_period_wire_names() {
        assert_eq!(
            serde_json::from_str::<VolumePeriod>("\"7d\"").unwrap(),
            VolumePeriod::Week
        );
        assert_eq!(VolumePeriod::default().as_str(), "24h");
    }
}
