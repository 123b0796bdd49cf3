//! Integration tests for the HTTP JSON-RPC provider bridge.
//!
//! Each test spawns a throwaway Axum JSON-RPC server on a random local port.

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use quaiscope_common::config::NetworkParams;
use quaiscope_common::types::WalletKind;
use quaiscope_wallet::rpc::{HttpProvider, ProviderRpc};
use quaiscope_wallet::{AdapterRegistry, SecondaryCapability};

const ADDR: &str = "0x00a3e45aa16163F2663015b6695894D918866d19";

/// A minimal Pelagus-like bridge.
async fn handle(Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default();

    let body = match method {
        "eth_accounts" | "eth_requestAccounts" => json!({"jsonrpc": "2.0", "id": id, "result": [ADDR]}),
        "eth_getBalance" => json!({"jsonrpc": "2.0", "id": id, "result": "0x1bc16d674ec80000"}),
        "eth_chainId" => json!({"jsonrpc": "2.0", "id": id, "result": "0x2328"}),
        "echo_params" => json!({"jsonrpc": "2.0", "id": id, "result": req.get("params").cloned()}),
        _ => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": 4200, "message": format!("unsupported method {method}")}
        }),
    };
    Json(body)
}

async fn spawn_bridge() -> String {
    let app = Router::new().route("/", post(handle));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn test_http_provider_result_and_error_mapping() {
    let url = spawn_bridge().await;
    let provider = HttpProvider::new(url, &["isQuai"]);

    let accounts = provider.request("eth_accounts", Value::Null).await.unwrap();
    assert_eq!(accounts, json!([ADDR]));

    let err = provider
        .request("wallet_getSnaps", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code, 4200);
    assert!(err.message.contains("wallet_getSnaps"));
}

#[tokio::test]
async fn test_http_provider_omits_null_params() {
    let url = spawn_bridge().await;
    let provider = HttpProvider::new(url, &[]);

    let echoed = provider.request("echo_params", Value::Null).await.unwrap();
    assert_eq!(echoed, Value::Null);

    let echoed = provider
        .request("echo_params", json!([ADDR, "latest"]))
        .await
        .unwrap();
    assert_eq!(echoed, json!([ADDR, "latest"]));
}

#[tokio::test]
async fn test_http_provider_transport_failure() {
    // Nothing listens on port 9 (discard) in the test environment.
    let provider = HttpProvider::new("http://127.0.0.1:9/", &["isQuai"]);
    let err = provider.request("eth_accounts", Value::Null).await.unwrap_err();
    assert_eq!(err.code, quaiscope_common::error::RpcError::INTERNAL);
}

#[tokio::test]
async fn test_pelagus_adapter_over_http_bridge() {
    let url = spawn_bridge().await;
    let provider: Arc<dyn ProviderRpc> = Arc::new(HttpProvider::new(url, &["isQuai"]));
    let registry = AdapterRegistry::from_providers(Some(provider), None, NetworkParams::default());

    let pelagus = registry.get(WalletKind::Pelagus).unwrap();
    assert!(pelagus.is_available().await);
    assert_eq!(pelagus.get_accounts().await, vec![ADDR.to_string()]);

    let outcome = pelagus.connect().await.unwrap();
    assert_eq!(outcome.account.address, ADDR);
    assert_eq!(outcome.account.balance.as_deref(), Some("2.0000"));
    assert_eq!(outcome.account.chain_id.as_deref(), Some("0x2328"));
    assert_eq!(outcome.secondary, SecondaryCapability::NotApplicable);

    let metamask = registry.get(WalletKind::MetaMask).unwrap();
    assert!(!metamask.is_available().await);
}
