//! Provider injection points.
//!
//! A provider is an environment-supplied object offering a single
//! `request({ method, params })` call plus boolean identity markers such as
//! `isQuai` or `isMetaMask`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use quaiscope_common::error::RpcError;
use serde::Deserialize;
use serde_json::{Value, json};

#[async_trait]
pub trait ProviderRpc: Send + Sync {
    /// Whether the provider sets the given identity marker (e.g. `isQuai`).
    fn has_marker(&self, marker: &str) -> bool;

    /// Issue one RPC call. `Value::Null` params are omitted from the request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// Provider reached through a JSON-RPC 2.0 bridge over HTTP.
pub struct HttpProvider {
    client: reqwest::Client,
    url: String,
    markers: Vec<String>,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>, markers: &[&str]) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProviderRpc for HttpProvider {
    fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
        });
        if !params.is_null() {
            body["params"] = params;
        }

        tracing::trace!(method, id, url = %self.url, "Provider request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::internal(format!("transport failure: {e}")))?;

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::internal(format!("malformed response: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(RpcError::new(err.code, err.message));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

/// Extract an address list from an `eth_accounts`-style result.
///
/// Anything other than an array of strings yields an empty list.
pub fn accounts_from(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
