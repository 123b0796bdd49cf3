//! Analytics data feed: whale transfers, DEX volume and token rankings.
//!
//! The dashboard only consumes this data. [`HttpFeed`] talks to the
//! analytics API; tests substitute their own [`DataFeed`].

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use quaiscope_common::error::AppError;
use quaiscope_common::types::{DexSwap, DexVolume, IngestEvent, TopToken, VolumePeriod, WhaleTransfer};

/// Default page size for whale transfers.
pub const DEFAULT_WHALE_LIMIT: u32 = 50;

/// Default number of ranked tokens.
pub const DEFAULT_TOP_TOKENS_LIMIT: u32 = 10;

#[async_trait]
pub trait DataFeed: Send + Sync {
    /// Most recent whale transfers, optionally for a single token.
    async fn whales(&self, token: Option<&str>, limit: u32) -> Result<Vec<WhaleTransfer>, AppError>;

    async fn dex_volume(&self, period: VolumePeriod) -> Result<DexVolume, AppError>;

    async fn top_tokens(&self, limit: u32) -> Result<Vec<TopToken>, AppError>;

    /// Forward an indexed transfer or swap to the analytics store.
    async fn ingest(&self, event: &IngestEvent) -> Result<(), AppError>;
}

/// Aggregate swaps into total input volume, unique traders and swap count.
pub fn summarize_swaps(transactions: Vec<DexSwap>) -> DexVolume {
    let volume = transactions.iter().map(|s| s.amount_in).sum();
    let traders = transactions
        .iter()
        .map(|s| s.trader.as_str())
        .collect::<HashSet<_>>()
        .len();

    DexVolume {
        volume,
        traders,
        swaps: transactions.len(),
        transactions,
    }
}

#[derive(Debug, Deserialize)]
struct WhalesResponse {
    transfers: Vec<WhaleTransfer>,
}

#[derive(Debug, Deserialize)]
struct TopTokensResponse {
    tokens: Vec<TopToken>,
}

/// Analytics API client over HTTP.
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Fetching analytics data");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Feed(format!("request to {path} failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Feed(format!("{path} returned an error: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| AppError::Feed(format!("malformed response from {path}: {e}")))
    }
}

#[async_trait]
impl DataFeed for HttpFeed {
    async fn whales(&self, token: Option<&str>, limit: u32) -> Result<Vec<WhaleTransfer>, AppError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(token) = token {
            query.push(("token", token.to_string()));
        }
        let body: WhalesResponse = self.get_json("/api/whales", &query).await?;
        Ok(body.transfers)
    }

    async fn dex_volume(&self, period: VolumePeriod) -> Result<DexVolume, AppError> {
        let body: DexVolume = self
            .get_json("/api/dex-volume", &[("period", period.to_string())])
            .await?;
        // Keep the summary consistent with the swaps actually returned.
        Ok(summarize_swaps(body.transactions))
    }

    async fn top_tokens(&self, limit: u32) -> Result<Vec<TopToken>, AppError> {
        let body: TopTokensResponse = self
            .get_json("/api/top-tokens", &[("limit", limit.to_string())])
            .await?;
        Ok(body.tokens)
    }

    async fn ingest(&self, event: &IngestEvent) -> Result<(), AppError> {
        let url = format!("{}/api/webhook", self.base_url);
        if event.is_whale() {
            tracing::info!("Forwarding whale transfer");
        }

        let response = self
            .client
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::Feed(format!("webhook request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            tracing::warn!(%status, body = %body, "Analytics webhook rejected event");
            return Err(AppError::Feed(format!("webhook returned {status}")));
        }
        Ok(())
    }
}
