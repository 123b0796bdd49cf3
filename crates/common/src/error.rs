use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::types::WalletKind;

/// Failure reported by an injected provider's `request` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// JSON-RPC "internal error", used for transport failures with no provider code.
    pub const INTERNAL: i64 = -32603;

    /// EIP-3085: the requested chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL, message)
    }
}

/// Errors produced by wallet adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("{0} wallet not found. Please install {0}.")]
    NotAvailable(WalletKind),

    #[error("No accounts authorized")]
    NoAccountsAuthorized,

    #[error("Provider error: {0}")]
    Provider(String),

    /// Non-fatal: the connect proceeds with the baseline account.
    #[error("Secondary capability unavailable: {0}")]
    SecondaryCapabilityUnavailable(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        WalletError::Provider(err.message)
    }
}

/// Errors from the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Dashboard data requested without a wallet connection or demo mode.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Wallet(WalletError::NotAvailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Wallet(WalletError::Unsupported(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Wallet(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Feed(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Config(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_available_message_names_the_wallet() {
        let err = WalletError::NotAvailable(WalletKind::Pelagus);
        assert_eq!(
            err.to_string(),
            "Pelagus wallet not found. Please install Pelagus."
        );
    }

    #[test]
    fn test_rpc_error_maps_to_provider_error() {
        let err: WalletError = RpcError::new(4001, "User rejected the request").into();
        assert_eq!(
            err,
            WalletError::Provider("User rejected the request".to_string())
        );
    }

    #[test]
    fn test_error_status_codes() {
        let resp = AppError::Validation("bad".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::Wallet(WalletError::NoAccountsAuthorized).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
