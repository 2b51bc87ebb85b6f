use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::Operation;
use crate::ExchangeId;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol '{value}' must be two tokens separated by '/' or '-'")]
    InvalidSymbolFormat { value: String },
    #[error("symbol '{value}' has an empty base or quote token")]
    EmptySymbolToken { value: String },
    #[error("wire symbol '{value}' cannot be split for {exchange}")]
    UnknownWireSymbol { value: String, exchange: ExchangeId },

    #[error("stock address '{value}' must match archetype.exchange.trade_type.base.quote.timeframe")]
    InvalidStockAddress { value: String },
    #[error("invalid archetype '{value}', expected one of crypto, stock, forex")]
    InvalidArchetype { value: String },
    #[error("invalid trade type '{value}', expected one of spot, margin, futures")]
    InvalidTradeType { value: String },
    #[error("invalid timeframe '{value}', expected one of 1m, 3m, 5m, 15m, 30m, 1h, 4h, 1d, 1w")]
    InvalidTimeframe { value: String },
    #[error("invalid exchange '{value}', expected one of binance, upbit")]
    InvalidExchange { value: String },

    #[error("timestamp '{value}' is not a recognized exchange timestamp")]
    InvalidTimestamp { value: String },

    #[error("field '{field}' must be finite and greater than zero")]
    NonPositiveValue { field: &'static str },

    #[error("request_id cannot be empty")]
    EmptyRequestId,
}

/// Canonical error codes carried by failed responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[serde(rename = "CONFIGURATION_ERROR")]
    Configuration,
    UnsupportedOperation,
    RateLimitExceeded,
    AuthenticationFailed,
    PermissionDenied,
    OrderNotFound,
    InsufficientFunds,
    InvalidRequest,
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    #[serde(rename = "SYSTEM_ERROR")]
    System,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Network => "NETWORK_ERROR",
            Self::System => "SYSTEM_ERROR",
        }
    }

    /// Whether a caller may re-issue the operation after backoff.
    ///
    /// Network failures are ambiguous for writes (the exchange may have
    /// accepted the order), so they only count as retryable for reads.
    pub const fn is_retryable_for(self, operation: Operation) -> bool {
        match self {
            Self::RateLimitExceeded | Self::System => true,
            Self::Network => operation.is_read_only(),
            _ => false,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway error taxonomy.
///
/// Only contract violations (`UnsupportedOperation`, `UnknownEndpoint`) and
/// construction failures (`Configuration`) are ever returned as `Err` from a
/// gateway; everything else is folded into a failed [`crate::Response`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("operation '{operation}' is not supported by {exchange}")]
    UnsupportedOperation {
        operation: Operation,
        exchange: ExchangeId,
    },
    #[error("no weight entry registered for {method} {path} on {exchange}")]
    UnknownEndpoint {
        exchange: ExchangeId,
        method: &'static str,
        path: String,
    },
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("system error: {0}")]
    System(String),
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::System(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Rebuilds an error from a classified code and the exchange's message.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::Configuration => Self::Configuration(message),
            ErrorCode::RateLimitExceeded => Self::RateLimitExceeded(message),
            ErrorCode::AuthenticationFailed => Self::AuthenticationFailed(message),
            ErrorCode::PermissionDenied => Self::PermissionDenied(message),
            ErrorCode::OrderNotFound => Self::OrderNotFound(message),
            ErrorCode::InsufficientFunds => Self::InsufficientFunds(message),
            ErrorCode::InvalidRequest | ErrorCode::UnsupportedOperation => {
                Self::InvalidRequest(message)
            }
            ErrorCode::Network => Self::Network(message),
            ErrorCode::System => Self::System(message),
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::UnsupportedOperation { .. } => ErrorCode::UnsupportedOperation,
            Self::UnknownEndpoint { .. } => ErrorCode::System,
            Self::RateLimitExceeded(_) => ErrorCode::RateLimitExceeded,
            Self::AuthenticationFailed(_) => ErrorCode::AuthenticationFailed,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::InsufficientFunds(_) => ErrorCode::InsufficientFunds,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::Network(_) => ErrorCode::Network,
            Self::System(_) => ErrorCode::System,
        }
    }

    /// Contract violations escape the worker instead of becoming failed responses.
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnsupportedOperation { .. } | Self::UnknownEndpoint { .. }
        )
    }
}

impl From<ValidationError> for GatewayError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}
