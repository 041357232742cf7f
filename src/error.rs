//! Error types for wallet connection and transfer operations
//!
//! `ErrorKind` is the user-facing taxonomy: every failure the controller
//! surfaces is one of these, and none of them ever escapes the controller
//! boundary. `GatewayError` is what a provider implementation reports; the
//! controller folds it into an `ErrorKind`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing failure kinds
///
/// Local validation kinds never reach the provider. Provider kinds are
/// recoverable by retrying (or, for `NoProvider`, by installing a wallet).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("no wallet provider detected")]
    NoProvider,

    #[error("request rejected by user")]
    UserRejected,

    #[error("recipient address is empty")]
    EmptyRecipient,

    #[error("amount is empty")]
    EmptyAmount,

    #[error("recipient address is malformed")]
    MalformedAddress,

    #[error("recipient is the sending address")]
    SelfSend,

    #[error("amount is not a positive decimal")]
    InvalidAmount,

    #[error("amount exceeds balance")]
    InsufficientBalance,

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("transaction tracking cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Create a provider error, passing the message through verbatim
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::ProviderError(msg.into())
    }

    /// True for failures caught locally before any provider call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyRecipient
                | Self::EmptyAmount
                | Self::MalformedAddress
                | Self::SelfSend
                | Self::InvalidAmount
                | Self::InsufficientBalance
        )
    }
}

/// Errors reported by a `ProviderGateway` implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no wallet provider available")]
    NoProvider,

    #[error("user rejected the request")]
    UserRejected,

    #[error("{0}")]
    Provider(String),
}

impl GatewayError {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

impl From<GatewayError> for ErrorKind {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoProvider => ErrorKind::NoProvider,
            GatewayError::UserRejected => ErrorKind::UserRejected,
            GatewayError::Provider(msg) => ErrorKind::ProviderError(msg),
        }
    }
}

/// Address parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidHex,
}

/// Decimal amount parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid character in amount: {0:?}")]
    InvalidCharacter(char),

    #[error("too many decimal places: {0} (max 18)")]
    TooManyDecimals(usize),

    #[error("amount does not fit in base units")]
    Overflow,

    #[error("invalid hex quantity: {0}")]
    InvalidQuantity(String),
}
