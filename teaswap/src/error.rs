//! Unified error types for teaswap.
//!
//! Every module-specific error converts into the top-level [`Error`]:
//! - wallet provider errors (JSON-RPC / EIP-1193 codes)
//! - flag storage errors
//! - configuration errors
//! - swap form and transaction errors

use std::fmt;

use serde_json::Value;

/// Result type alias for teaswap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for teaswap.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Wallet provider error.
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    /// Flag storage error.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Swap form or transaction error.
    #[error("swap: {0}")]
    Swap(#[from] SwapError),

    /// JSON serialization/deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The provider error behind this error, if any.
    #[must_use]
    pub const fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the user declined the request in the wallet.
    #[must_use]
    pub fn is_user_rejected(&self) -> bool {
        self.as_provider().is_some_and(ProviderError::is_user_rejected)
    }
}

// ============================================================================
// Provider Errors
// ============================================================================

/// Error returned by a wallet provider `request`.
///
/// Carries the EIP-1193 / JSON-RPC error code so callers can branch on
/// well-known conditions such as a rejected prompt or an unknown chain.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProviderError {
    /// Numeric error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional payload attached by the provider.
    pub data: Option<Value>,
}

impl ProviderError {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested method or account has not been authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The requested chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL: i64 = -32603;

    /// Create an error with an explicit code.
    #[must_use]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a user-rejected error.
    #[must_use]
    pub fn user_rejected() -> Self {
        Self::rpc(Self::USER_REJECTED, "User rejected the request.")
    }

    /// Create an unrecognized-chain error.
    #[must_use]
    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::rpc(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID {chain_id:#x}. Try adding the chain first."),
        )
    }

    /// Create an unsupported-method error.
    #[must_use]
    pub fn unsupported_method(method: &str) -> Self {
        Self::rpc(
            Self::UNSUPPORTED_METHOD,
            format!("The provider does not support '{method}'"),
        )
    }

    /// Create an invalid-params error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::rpc(Self::INVALID_PARAMS, message)
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::rpc(Self::INTERNAL, message)
    }

    /// Attach a data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether the user declined the prompt.
    #[must_use]
    pub const fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// Whether the wallet does not know the requested chain.
    #[must_use]
    pub const fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for ProviderError {}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("malformed provider payload: {err}"))
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// ============================================================================
// Storage Errors
// ============================================================================

/// Error type for the durable flag store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Swap Errors
// ============================================================================

/// Error type for swap form and transaction failures.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum SwapError {
    /// The input amount could not be converted to base units.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// A token was selected for both sides of the pair.
    #[error("token {0} is already selected on the other side")]
    SameToken(String),

    /// A mined transaction reported a failed status.
    #[error("transaction {0} reverted")]
    Reverted(alloy::primitives::TxHash),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_codes() {
        assert!(ProviderError::user_rejected().is_user_rejected());
        assert!(ProviderError::unrecognized_chain(10218).is_unrecognized_chain());
        assert!(!ProviderError::internal("boom").is_unrecognized_chain());
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = ProviderError::user_rejected().into();
        assert!(err.is_user_rejected());
        assert!(err.as_provider().is_some());

        let err: Error = SwapError::InvalidAmount("x".into()).into();
        assert!(matches!(err, Error::Swap(_)));
        assert!(!err.is_user_rejected());
    }

    #[test]
    fn test_unrecognized_chain_message() {
        let err = ProviderError::unrecognized_chain(10218);
        assert!(err.message.contains("0x27ea"));
        assert_eq!(err.to_string(), format!("{} (code: 4902)", err.message));
    }
}
