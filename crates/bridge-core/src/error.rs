//! # Bridge Error Types
//!
//! Typed error handling for the checkout bridge.
//! All bridge operations return `Result<T, BridgeError>`.

use thiserror::Error;

/// Core error type for all bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cart failed validation (empty, bad quantity)
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// Currency not in the supported set
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Webhook signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Webhook payload could not be parsed after verification
    #[error("Event parse error: {0}")]
    EventParse(String),

    /// Required session data (cart metadata, address) is unresolvable
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Checkout session not found at the processor
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Session exists but payment has not completed
    #[error("Payment not completed for session: {session_id}")]
    PaymentIncomplete { session_id: String },

    /// Downstream processor/backend API error
    #[error("Backend error [{service}]: {message}")]
    BackendCall { service: String, message: String },

    /// Network/HTTP error communicating with a collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Network(_) | BridgeError::BackendCall { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Configuration(_) => 500,
            BridgeError::InvalidCart(_) => 400,
            BridgeError::UnsupportedCurrency { .. } => 400,
            BridgeError::SignatureInvalid(_) => 401,
            BridgeError::EventParse(_) => 400,
            BridgeError::MissingData(_) => 422,
            BridgeError::SessionNotFound { .. } => 404,
            BridgeError::PaymentIncomplete { .. } => 400,
            BridgeError::BackendCall { .. } => 502,
            BridgeError::Network(_) => 503,
            BridgeError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
