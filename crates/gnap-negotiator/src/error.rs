//! Error types for the grant negotiation server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use axum::http::StatusCode;

/// Errors from key parsing and signature verification.
#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    /// The detached JWS is not `<header>..<signature>`
    #[error("Malformed detached JWS: {0}")]
    MalformedJws(&'static str),

    /// Base64url decoding failed
    #[error("Invalid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The protected header is not valid JSON
    #[error("Invalid JWS header: {0}")]
    Header(#[from] serde_json::Error),

    /// Algorithm other than the ones this server verifies
    #[error("Unsupported JWS algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key type or curve other than the ones this server verifies
    #[error("Unsupported key: kty={kty}, crv={crv}")]
    UnsupportedKey {
        /// Key type
        kty: String,
        /// Curve, empty when absent
        crv: String,
    },

    /// A member required by the key type is missing
    #[error("Key is missing required member '{0}'")]
    MissingMember(&'static str),

    /// Public key bytes are not a valid point
    #[error("Invalid public key")]
    InvalidKey,

    /// Signature does not verify under the key
    #[error("Signature verification failed")]
    BadSignature,
}

/// Errors from the transaction store.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// No live transaction under the handle or interaction key
    #[error("Transaction not found")]
    NotFound,

    /// The record changed since it was read
    #[error("Transaction was modified concurrently")]
    Stale,

    /// The new handle or interaction key is already in use
    #[error("Handle or interaction key already in use")]
    HandleCollision,
}

/// Errors surfaced at the engine boundary.
#[derive(thiserror::Error, Debug)]
pub enum GrantError {
    /// Unparsable body, missing header or missing key
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// Signature or key binding failed; the caller is not told which
    #[error("Request denied")]
    UserDenied,

    /// No live transaction under the presented handle or interaction key
    #[error("Unknown transaction")]
    UnknownTransaction,

    /// Transaction outlived its timeout and was dropped
    #[error("Transaction expired")]
    Expired,

    /// Presented interaction reference does not match
    #[error("Interaction reference mismatch")]
    InteractionMismatch,

    /// Transaction is not waiting for authorization
    #[error("Transaction is not waiting for authorization")]
    InvalidState,

    /// Interaction endpoint does not match the transaction's interaction type
    #[error("Interaction type mismatch")]
    WrongInteraction,

    /// Registered callback could not be parsed
    #[error("Invalid callback URL: {0}")]
    InvalidCallback(#[from] url::ParseError),

    /// Entropy source failed
    #[error("Random source failure: {0}")]
    Entropy(#[from] rand::Error),

    /// Response could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal engine error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GrantError {
    /// Create a malformed request error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Machine-readable reason code returned to the caller.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "invalid_request",
            Self::UserDenied => "user_denied",
            Self::UnknownTransaction => "unknown_transaction",
            Self::Expired => "expired",
            Self::InteractionMismatch => "invalid_interaction",
            Self::InvalidState => "invalid_state",
            Self::WrongInteraction => "not_found",
            Self::InvalidCallback(_) => "invalid_callback",
            Self::Entropy(_) | Self::Serialization(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::WrongInteraction => StatusCode::NOT_FOUND,
            Self::Entropy(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns true for failures on the server side.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Entropy(_) | Self::Serialization(_) | Self::Internal(_))
    }

    /// Description safe to return to the caller.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        if self.is_internal() { "Internal server error".to_string() } else { self.to_string() }
    }
}

impl From<KeyError> for GrantError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::MalformedJws(_) | KeyError::Encoding(_) | KeyError::Header(_) => {
                Self::Malformed(err.to_string())
            }
            _ => Self::UserDenied,
        }
    }
}

/// Result type alias for engine operations.
pub type GrantResult<T> = Result<T, GrantError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
