//! Transaction request body.

use serde::{Deserialize, Serialize};

use crate::crypto::{HashAlgorithm, Jwk};

/// Body of `POST /transaction`.
///
/// An absent or empty `handle` starts a new transaction; otherwise the request
/// continues the transaction the handle refers to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Keys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interact: Option<Interact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interact_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<serde_json::Value>,
}

/// Client key material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Keys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks: Option<Jwks>,
}

/// JWK set; only the first key is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Interaction modes the client can handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interact {
    #[serde(default)]
    pub redirect: bool,
    #[serde(default)]
    pub user_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Callback>,
}

/// Callback registration for redirect interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Callback {
    pub uri: String,
    pub nonce: String,
    #[serde(default)]
    pub hash_method: HashAlgorithm,
}

impl TransactionRequest {
    /// The continuation handle, if this is not a first request.
    #[must_use]
    pub fn continuation_handle(&self) -> Option<&str> {
        self.handle.as_deref().filter(|h| !h.is_empty())
    }

    /// The client key: first entry of `keys.jwks.keys`.
    #[must_use]
    pub fn client_key(&self) -> Option<&Jwk> {
        self.keys.as_ref()?.jwks.as_ref()?.keys.first()
    }

    /// The presented interaction reference, empty treated as absent.
    #[must_use]
    pub fn interaction_ref(&self) -> Option<&str> {
        self.interact_ref.as_deref().filter(|r| !r.is_empty())
    }
}
