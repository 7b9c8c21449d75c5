//! Interaction binding digest.
//!
//! Computes `BASE64URL(H(server_nonce "\n" client_nonce "\n" interaction_ref))`.
//! The client recomputes it from its own nonce to confirm that a callback
//! belongs to the transaction it started.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use sha3::Sha3_512;

/// Digest used for the binding hash, chosen per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-512
    Sha2,
    /// SHA3-512
    #[default]
    Sha3,
}

/// Compute the binding digest.
#[must_use]
pub fn bind(
    server_nonce: &str,
    client_nonce: &str,
    interaction_ref: &str,
    algorithm: HashAlgorithm,
) -> String {
    match algorithm {
        HashAlgorithm::Sha2 => digest::<Sha512>(server_nonce, client_nonce, interaction_ref),
        HashAlgorithm::Sha3 => digest::<Sha3_512>(server_nonce, client_nonce, interaction_ref),
    }
}

fn digest<D: Digest>(server_nonce: &str, client_nonce: &str, interaction_ref: &str) -> String {
    let mut hasher = D::new();
    hasher.update(server_nonce.as_bytes());
    hasher.update(b"\n");
    hasher.update(client_nonce.as_bytes());
    hasher.update(b"\n");
    hasher.update(interaction_ref.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
