//! Client public keys.
//!
//! Keys arrive as JSON Web Keys. Two keys are the same key when their
//! RFC 7638 thumbprints match, whatever optional members they carry.
//! Supported key types: `OKP` (Ed25519), `EC` (P-256, P-384) and `RSA`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::VerifyingKey;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KeyError;

const EDDSA: &[&str] = &["EdDSA"];
const ES256: &[&str] = &["ES256"];
const ES384: &[&str] = &["ES384"];
const RSA_ALGORITHMS: &[&str] = &["RS256", "RS384", "RS512", "PS256", "PS384", "PS512"];

/// A JSON Web Key as presented in `keys.jwks.keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// RSA modulus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Build an Ed25519 JWK from raw public key bytes.
    #[must_use]
    pub fn ed25519(public_key: &[u8; 32]) -> Self {
        Self {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(public_key)),
            ..Self::default()
        }
    }

    /// RFC 7638 thumbprint: `BASE64URL(SHA-256(canonical required members))`.
    pub fn thumbprint(&self) -> Result<String, KeyError> {
        // json! objects serialize with sorted keys and no whitespace
        let canonical = match self.kty.as_str() {
            "OKP" => serde_json::json!({
                "crv": required(self.crv.as_deref(), "crv")?,
                "kty": "OKP",
                "x": required(self.x.as_deref(), "x")?,
            }),
            "EC" => serde_json::json!({
                "crv": required(self.crv.as_deref(), "crv")?,
                "kty": "EC",
                "x": required(self.x.as_deref(), "x")?,
                "y": required(self.y.as_deref(), "y")?,
            }),
            "RSA" => serde_json::json!({
                "e": required(self.e.as_deref(), "e")?,
                "kty": "RSA",
                "n": required(self.n.as_deref(), "n")?,
            }),
            _ => return Err(self.unsupported()),
        };
        let canonical = serde_json::to_string(&canonical)?;
        Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes())))
    }

    /// JWS `alg` values this key can verify.
    #[must_use]
    pub fn algorithms(&self) -> &'static [&'static str] {
        match (self.kty.as_str(), self.crv.as_deref()) {
            ("OKP", Some("Ed25519")) => EDDSA,
            ("EC", Some("P-256")) => ES256,
            ("EC", Some("P-384")) => ES384,
            ("RSA", _) => RSA_ALGORITHMS,
            _ => &[],
        }
    }

    /// Decode into an Ed25519 verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        if self.kty != "OKP" || self.crv.as_deref() != Some("Ed25519") {
            return Err(self.unsupported());
        }
        let x = required(self.x.as_deref(), "x")?;
        let bytes: [u8; 32] =
            URL_SAFE_NO_PAD.decode(x)?.try_into().map_err(|_| KeyError::InvalidKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidKey)
    }

    /// Decode an `EC` or `RSA` key for verification.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        let key = match self.kty.as_str() {
            "EC" if !self.algorithms().is_empty() => DecodingKey::from_ec_components(
                required(self.x.as_deref(), "x")?,
                required(self.y.as_deref(), "y")?,
            ),
            "RSA" => DecodingKey::from_rsa_components(
                required(self.n.as_deref(), "n")?,
                required(self.e.as_deref(), "e")?,
            ),
            _ => return Err(self.unsupported()),
        };
        key.map_err(|_| KeyError::InvalidKey)
    }

    fn unsupported(&self) -> KeyError {
        KeyError::UnsupportedKey {
            kty: self.kty.clone(),
            crv: self.crv.clone().unwrap_or_default(),
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, KeyError> {
    value.ok_or(KeyError::MissingMember(name))
}

/// Compare two keys by thumbprint. A key that cannot be thumbprinted is never equal.
#[must_use]
pub fn same_key(a: &Jwk, b: &Jwk) -> bool {
    match (a.thumbprint(), b.thumbprint()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
