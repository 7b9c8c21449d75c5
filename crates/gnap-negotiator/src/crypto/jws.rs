//! Detached JWS proof of possession.
//!
//! The `JWS-Signature` header carries a compact JWS with an empty payload
//! segment (`<header>..<signature>`). The payload is the raw request body, so
//! the signing input is `<header> "." BASE64URL(body)`.
//!
//! `EdDSA` is verified with `ed25519-dalek`; the `ES*`, `RS*` and `PS*`
//! families go through `jsonwebtoken`. The header `alg` must be one the
//! client key can verify.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature, Verifier};
use jsonwebtoken::{Algorithm, EncodingKey};
use serde::Deserialize;

use super::jwk::Jwk;
use crate::error::KeyError;

/// Protected header members this server looks at.
#[derive(Debug, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub crit: Option<Vec<String>>,
}

/// A parsed detached JWS.
#[derive(Debug)]
pub struct DetachedJws<'a> {
    encoded_header: &'a str,
    header: ProtectedHeader,
    encoded_signature: &'a str,
    signature: Vec<u8>,
}

impl<'a> DetachedJws<'a> {
    /// Parse `<header>..<signature>`.
    pub fn parse(compact: &'a str) -> Result<Self, KeyError> {
        let mut parts = compact.trim().split('.');
        let (Some(encoded_header), Some(payload), Some(encoded_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyError::MalformedJws("expected three segments"));
        };
        if !payload.is_empty() {
            return Err(KeyError::MalformedJws("payload segment must be empty"));
        }
        if encoded_header.is_empty() || encoded_signature.is_empty() {
            return Err(KeyError::MalformedJws("empty header or signature"));
        }

        let header: ProtectedHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded_header)?)?;
        let signature = URL_SAFE_NO_PAD.decode(encoded_signature)?;

        Ok(Self { encoded_header, header, encoded_signature, signature })
    }

    /// The decoded protected header.
    #[must_use]
    pub const fn header(&self) -> &ProtectedHeader {
        &self.header
    }

    /// Verify the signature over `payload` with `key`.
    pub fn verify(&self, payload: &[u8], key: &Jwk) -> Result<(), KeyError> {
        if self.header.crit.as_ref().is_some_and(|crit| !crit.is_empty()) {
            return Err(KeyError::UnsupportedAlgorithm("critical header extensions".into()));
        }
        let alg = self.header.alg.as_str();
        if !key.algorithms().contains(&alg) {
            return Err(KeyError::UnsupportedAlgorithm(self.header.alg.clone()));
        }
        if key.alg.as_deref().is_some_and(|pinned| pinned != alg) {
            return Err(KeyError::UnsupportedAlgorithm(self.header.alg.clone()));
        }

        let signing_input = signing_input(self.encoded_header, payload);
        if alg == "EdDSA" {
            let verifying_key = key.verifying_key()?;
            let signature =
                Signature::from_slice(&self.signature).map_err(|_| KeyError::BadSignature)?;
            return verifying_key
                .verify(signing_input.as_bytes(), &signature)
                .map_err(|_| KeyError::BadSignature);
        }

        let algorithm = Algorithm::from_str(alg)
            .map_err(|_| KeyError::UnsupportedAlgorithm(self.header.alg.clone()))?;
        let decoding_key = key.decoding_key()?;
        match jsonwebtoken::crypto::verify(
            self.encoded_signature,
            signing_input.as_bytes(),
            &decoding_key,
            algorithm,
        ) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(KeyError::BadSignature),
        }
    }
}

fn signing_input(encoded_header: &str, payload: &[u8]) -> String {
    let mut input =
        String::with_capacity(encoded_header.len() + 1 + payload.len().div_ceil(3) * 4);
    input.push_str(encoded_header);
    input.push('.');
    URL_SAFE_NO_PAD.encode_string(payload, &mut input);
    input
}

/// Check that `detached_signature` signs exactly `raw_body` under `key`.
pub fn verify_possession(
    raw_body: &[u8],
    detached_signature: &str,
    key: &Jwk,
) -> Result<(), KeyError> {
    DetachedJws::parse(detached_signature)?.verify(raw_body, key)
}

/// Produce a detached JWS over `payload`. Used by clients and tests.
#[must_use]
pub fn sign_detached(payload: &[u8], signing_key: &ed25519_dalek::SigningKey) -> String {
    use ed25519_dalek::Signer;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA"}"#);
    let signature = signing_key.sign(signing_input(&header, payload).as_bytes());
    format!("{header}..{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Produce a detached JWS over `payload` with an `ES*`, `RS*` or `PS*` key.
pub fn sign_detached_with(
    payload: &[u8],
    signing_key: &EncodingKey,
    algorithm: Algorithm,
) -> Result<String, KeyError> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({ "alg": algorithm }))?);
    let signature =
        jsonwebtoken::crypto::sign(signing_input(&header, payload).as_bytes(), signing_key, algorithm)
            .map_err(|_| KeyError::InvalidKey)?;
    Ok(format!("{header}..{signature}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn keypair(byte: u8) -> (SigningKey, Jwk) {
        let signing = SigningKey::from_bytes(&[byte; 32]);
        let jwk = Jwk::ed25519(&signing.verifying_key().to_bytes());
        (signing, jwk)
    }

    fn es256() -> (EncodingKey, Jwk) {
        let signing =
            EncodingKey::from_ec_pem(include_bytes!("../../tests/fixtures/es256_private.pem"))
                .unwrap();
        let jwk =
            serde_json::from_str(include_str!("../../tests/fixtures/es256_public.jwk.json")).unwrap();
        (signing, jwk)
    }

    fn rsa() -> (EncodingKey, Jwk) {
        let signing =
            EncodingKey::from_rsa_pem(include_bytes!("../../tests/fixtures/rs256_private.pem"))
                .unwrap();
        let jwk =
            serde_json::from_str(include_str!("../../tests/fixtures/rs256_public.jwk.json")).unwrap();
        (signing, jwk)
    }

    #[test]
    fn test_valid_signature_verifies() {
        let (signing, jwk) = keypair(3);
        let body = br#"{"interact":{"redirect":true}}"#;
        let sig = sign_detached(body, &signing);
        assert!(verify_possession(body, &sig, &jwk).is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let (signing, jwk) = keypair(3);
        let sig = sign_detached(b"original", &signing);
        assert!(matches!(verify_possession(b"tampered", &sig, &jwk), Err(KeyError::BadSignature)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (signing, _) = keypair(3);
        let (_, other) = keypair(4);
        let sig = sign_detached(b"body", &signing);
        assert!(matches!(verify_possession(b"body", &sig, &other), Err(KeyError::BadSignature)));
    }

    #[test]
    fn test_attached_payload_is_rejected() {
        let (signing, jwk) = keypair(3);
        let sig = sign_detached(b"body", &signing);
        let attached = sig.replacen("..", ".Ym9keQ.", 1);
        assert!(matches!(
            verify_possession(b"body", &attached, &jwk),
            Err(KeyError::MalformedJws(_))
        ));
    }

    #[test]
    fn test_alg_none_is_rejected() {
        let (_, jwk) = keypair(3);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let sig = format!("{header}..{}", URL_SAFE_NO_PAD.encode([0u8; 64]));
        assert!(matches!(
            verify_possession(b"body", &sig, &jwk),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (_, jwk) = keypair(3);
        assert!(matches!(verify_possession(b"body", "not-a-jws", &jwk), Err(KeyError::MalformedJws(_))));
        assert!(matches!(verify_possession(b"body", "!!..!!", &jwk), Err(KeyError::Encoding(_))));
    }

    #[test]
    fn test_header_kid_is_exposed() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","kid":"k1"}"#);
        let sig = format!("{header}..{}", URL_SAFE_NO_PAD.encode([1u8; 64]));
        let jws = DetachedJws::parse(&sig).unwrap();
        assert_eq!(jws.header().kid.as_deref(), Some("k1"));
    }

    #[test]
    fn test_es256_roundtrip() {
        let (signing, jwk) = es256();
        let body = br#"{"interact":{"redirect":true}}"#;
        let sig = sign_detached_with(body, &signing, Algorithm::ES256).unwrap();

        assert_eq!(DetachedJws::parse(&sig).unwrap().header().alg, "ES256");
        assert!(verify_possession(body, &sig, &jwk).is_ok());
        assert!(matches!(verify_possession(b"{}", &sig, &jwk), Err(KeyError::BadSignature)));
    }

    #[test]
    fn test_rs256_and_ps256_roundtrip() {
        let (signing, jwk) = rsa();
        for algorithm in [Algorithm::RS256, Algorithm::PS256] {
            let sig = sign_detached_with(b"body", &signing, algorithm).unwrap();
            assert!(verify_possession(b"body", &sig, &jwk).is_ok());
            assert!(matches!(
                verify_possession(b"other", &sig, &jwk),
                Err(KeyError::BadSignature)
            ));
        }
    }

    #[test]
    fn test_algorithm_must_fit_key() {
        let (ec_signing, ec_jwk) = es256();
        let (_, rsa_jwk) = rsa();
        let (_, ed_jwk) = keypair(3);

        let sig = sign_detached_with(b"body", &ec_signing, Algorithm::ES256).unwrap();
        assert!(matches!(
            verify_possession(b"body", &sig, &rsa_jwk),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            verify_possession(b"body", &sig, &ed_jwk),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));

        // A symmetric algorithm never verifies against a public key
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let forged = format!("{header}..{}", URL_SAFE_NO_PAD.encode([0u8; 32]));
        assert!(matches!(
            verify_possession(b"body", &forged, &rsa_jwk),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
        assert!(verify_possession(b"body", &sig, &ec_jwk).is_ok());
    }

    #[test]
    fn test_pinned_key_alg_is_enforced() {
        let (signing, mut jwk) = rsa();
        jwk.alg = Some("RS256".into());
        let sig = sign_detached_with(b"body", &signing, Algorithm::PS256).unwrap();
        assert!(matches!(
            verify_possession(b"body", &sig, &jwk),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
    }
}
